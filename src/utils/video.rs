// src/utils/video.rs

use std::sync::LazyLock;

use regex::Regex;

/// Matches watch, embed, `v/`, `e/`, nested-path and short `youtu.be` links.
static YOUTUBE_ID: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?)/|.*[?&]v=)|youtu\.be/)([^"&?/\s]{11})"#,
    )
    .ok()
});

/// Extracts the 11-character YouTube video id from a link.
pub fn youtube_id(url: &str) -> Option<String> {
    YOUTUBE_ID
        .as_ref()?
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Builds the iframe URL for a YouTube link.
pub fn youtube_embed_url(url: &str) -> Option<String> {
    youtube_id(url).map(|id| format!("https://www.youtube.com/embed/{}", id))
}
