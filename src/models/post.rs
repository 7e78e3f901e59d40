use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        lenient_timestamp,
        user::{User, UserId},
    },
    utils::video,
};

pub type PostId = i64;

/// A post as returned by `/posts/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,

    #[serde(rename = "user")]
    pub author: User,

    #[serde(default)]
    pub content: Option<String>,

    /// URL of an attached image.
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub video_url: Option<String>,

    #[serde(
        rename = "timestamp",
        alias = "created_at",
        default,
        deserialize_with = "lenient_timestamp"
    )]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Server-authoritative counters.
    #[serde(rename = "total_likes", alias = "likes_count", default)]
    pub like_count: u32,
    #[serde(rename = "total_comments", alias = "comments_count", default)]
    pub comment_count: u32,
}

impl Post {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.author.id == user_id
    }

    /// Copies the mutable fields (content and media) from `updated`.
    /// Identity, author, timestamp and counters stay as they are.
    pub fn apply_edit(&mut self, updated: &Post) {
        self.content = updated.content.clone();
        self.image = updated.image.clone();
        self.video_url = updated.video_url.clone();
    }

    pub fn youtube_id(&self) -> Option<String> {
        self.video_url.as_deref().and_then(video::youtube_id)
    }

    pub fn embed_url(&self) -> Option<String> {
        self.video_url.as_deref().and_then(video::youtube_embed_url)
    }
}

/// DTO for creating or editing a post.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct PostRequest {
    #[validate(length(max = 3000, message = "Post content must be at most 3000 characters"))]
    pub content: Option<String>,

    #[validate(url(message = "Video link must be a valid URL"))]
    pub video_url: Option<String>,
}

impl PostRequest {
    /// Trims both fields, drops empty ones and validates the result.
    /// A post needs at least some text or a video link.
    pub fn new(content: Option<&str>, video_url: Option<&str>) -> Result<Self, AppError> {
        let request = Self {
            content: non_blank(content),
            video_url: non_blank(video_url),
        };
        request.validate()?;

        if request.content.is_none() && request.video_url.is_none() {
            return Err(AppError::BadRequest(
                "A post needs some text or a video link".to_string(),
            ));
        }
        Ok(request)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// One page of `GET /posts/?page=N`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostPage {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub results: Vec<Post>,
    /// Absolute URL of the next page, if any.
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}
