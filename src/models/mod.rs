// src/models/mod.rs

pub mod comment;
pub mod connection;
pub mod like;
pub mod post;
pub mod user;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Accepts RFC 3339 timestamps and maps anything else (null, "2 hours ago")
/// to `None` instead of failing the whole payload.
pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }))
}
