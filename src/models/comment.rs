use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        lenient_timestamp,
        post::PostId,
        user::{User, UserId},
    },
};

pub type CommentId = i64;

/// A comment as returned by `/posts/{id}/comments/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,

    #[serde(default)]
    pub post: Option<PostId>,

    #[serde(rename = "user")]
    pub author: User,

    #[serde(alias = "content")]
    pub text: String,

    #[serde(
        rename = "timestamp",
        alias = "created_at",
        default,
        deserialize_with = "lenient_timestamp"
    )]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Comment {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.author.id == user_id
    }
}

/// DTO for creating or updating a comment.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct CommentRequest {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Comment must be between 1 and 1000 characters"
    ))]
    pub text: String,
}

impl CommentRequest {
    /// Trims the text and validates it.
    pub fn new(text: &str) -> Result<Self, AppError> {
        let request = Self {
            text: text.trim().to_string(),
        };
        request.validate()?;
        Ok(request)
    }
}
