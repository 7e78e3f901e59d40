use serde::{Deserialize, Serialize};

use crate::models::{lenient_timestamp, post::PostId, user::UserId};

pub type LikeId = i64;

/// A like record from `/posts/{id}/likes/`. `user` is a bare id here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub id: LikeId,
    pub user: UserId,
    #[serde(default)]
    pub post: Option<PostId>,
    #[serde(
        rename = "timestamp",
        alias = "created_at",
        default,
        deserialize_with = "lenient_timestamp"
    )]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Finds the like owned by `user_id`, if any.
pub fn find_by_user(likes: &[Like], user_id: UserId) -> Option<&Like> {
    likes.iter().find(|like| like.user == user_id)
}
