// src/routes.rs

//! Backend endpoint table.
//!
//! Paths are relative to the configured API base URL (no leading slash) and
//! keep the trailing slashes the backend requires.

use crate::models::{
    comment::CommentId, connection::RequestId, like::LikeId, post::PostId,
};

pub const TOKEN_CREATE: &str = "auth/jwt/create/";
pub const CURRENT_USER: &str = "auth/users/me/";

pub const POSTS: &str = "posts/";
pub const FRIEND_REQUESTS: &str = "friend-requests/";
pub const RANDOM_USERS: &str = "users/show_random_users";

pub fn posts_page(page: u32) -> String {
    format!("posts/?page={}", page)
}

pub fn post(id: PostId) -> String {
    format!("posts/{}/", id)
}

pub fn likes(post_id: PostId) -> String {
    format!("posts/{}/likes/", post_id)
}

pub fn like(post_id: PostId, like_id: LikeId) -> String {
    format!("posts/{}/likes/{}/", post_id, like_id)
}

pub fn comments(post_id: PostId) -> String {
    format!("posts/{}/comments/", post_id)
}

pub fn comment(post_id: PostId, comment_id: CommentId) -> String {
    format!("posts/{}/comments/{}/", post_id, comment_id)
}

pub fn friend_request(id: RequestId) -> String {
    format!("friend-requests/{}/", id)
}

pub fn accept_friend_request(id: RequestId) -> String {
    format!("friend-requests/{}/accept/", id)
}

pub fn reject_friend_request(id: RequestId) -> String {
    format!("friend-requests/{}/reject/", id)
}

/// Page number encoded in a pagination link.
///
/// The backend drops `page` from the link to page 1, so a valid link without
/// it means the first page.
pub fn page_from_link(link: &str) -> Option<u32> {
    let url = url::Url::parse(link).ok()?;
    match url.query_pairs().find(|(key, _)| key == "page") {
        Some((_, value)) => value.parse().ok(),
        None => Some(1),
    }
}
