// src/api/mod.rs

//! Port for the REST backend.
//!
//! [`SocialApi`] is the only way the stores talk to the server. [`HttpApi`]
//! is the production adapter; tests substitute `MockSocialApi` or point
//! `HttpApi` at an in-process fake backend.

mod http;

pub use http::HttpApi;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        comment::{Comment, CommentId, CommentRequest},
        connection::{ConnectionRequest, RequestId, SendRequest},
        like::{Like, LikeId},
        post::{Post, PostId, PostPage, PostRequest},
        user::{LoginRequest, TokenPair, User},
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SocialApi: Send + Sync {
    /// Replaces the token attached to every following request.
    fn set_token(&self, token: Option<String>);

    // --- Auth ---

    async fn obtain_token(&self, credentials: &LoginRequest) -> Result<TokenPair, AppError>;

    async fn current_user(&self) -> Result<User, AppError>;

    // --- Posts ---

    async fn list_posts(&self, page: u32) -> Result<PostPage, AppError>;

    async fn create_post(&self, request: &PostRequest) -> Result<Post, AppError>;

    async fn update_post(&self, id: PostId, request: &PostRequest) -> Result<Post, AppError>;

    async fn delete_post(&self, id: PostId) -> Result<(), AppError>;

    // --- Likes ---

    async fn list_likes(&self, post_id: PostId) -> Result<Vec<Like>, AppError>;

    async fn create_like(&self, post_id: PostId) -> Result<Like, AppError>;

    async fn delete_like(&self, post_id: PostId, like_id: LikeId) -> Result<(), AppError>;

    // --- Comments ---

    async fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>, AppError>;

    async fn create_comment(
        &self,
        post_id: PostId,
        request: &CommentRequest,
    ) -> Result<Comment, AppError>;

    async fn update_comment(
        &self,
        post_id: PostId,
        comment_id: CommentId,
        request: &CommentRequest,
    ) -> Result<Comment, AppError>;

    async fn delete_comment(&self, post_id: PostId, comment_id: CommentId)
    -> Result<(), AppError>;

    // --- Friend requests ---

    async fn list_friend_requests(&self) -> Result<Vec<ConnectionRequest>, AppError>;

    async fn send_friend_request(
        &self,
        request: &SendRequest,
    ) -> Result<ConnectionRequest, AppError>;

    async fn accept_friend_request(&self, id: RequestId) -> Result<(), AppError>;

    async fn reject_friend_request(&self, id: RequestId) -> Result<(), AppError>;

    async fn delete_friend_request(&self, id: RequestId) -> Result<(), AppError>;

    // --- Users ---

    async fn random_users(&self) -> Result<Vec<User>, AppError>;
}
