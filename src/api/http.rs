//! Reqwest-backed adapter for [`SocialApi`].
//!
//! Owns transport details only: URL building, token attachment, status
//! mapping and JSON decoding.

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, header};
use serde::{Serialize, de::DeserializeOwned};

use super::SocialApi;
use crate::{
    config::Config,
    error::AppError,
    models::{
        comment::{Comment, CommentId, CommentRequest},
        connection::{ConnectionRequest, RequestId, SendRequest},
        like::{Like, LikeId},
        post::{Post, PostId, PostPage, PostRequest},
        user::{LoginRequest, TokenPair, User},
    },
    routes,
};

pub struct HttpApi {
    client: Client,
    base_url: url::Url,
    auth_scheme: String,
    token: RwLock<Option<String>>,
}

impl HttpApi {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(default_headers())
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            auth_scheme: config.auth_scheme.clone(),
            token: RwLock::new(None),
        })
    }

    fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|token| token.clone())
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, AppError> {
        let url = self.base_url.join(path)?;
        tracing::debug!("{} {}", method, url);

        let mut builder = self.client.request(method, url);
        if let Some(token) = self.token() {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("{} {}", self.auth_scheme, token),
            );
        }
        Ok(builder)
    }

    async fn fetch<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T, AppError> {
        let builder = self.request(method, path)?;
        decode(builder).await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let builder = self.request(method, path)?.json(body);
        decode(builder).await
    }

    /// For endpoints whose response body is irrelevant (deletes, transitions).
    async fn execute(&self, method: Method, path: &str) -> Result<(), AppError> {
        let response = self.request(method, path)?.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::from_status(status, &body));
        }
        Ok(())
    }
}

fn default_headers() -> header::HeaderMap {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );
    headers
}

async fn decode<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, AppError> {
    let response = builder.send().await?;
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        return Err(AppError::from_status(
            status,
            &String::from_utf8_lossy(body.as_ref()),
        ));
    }
    Ok(serde_json::from_slice(body.as_ref())?)
}

#[async_trait]
impl SocialApi for HttpApi {
    fn set_token(&self, token: Option<String>) {
        if let Ok(mut current) = self.token.write() {
            *current = token;
        }
    }

    async fn obtain_token(&self, credentials: &LoginRequest) -> Result<TokenPair, AppError> {
        self.send_json(Method::POST, routes::TOKEN_CREATE, credentials)
            .await
    }

    async fn current_user(&self) -> Result<User, AppError> {
        self.fetch(Method::GET, routes::CURRENT_USER).await
    }

    async fn list_posts(&self, page: u32) -> Result<PostPage, AppError> {
        self.fetch(Method::GET, &routes::posts_page(page)).await
    }

    async fn create_post(&self, request: &PostRequest) -> Result<Post, AppError> {
        self.send_json(Method::POST, routes::POSTS, request).await
    }

    async fn update_post(&self, id: PostId, request: &PostRequest) -> Result<Post, AppError> {
        self.send_json(Method::PUT, &routes::post(id), request)
            .await
    }

    async fn delete_post(&self, id: PostId) -> Result<(), AppError> {
        self.execute(Method::DELETE, &routes::post(id)).await
    }

    async fn list_likes(&self, post_id: PostId) -> Result<Vec<Like>, AppError> {
        self.fetch(Method::GET, &routes::likes(post_id)).await
    }

    async fn create_like(&self, post_id: PostId) -> Result<Like, AppError> {
        self.fetch(Method::POST, &routes::likes(post_id)).await
    }

    async fn delete_like(&self, post_id: PostId, like_id: LikeId) -> Result<(), AppError> {
        self.execute(Method::DELETE, &routes::like(post_id, like_id))
            .await
    }

    async fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>, AppError> {
        self.fetch(Method::GET, &routes::comments(post_id)).await
    }

    async fn create_comment(
        &self,
        post_id: PostId,
        request: &CommentRequest,
    ) -> Result<Comment, AppError> {
        self.send_json(Method::POST, &routes::comments(post_id), request)
            .await
    }

    async fn update_comment(
        &self,
        post_id: PostId,
        comment_id: CommentId,
        request: &CommentRequest,
    ) -> Result<Comment, AppError> {
        self.send_json(Method::PUT, &routes::comment(post_id, comment_id), request)
            .await
    }

    async fn delete_comment(
        &self,
        post_id: PostId,
        comment_id: CommentId,
    ) -> Result<(), AppError> {
        self.execute(Method::DELETE, &routes::comment(post_id, comment_id))
            .await
    }

    async fn list_friend_requests(&self) -> Result<Vec<ConnectionRequest>, AppError> {
        self.fetch(Method::GET, routes::FRIEND_REQUESTS).await
    }

    async fn send_friend_request(
        &self,
        request: &SendRequest,
    ) -> Result<ConnectionRequest, AppError> {
        self.send_json(Method::POST, routes::FRIEND_REQUESTS, request)
            .await
    }

    async fn accept_friend_request(&self, id: RequestId) -> Result<(), AppError> {
        self.execute(Method::POST, &routes::accept_friend_request(id))
            .await
    }

    async fn reject_friend_request(&self, id: RequestId) -> Result<(), AppError> {
        self.execute(Method::POST, &routes::reject_friend_request(id))
            .await
    }

    async fn delete_friend_request(&self, id: RequestId) -> Result<(), AppError> {
        self.execute(Method::DELETE, &routes::friend_request(id))
            .await
    }

    async fn random_users(&self) -> Result<Vec<User>, AppError> {
        self.fetch(Method::GET, routes::RANDOM_USERS).await
    }
}
