// tests/common/mod.rs
#![allow(dead_code)]

//! In-process fake of the REST backend.
//!
//! Serves the same paths, status codes and JSON shapes as the real server so
//! the reqwest adapter and the stores run unmodified against it.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use pixello_core::{
    AppState, HttpApi, SocialApi, config::Config, controllers::auth, notice::NoticeBoard,
    utils::session_store::SessionStore,
};
use serde::Deserialize;
use serde_json::{Value, json};

pub const PASSWORD: &str = "password123";
const PAGE_SIZE: usize = 2;
const TIMESTAMP: &str = "2024-05-01T10:00:00Z";

type Shared = Arc<Mutex<Backend>>;

struct PostRow {
    id: i64,
    user: i64,
    content: Option<String>,
    video_url: Option<String>,
}

struct LikeRow {
    id: i64,
    user: i64,
    post: i64,
}

struct CommentRow {
    id: i64,
    post: i64,
    user: i64,
    text: String,
}

struct RequestRow {
    id: i64,
    from: i64,
    to: i64,
    status: &'static str,
}

#[derive(Default)]
struct Backend {
    base: String,
    users: Vec<(i64, String)>,
    tokens: HashMap<String, i64>,
    posts: Vec<PostRow>,
    likes: Vec<LikeRow>,
    comments: Vec<CommentRow>,
    requests: Vec<RequestRow>,
    next_id: i64,
    creates: HashMap<&'static str, usize>,
}

impl Backend {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn viewer(&self, headers: &HeaderMap) -> Option<i64> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let token = value.strip_prefix("JWT ")?;
        self.tokens.get(token).copied()
    }

    fn user_json(&self, id: i64) -> Value {
        let username = self
            .users
            .iter()
            .find(|(uid, _)| *uid == id)
            .map(|(_, name)| name.clone())
            .unwrap_or_default();
        json!({
            "id": id,
            "username": username,
            "first_name": username,
            "last_name": "",
            "avatar": null,
            "headline": format!("{} at Pixello", username),
        })
    }

    fn post_json(&self, post: &PostRow) -> Value {
        json!({
            "id": post.id,
            "user": self.user_json(post.user),
            "content": post.content,
            "image": null,
            "video_url": post.video_url,
            "timestamp": TIMESTAMP,
            "total_likes": self.likes.iter().filter(|l| l.post == post.id).count(),
            "total_comments": self.comments.iter().filter(|c| c.post == post.id).count(),
        })
    }

    fn comment_json(&self, comment: &CommentRow) -> Value {
        json!({
            "id": comment.id,
            "post": comment.post,
            "user": self.user_json(comment.user),
            "text": comment.text,
            "timestamp": TIMESTAMP,
        })
    }

    fn request_json(&self, request: &RequestRow) -> Value {
        json!({
            "id": request.id,
            "from_user": self.user_json(request.from),
            "to_user": self.user_json(request.to),
            "status": request.status,
            "created_at": TIMESTAMP,
        })
    }

    fn has_post(&self, id: i64) -> bool {
        self.posts.iter().any(|p| p.id == id)
    }

    fn count_create(&mut self, what: &'static str) {
        *self.creates.entry(what).or_default() += 1;
    }
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn detail(status: StatusCode, message: &str) -> Response {
    reply(status, json!({ "detail": message }))
}

fn unauthorized() -> Response {
    detail(
        StatusCode::UNAUTHORIZED,
        "Authentication credentials were not provided.",
    )
}

fn forbidden() -> Response {
    detail(
        StatusCode::FORBIDDEN,
        "You do not have permission to perform this action.",
    )
}

fn not_found() -> Response {
    detail(StatusCode::NOT_FOUND, "Not found.")
}

fn mint_token(user_id: i64) -> String {
    encode(
        &Header::default(),
        &json!({
            "token_type": "access",
            "user_id": user_id,
            "exp": 4_102_444_800u64,
            "jti": format!("jti-{}-{}", user_id, rand_suffix()),
        }),
        &EncodingKey::from_secret(b"fake-backend-secret"),
    )
    .unwrap()
}

fn rand_suffix() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

// --- Auth ---

async fn obtain_token(State(app): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut app = app.lock().unwrap();
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    let Some(user_id) = app
        .users
        .iter()
        .find(|(_, name)| name == username)
        .map(|(id, _)| *id)
        .filter(|_| password == PASSWORD)
    else {
        return detail(
            StatusCode::UNAUTHORIZED,
            "No active account found with the given credentials",
        );
    };

    let access = mint_token(user_id);
    app.tokens.insert(access.clone(), user_id);
    reply(
        StatusCode::OK,
        json!({ "access": access, "refresh": "refresh-token" }),
    )
}

async fn me(State(app): State<Shared>, headers: HeaderMap) -> Response {
    let app = app.lock().unwrap();
    let Some(me) = app.viewer(&headers) else {
        return unauthorized();
    };
    reply(StatusCode::OK, app.user_json(me))
}

// --- Posts ---

#[derive(Deserialize)]
struct PageQuery {
    page: Option<usize>,
}

async fn list_posts(
    State(app): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Response {
    let app = app.lock().unwrap();
    if app.viewer(&headers).is_none() {
        return unauthorized();
    }

    let page = query.page.unwrap_or(1);
    let count = app.posts.len();
    let pages = count.div_ceil(PAGE_SIZE).max(1);
    if page == 0 || page > pages {
        return detail(StatusCode::NOT_FOUND, "Invalid page.");
    }

    let results: Vec<Value> = app
        .posts
        .iter()
        .rev()
        .skip((page - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .map(|p| app.post_json(p))
        .collect();
    let next = (page < pages).then(|| format!("{}/posts/?page={}", app.base, page + 1));
    let previous = match page {
        1 => None,
        2 => Some(format!("{}/posts/", app.base)),
        n => Some(format!("{}/posts/?page={}", app.base, n - 1)),
    };

    reply(
        StatusCode::OK,
        json!({ "count": count, "next": next, "previous": previous, "results": results }),
    )
}

async fn create_post(
    State(app): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut app = app.lock().unwrap();
    let Some(me) = app.viewer(&headers) else {
        return unauthorized();
    };
    let id = app.id();
    let row = PostRow {
        id,
        user: me,
        content: body["content"].as_str().map(str::to_string),
        video_url: body["video_url"].as_str().map(str::to_string),
    };
    let body = app.post_json(&row);
    app.posts.push(row);
    reply(StatusCode::CREATED, body)
}

async fn update_post(
    State(app): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut app = app.lock().unwrap();
    let Some(me) = app.viewer(&headers) else {
        return unauthorized();
    };
    let Some(index) = app.posts.iter().position(|p| p.id == id) else {
        return not_found();
    };
    if app.posts[index].user != me {
        return forbidden();
    }
    app.posts[index].content = body["content"].as_str().map(str::to_string);
    app.posts[index].video_url = body["video_url"].as_str().map(str::to_string);
    reply(StatusCode::OK, app.post_json(&app.posts[index]))
}

async fn delete_post(
    State(app): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let mut app = app.lock().unwrap();
    let Some(me) = app.viewer(&headers) else {
        return unauthorized();
    };
    let Some(index) = app.posts.iter().position(|p| p.id == id) else {
        return not_found();
    };
    if app.posts[index].user != me {
        return forbidden();
    }
    app.posts.remove(index);
    app.likes.retain(|l| l.post != id);
    app.comments.retain(|c| c.post != id);
    StatusCode::NO_CONTENT.into_response()
}

// --- Likes ---

async fn list_likes(
    State(app): State<Shared>,
    headers: HeaderMap,
    Path(post_id): Path<i64>,
) -> Response {
    let app = app.lock().unwrap();
    if app.viewer(&headers).is_none() {
        return unauthorized();
    }
    if !app.has_post(post_id) {
        return not_found();
    }
    let likes: Vec<Value> = app
        .likes
        .iter()
        .filter(|l| l.post == post_id)
        .map(|l| json!({ "id": l.id, "user": l.user, "post": l.post }))
        .collect();
    reply(StatusCode::OK, json!(likes))
}

async fn create_like(
    State(app): State<Shared>,
    headers: HeaderMap,
    Path(post_id): Path<i64>,
) -> Response {
    let mut app = app.lock().unwrap();
    let Some(me) = app.viewer(&headers) else {
        return unauthorized();
    };
    app.count_create("like");
    if !app.has_post(post_id) {
        return not_found();
    }
    if app.likes.iter().any(|l| l.post == post_id && l.user == me) {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({ "non_field_errors": ["You have already liked this post."] }),
        );
    }
    let id = app.id();
    app.likes.push(LikeRow {
        id,
        user: me,
        post: post_id,
    });
    reply(
        StatusCode::CREATED,
        json!({ "id": id, "user": me, "post": post_id }),
    )
}

async fn delete_like(
    State(app): State<Shared>,
    headers: HeaderMap,
    Path((post_id, like_id)): Path<(i64, i64)>,
) -> Response {
    let mut app = app.lock().unwrap();
    let Some(me) = app.viewer(&headers) else {
        return unauthorized();
    };
    let Some(index) = app
        .likes
        .iter()
        .position(|l| l.id == like_id && l.post == post_id)
    else {
        return not_found();
    };
    if app.likes[index].user != me {
        return forbidden();
    }
    app.likes.remove(index);
    StatusCode::NO_CONTENT.into_response()
}

// --- Comments ---

async fn list_comments(
    State(app): State<Shared>,
    headers: HeaderMap,
    Path(post_id): Path<i64>,
) -> Response {
    let app = app.lock().unwrap();
    if app.viewer(&headers).is_none() {
        return unauthorized();
    }
    if !app.has_post(post_id) {
        return not_found();
    }
    let comments: Vec<Value> = app
        .comments
        .iter()
        .filter(|c| c.post == post_id)
        .map(|c| app.comment_json(c))
        .collect();
    reply(StatusCode::OK, json!(comments))
}

async fn create_comment(
    State(app): State<Shared>,
    headers: HeaderMap,
    Path(post_id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut app = app.lock().unwrap();
    let Some(me) = app.viewer(&headers) else {
        return unauthorized();
    };
    app.count_create("comment");
    if !app.has_post(post_id) {
        return not_found();
    }
    let text = body["text"].as_str().unwrap_or_default().to_string();
    if text.is_empty() {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({ "text": ["This field may not be blank."] }),
        );
    }
    let id = app.id();
    let row = CommentRow {
        id,
        post: post_id,
        user: me,
        text,
    };
    let body = app.comment_json(&row);
    app.comments.push(row);
    reply(StatusCode::CREATED, body)
}

async fn update_comment(
    State(app): State<Shared>,
    headers: HeaderMap,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    Json(body): Json<Value>,
) -> Response {
    let mut app = app.lock().unwrap();
    let Some(me) = app.viewer(&headers) else {
        return unauthorized();
    };
    let Some(index) = app
        .comments
        .iter()
        .position(|c| c.id == comment_id && c.post == post_id)
    else {
        return not_found();
    };
    if app.comments[index].user != me {
        return forbidden();
    }
    app.comments[index].text = body["text"].as_str().unwrap_or_default().to_string();
    reply(StatusCode::OK, app.comment_json(&app.comments[index]))
}

async fn delete_comment(
    State(app): State<Shared>,
    headers: HeaderMap,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Response {
    let mut app = app.lock().unwrap();
    let Some(me) = app.viewer(&headers) else {
        return unauthorized();
    };
    let Some(index) = app
        .comments
        .iter()
        .position(|c| c.id == comment_id && c.post == post_id)
    else {
        return not_found();
    };
    if app.comments[index].user != me {
        return forbidden();
    }
    app.comments.remove(index);
    StatusCode::NO_CONTENT.into_response()
}

// --- Friend requests ---

async fn list_requests(State(app): State<Shared>, headers: HeaderMap) -> Response {
    let app = app.lock().unwrap();
    let Some(me) = app.viewer(&headers) else {
        return unauthorized();
    };
    let records: Vec<Value> = app
        .requests
        .iter()
        .filter(|r| r.from == me || r.to == me)
        .map(|r| app.request_json(r))
        .collect();
    reply(StatusCode::OK, json!(records))
}

async fn send_request(
    State(app): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut app = app.lock().unwrap();
    let Some(me) = app.viewer(&headers) else {
        return unauthorized();
    };
    app.count_create("friend_request");
    let Some(to) = body["to_user"].as_i64() else {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({ "to_user": ["This field is required."] }),
        );
    };
    if to == me {
        return detail(StatusCode::BAD_REQUEST, "You cannot befriend yourself.");
    }
    if !app.users.iter().any(|(id, _)| *id == to) {
        return detail(StatusCode::NOT_FOUND, "User not found.");
    }
    let exists = app.requests.iter().any(|r| {
        r.status != "R" && ((r.from == me && r.to == to) || (r.from == to && r.to == me))
    });
    if exists {
        return detail(StatusCode::BAD_REQUEST, "Friend request already sent.");
    }
    let id = app.id();
    let row = RequestRow {
        id,
        from: me,
        to,
        status: "P",
    };
    let body = app.request_json(&row);
    app.requests.push(row);
    reply(StatusCode::CREATED, body)
}

async fn accept_request(
    State(app): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    answer_request(app, headers, id, "A").await
}

async fn reject_request(
    State(app): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    answer_request(app, headers, id, "R").await
}

async fn answer_request(app: Shared, headers: HeaderMap, id: i64, status: &'static str) -> Response {
    let mut app = app.lock().unwrap();
    let Some(me) = app.viewer(&headers) else {
        return unauthorized();
    };
    let Some(record) = app.requests.iter_mut().find(|r| r.id == id && r.to == me) else {
        return not_found();
    };
    if record.status != "P" {
        return detail(StatusCode::BAD_REQUEST, "Request was already answered.");
    }
    record.status = status;
    detail(StatusCode::OK, "ok")
}

async fn delete_request(
    State(app): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let mut app = app.lock().unwrap();
    let Some(me) = app.viewer(&headers) else {
        return unauthorized();
    };
    let Some(index) = app
        .requests
        .iter()
        .position(|r| r.id == id && r.from == me)
    else {
        return not_found();
    };
    app.requests.remove(index);
    StatusCode::NO_CONTENT.into_response()
}

async fn random_users(State(app): State<Shared>, headers: HeaderMap) -> Response {
    let app = app.lock().unwrap();
    if app.viewer(&headers).is_none() {
        return unauthorized();
    }
    let users: Vec<Value> = app.users.iter().map(|(id, _)| app.user_json(*id)).collect();
    reply(StatusCode::OK, json!(users))
}

fn router(shared: Shared) -> Router {
    Router::new()
        .route("/auth/jwt/create/", post(obtain_token))
        .route("/auth/users/me/", get(me))
        .route("/posts/", get(list_posts).post(create_post))
        .route("/posts/{id}/", put(update_post).delete(delete_post))
        .route("/posts/{id}/likes/", get(list_likes).post(create_like))
        .route("/posts/{id}/likes/{like_id}/", delete(delete_like))
        .route(
            "/posts/{id}/comments/",
            get(list_comments).post(create_comment),
        )
        .route(
            "/posts/{id}/comments/{comment_id}/",
            put(update_comment).delete(delete_comment),
        )
        .route("/friend-requests/", get(list_requests).post(send_request))
        .route("/friend-requests/{id}/", delete(delete_request))
        .route("/friend-requests/{id}/accept/", post(accept_request))
        .route("/friend-requests/{id}/reject/", post(reject_request))
        .route("/users/show_random_users", get(random_users))
        .with_state(shared)
}

/// Handle on a running fake backend.
pub struct TestApp {
    pub address: String,
    backend: Shared,
}

/// A logged-in client with its own session file.
pub struct TestClient {
    pub state: AppState,
    pub store: SessionStore,
    _dir: tempfile::TempDir,
}

/// Spawns the fake backend on a random port.
pub async fn spawn_app() -> TestApp {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let backend = Arc::new(Mutex::new(Backend {
        base: address.clone(),
        ..Backend::default()
    }));
    let app = router(backend.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, backend }
}

impl TestApp {
    pub fn config(&self) -> Config {
        Config::for_base_url(&self.address).unwrap()
    }

    pub fn api(&self) -> Arc<dyn SocialApi> {
        Arc::new(HttpApi::new(&self.config()).unwrap())
    }

    pub fn add_user(&self, id: i64, username: &str) {
        self.backend
            .lock()
            .unwrap()
            .users
            .push((id, username.to_string()));
    }

    pub fn add_post(&self, author: i64, content: &str) -> i64 {
        let mut app = self.backend.lock().unwrap();
        let id = app.id();
        app.posts.push(PostRow {
            id,
            user: author,
            content: Some(content.to_string()),
            video_url: None,
        });
        id
    }

    pub fn add_like(&self, user: i64, post: i64) -> i64 {
        let mut app = self.backend.lock().unwrap();
        let id = app.id();
        app.likes.push(LikeRow { id, user, post });
        id
    }

    pub fn add_comment(&self, user: i64, post: i64, text: &str) -> i64 {
        let mut app = self.backend.lock().unwrap();
        let id = app.id();
        app.comments.push(CommentRow {
            id,
            post,
            user,
            text: text.to_string(),
        });
        id
    }

    pub fn likes_by(&self, user: i64, post: i64) -> usize {
        let app = self.backend.lock().unwrap();
        app.likes
            .iter()
            .filter(|l| l.user == user && l.post == post)
            .count()
    }

    pub fn comments_by(&self, user: i64, post: i64) -> usize {
        let app = self.backend.lock().unwrap();
        app.comments
            .iter()
            .filter(|c| c.user == user && c.post == post)
            .count()
    }

    pub fn post_count(&self) -> usize {
        self.backend.lock().unwrap().posts.len()
    }

    /// How many create calls of a kind ("like", "comment", "friend_request")
    /// reached the backend.
    pub fn creates(&self, what: &str) -> usize {
        let app = self.backend.lock().unwrap();
        app.creates.get(what).copied().unwrap_or_default()
    }

    pub async fn login(&self, username: &str) -> TestClient {
        let api = self.api();
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let session = auth::login(api.as_ref(), &store, username, PASSWORD)
            .await
            .expect("Login failed");

        TestClient {
            state: AppState {
                api,
                session,
                notices: NoticeBoard::new(),
                config: self.config(),
            },
            store,
            _dir: dir,
        }
    }
}
