use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    api::SocialApi,
    error::AppError,
    models::post::{Post, PostId, PostRequest},
    notice::NoticeBoard,
    routes,
    state::Session,
    utils::{entity_lock::EntityLocks, lifecycle::Lifecycle},
};

/// Load state of the feed as the view renders it.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedStatus {
    Idle,
    Loading,
    Ready,
    /// Last load failed; holds the message shown to the user.
    Failed(String),
}

/// Read-only copy of the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    pub posts: Vec<Post>,
    pub page: u32,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub total: Option<u64>,
    pub status: FeedStatus,
}

impl Default for FeedSnapshot {
    fn default() -> Self {
        Self {
            posts: Vec::new(),
            page: 1,
            next: None,
            previous: None,
            total: None,
            status: FeedStatus::Idle,
        }
    }
}

/// A confirmed local write, kept while a load is in flight so the page it
/// returns can be brought up to date.
#[derive(Debug, Clone)]
enum LocalWrite {
    Created(Post),
    Edited(Post),
    Deleted(PostId),
    Counters {
        id: PostId,
        like_count: u32,
        comment_count: u32,
    },
}

impl LocalWrite {
    fn apply(&self, posts: &mut Vec<Post>) {
        match self {
            LocalWrite::Created(post) => {
                posts.retain(|p| p.id != post.id);
                posts.insert(0, post.clone());
            }
            LocalWrite::Edited(updated) => {
                if let Some(post) = posts.iter_mut().find(|p| p.id == updated.id) {
                    post.apply_edit(updated);
                }
            }
            LocalWrite::Deleted(id) => posts.retain(|p| p.id != *id),
            LocalWrite::Counters {
                id,
                like_count,
                comment_count,
            } => {
                if let Some(post) = posts.iter_mut().find(|p| p.id == *id) {
                    post.like_count = *like_count;
                    post.comment_count = *comment_count;
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct FeedState {
    view: FeedSnapshot,
    /// Writes made while `view.status` is `Loading`, numbered from `writes`.
    journal: Vec<(u64, LocalWrite)>,
    writes: u64,
}

impl FeedState {
    fn record(&mut self, write: LocalWrite) {
        write.apply(&mut self.view.posts);
        if self.view.status == FeedStatus::Loading {
            self.writes += 1;
            self.journal.push((self.writes, write));
        }
    }
}

/// Ordered posts of the current page plus the mutations on them.
pub struct FeedStore {
    api: Arc<dyn SocialApi>,
    session: Session,
    notices: NoticeBoard,
    state: RwLock<FeedState>,
    locks: EntityLocks<PostId>,
    lifecycle: Lifecycle,
}

impl FeedStore {
    pub fn new(api: Arc<dyn SocialApi>, session: Session, notices: NoticeBoard) -> Self {
        Self {
            api,
            session,
            notices,
            state: RwLock::new(FeedState::default()),
            locks: EntityLocks::new(),
            lifecycle: Lifecycle::new(),
        }
    }

    pub async fn snapshot(&self) -> FeedSnapshot {
        self.state.read().await.view.clone()
    }

    pub async fn posts(&self) -> Vec<Post> {
        self.state.read().await.view.posts.clone()
    }

    pub async fn post(&self, id: PostId) -> Option<Post> {
        self.state
            .read()
            .await
            .view
            .posts
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub async fn status(&self) -> FeedStatus {
        self.state.read().await.view.status.clone()
    }

    pub async fn has_next(&self) -> bool {
        self.state.read().await.view.next.is_some()
    }

    pub async fn has_previous(&self) -> bool {
        self.state.read().await.view.previous.is_some()
    }

    /// The view is gone; late responses are dropped from now on.
    pub fn detach(&self) {
        self.lifecycle.detach();
    }

    pub fn attach(&self) {
        self.lifecycle.attach();
    }

    /// Replaces the feed with page `page` (1-based).
    ///
    /// Edits, deletions and creations confirmed while the request is in
    /// flight are replayed on top of the returned page.
    pub async fn load_page(&self, page: u32) -> Result<(), AppError> {
        if page == 0 {
            return Err(self.surface(
                AppError::BadRequest("Pages start at 1".to_string()),
                "load feed",
            ));
        }

        let ticket = self.lifecycle.begin_load();
        let since = {
            let mut state = self.state.write().await;
            if self.lifecycle.is_attached() {
                state.view.status = FeedStatus::Loading;
            }
            state.writes
        };

        match self.api.list_posts(page).await {
            Ok(result) => {
                if !self.lifecycle.accepts(ticket) {
                    tracing::debug!("Discarding superseded feed page {}", page);
                    return Ok(());
                }

                let mut guard = self.state.write().await;
                let state = &mut *guard;
                let mut posts = dedupe(result.results);
                for (_, write) in state.journal.iter().filter(|(n, _)| *n > since) {
                    write.apply(&mut posts);
                }
                state.journal.clear();
                state.view = FeedSnapshot {
                    posts,
                    page,
                    next: result.next,
                    previous: result.previous,
                    total: result.count,
                    status: FeedStatus::Ready,
                };
                tracing::info!("Loaded feed page {} ({} posts)", page, state.view.posts.len());
                Ok(())
            }
            Err(e) => {
                if self.lifecycle.accepts(ticket) {
                    let mut state = self.state.write().await;
                    state.journal.clear();
                    state.view.status = FeedStatus::Failed(e.user_message());
                }
                Err(self.surface(e, "load feed"))
            }
        }
    }

    /// Loads the next page. Returns `false` when there is none.
    pub async fn next_page(&self) -> Result<bool, AppError> {
        let (page, next) = {
            let state = self.state.read().await;
            (state.view.page, state.view.next.clone())
        };
        let Some(link) = next else {
            return Ok(false);
        };

        let target = routes::page_from_link(&link).unwrap_or(page + 1);
        self.load_page(target).await?;
        Ok(true)
    }

    /// Loads the previous page. Returns `false` when there is none.
    pub async fn previous_page(&self) -> Result<bool, AppError> {
        let (page, previous) = {
            let state = self.state.read().await;
            (state.view.page, state.view.previous.clone())
        };
        let Some(link) = previous else {
            return Ok(false);
        };

        let target = routes::page_from_link(&link).unwrap_or(page.saturating_sub(1).max(1));
        self.load_page(target).await?;
        Ok(true)
    }

    /// Persists a new post and puts the server's copy at the head of the feed.
    /// Nothing is inserted until the server has assigned an id.
    pub async fn create_post(
        &self,
        content: Option<&str>,
        video_url: Option<&str>,
    ) -> Result<Post, AppError> {
        let request = PostRequest::new(content, video_url).map_err(|e| self.surface(e, "create post"))?;

        let post = self
            .api
            .create_post(&request)
            .await
            .map_err(|e| self.surface(e, "create post"))?;

        self.write(LocalWrite::Created(post.clone())).await;
        tracing::info!("Created post {}", post.id);
        Ok(post)
    }

    /// Updates content and media of a post, keeping its position.
    pub async fn edit_post(
        &self,
        id: PostId,
        content: Option<&str>,
        video_url: Option<&str>,
    ) -> Result<Post, AppError> {
        let request = PostRequest::new(content, video_url).map_err(|e| self.surface(e, "edit post"))?;
        self.ensure_owner(id, "edit").await?;

        let _turn = self.locks.acquire(id).await;
        let updated = self
            .api
            .update_post(id, &request)
            .await
            .map_err(|e| self.surface(e, "edit post"))?;

        self.write(LocalWrite::Edited(updated.clone())).await;
        tracing::info!("Edited post {}", id);
        Ok(updated)
    }

    /// Deletes a post. A post the server no longer has counts as deleted.
    pub async fn delete_post(&self, id: PostId) -> Result<(), AppError> {
        self.ensure_owner(id, "delete").await?;

        let _turn = self.locks.acquire(id).await;
        match self.api.delete_post(id).await {
            Ok(()) => tracing::info!("Deleted post {}", id),
            Err(e) if e.is_not_found() => {
                tracing::warn!("Post {} was already deleted", id);
            }
            Err(e) => return Err(self.surface(e, "delete post")),
        }

        self.write(LocalWrite::Deleted(id)).await;
        Ok(())
    }

    /// Mirrors the interaction counters of a post currently in the feed.
    pub(crate) async fn set_counters(&self, id: PostId, like_count: u32, comment_count: u32) {
        self.write(LocalWrite::Counters {
            id,
            like_count,
            comment_count,
        })
        .await;
    }

    async fn write(&self, write: LocalWrite) {
        if !self.lifecycle.is_attached() {
            return;
        }
        self.state.write().await.record(write);
    }

    /// Posts of other users cannot be edited or deleted.
    /// Posts not in the feed are left to the server to judge.
    async fn ensure_owner(&self, id: PostId, action: &str) -> Result<(), AppError> {
        let me = self.session.user_id();
        match self.post(id).await {
            Some(post) if !post.is_owned_by(me) => Err(self.surface(
                AppError::InvalidState(format!("You can only {} your own posts", action)),
                action,
            )),
            _ => Ok(()),
        }
    }

    fn surface(&self, err: AppError, action: &str) -> AppError {
        tracing::error!("Failed to {}: {}", action, err);
        self.notices.error(&err);
        err
    }
}

/// Keeps the first occurrence of every id.
fn dedupe(posts: Vec<Post>) -> Vec<Post> {
    let mut seen = std::collections::HashSet::new();
    posts.into_iter().filter(|p| seen.insert(p.id)).collect()
}
