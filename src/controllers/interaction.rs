use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{
    api::SocialApi,
    controllers::feed::FeedStore,
    error::AppError,
    models::{
        comment::{Comment, CommentId, CommentRequest},
        like,
        post::{Post, PostId},
    },
    notice::NoticeBoard,
    state::Session,
    utils::entity_lock::EntityLocks,
};

/// Like and comment state of one mounted post.
#[derive(Debug, Clone, PartialEq)]
pub struct PostInteraction {
    pub post_id: PostId,
    pub liked: bool,
    pub like_count: u32,
    /// Counter from the server, used until the comment list is loaded.
    server_comment_count: u32,
    comments: Option<Vec<Comment>>,
}

impl PostInteraction {
    fn from_post(post: &Post) -> Self {
        Self {
            post_id: post.id,
            liked: false,
            like_count: post.like_count,
            server_comment_count: post.comment_count,
            comments: None,
        }
    }

    /// Length of the loaded list when there is one, the server counter otherwise.
    pub fn comment_count(&self) -> u32 {
        match &self.comments {
            Some(list) => u32::try_from(list.len()).unwrap_or(u32::MAX),
            None => self.server_comment_count,
        }
    }

    pub fn comments(&self) -> &[Comment] {
        self.comments.as_deref().unwrap_or_default()
    }

    pub fn comments_loaded(&self) -> bool {
        self.comments.is_some()
    }

    fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.comments().iter().find(|c| c.id == id)
    }
}

/// Result of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked,
    Unliked,
    /// The server already had our like; nothing was created.
    AlreadyLiked,
    /// The server had no like to remove; nothing was decremented.
    AlreadyUnliked,
}

/// Result of adding a comment.
#[derive(Debug, Clone, PartialEq)]
pub enum CommentOutcome {
    Created(Comment),
    /// One comment per user per post: the existing one is returned and no
    /// create call is made.
    AlreadyCommented(Comment),
}

/// Per-post like and comment logic.
///
/// Posts are mounted when the view displays them and unmounted when it stops;
/// responses for unmounted posts are dropped. All operations on one post run
/// one after another in the order they were issued.
pub struct InteractionController {
    api: Arc<dyn SocialApi>,
    session: Session,
    notices: NoticeBoard,
    feed: Option<Arc<FeedStore>>,
    posts: RwLock<HashMap<PostId, PostInteraction>>,
    locks: EntityLocks<PostId>,
}

impl InteractionController {
    pub fn new(api: Arc<dyn SocialApi>, session: Session, notices: NoticeBoard) -> Self {
        Self {
            api,
            session,
            notices,
            feed: None,
            posts: RwLock::new(HashMap::new()),
            locks: EntityLocks::new(),
        }
    }

    /// Mirrors like and comment counters into `feed` after every change.
    pub fn with_feed(mut self, feed: Arc<FeedStore>) -> Self {
        self.feed = Some(feed);
        self
    }

    pub async fn state(&self, post_id: PostId) -> Option<PostInteraction> {
        self.posts.read().await.get(&post_id).cloned()
    }

    /// Starts tracking `post` and reads whether the current user likes it.
    /// Mounting a tracked post again only re-reads the like status.
    pub async fn mount(&self, post: &Post) -> Result<PostInteraction, AppError> {
        let _turn = self.locks.acquire(post.id).await;
        self.posts
            .write()
            .await
            .entry(post.id)
            .or_insert_with(|| PostInteraction::from_post(post));

        let likes = self
            .api
            .list_likes(post.id)
            .await
            .map_err(|e| self.surface(e, "load like status"))?;
        let liked = like::find_by_user(&likes, self.session.user_id()).is_some();

        self.apply(post.id, |s| s.liked = liked)
            .await
            .ok_or_else(|| unmounted(post.id))
    }

    /// Stops tracking a post. In-flight responses for it are discarded.
    pub async fn unmount(&self, post_id: PostId) {
        self.posts.write().await.remove(&post_id);
    }

    /// Likes or unlikes the post.
    ///
    /// The server's like list is read on every toggle, so a stale local
    /// flag can only lead to a no-op, never to a duplicate like or a double
    /// decrement.
    pub async fn toggle_like(&self, post_id: PostId) -> Result<LikeOutcome, AppError> {
        let _turn = self.locks.acquire(post_id).await;
        let liked = self.require_mounted(post_id).await?.liked;
        let me = self.session.user_id();

        let likes = self
            .api
            .list_likes(post_id)
            .await
            .map_err(|e| self.surface(e, "toggle like"))?;
        let existing = like::find_by_user(&likes, me).cloned();

        let outcome = match (liked, existing) {
            (false, None) => match self.api.create_like(post_id).await {
                Ok(_) => {
                    self.apply(post_id, |s| {
                        s.liked = true;
                        s.like_count = s.like_count.saturating_add(1);
                    })
                    .await;
                    LikeOutcome::Liked
                }
                Err(e) if e.is_conflict() => {
                    tracing::warn!("Like on post {} already exists", post_id);
                    self.apply(post_id, |s| s.liked = true).await;
                    LikeOutcome::AlreadyLiked
                }
                Err(e) => return Err(self.surface(e, "like post")),
            },
            (false, Some(_)) => {
                tracing::warn!("Post {} was already liked by user {}", post_id, me);
                self.apply(post_id, |s| s.liked = true).await;
                LikeOutcome::AlreadyLiked
            }
            (true, Some(existing)) => match self.api.delete_like(post_id, existing.id).await {
                Ok(()) => {
                    self.apply(post_id, |s| {
                        s.liked = false;
                        s.like_count = s.like_count.saturating_sub(1);
                    })
                    .await;
                    LikeOutcome::Unliked
                }
                Err(e) if e.is_not_found() => {
                    tracing::warn!("Like {} on post {} was already removed", existing.id, post_id);
                    self.apply(post_id, |s| s.liked = false).await;
                    LikeOutcome::AlreadyUnliked
                }
                Err(e) => return Err(self.surface(e, "unlike post")),
            },
            (true, None) => {
                tracing::warn!("No like found for user {} on post {}", me, post_id);
                self.apply(post_id, |s| s.liked = false).await;
                LikeOutcome::AlreadyUnliked
            }
        };

        self.sync_feed(post_id).await;
        Ok(outcome)
    }

    /// Replaces the local comment list with the server's.
    pub async fn load_comments(&self, post_id: PostId) -> Result<Vec<Comment>, AppError> {
        let _turn = self.locks.acquire(post_id).await;
        self.require_mounted(post_id).await?;

        let comments = self
            .api
            .list_comments(post_id)
            .await
            .map_err(|e| self.surface(e, "load comments"))?;

        self.apply(post_id, |s| s.comments = Some(comments.clone()))
            .await;
        self.sync_feed(post_id).await;
        Ok(comments)
    }

    /// Adds the current user's comment unless they already have one here.
    pub async fn add_comment(&self, post_id: PostId, text: &str) -> Result<CommentOutcome, AppError> {
        let request = CommentRequest::new(text).map_err(|e| self.surface(e, "add comment"))?;

        let _turn = self.locks.acquire(post_id).await;
        self.require_mounted(post_id).await?;

        if let Some(existing) = self.own_comment(post_id).await? {
            tracing::info!("User already commented on post {}", post_id);
            return Ok(CommentOutcome::AlreadyCommented(existing));
        }

        let created = match self.api.create_comment(post_id, &request).await {
            Ok(comment) => comment,
            Err(e) if e.is_conflict() => {
                return match self.own_comment(post_id).await? {
                    Some(existing) => Ok(CommentOutcome::AlreadyCommented(existing)),
                    None => Err(self.surface(e, "add comment")),
                };
            }
            Err(e) => return Err(self.surface(e, "add comment")),
        };

        self.apply(post_id, |s| {
            if let Some(list) = s.comments.as_mut() {
                list.push(created.clone());
            }
            s.server_comment_count = s.server_comment_count.saturating_add(1);
        })
        .await;
        self.sync_feed(post_id).await;
        tracing::info!("Added comment {} to post {}", created.id, post_id);
        Ok(CommentOutcome::Created(created))
    }

    /// Replaces a comment's text. Only the author may edit.
    pub async fn edit_comment(
        &self,
        post_id: PostId,
        comment_id: CommentId,
        text: &str,
    ) -> Result<Comment, AppError> {
        let request = CommentRequest::new(text).map_err(|e| self.surface(e, "edit comment"))?;

        let _turn = self.locks.acquire(post_id).await;
        self.ensure_comment_owner(post_id, comment_id, "edit").await?;

        let updated = self
            .api
            .update_comment(post_id, comment_id, &request)
            .await
            .map_err(|e| self.surface(e, "edit comment"))?;

        self.apply(post_id, |s| {
            if let Some(comment) = s
                .comments
                .as_mut()
                .and_then(|list| list.iter_mut().find(|c| c.id == comment_id))
            {
                comment.text = updated.text.clone();
            }
        })
        .await;
        Ok(updated)
    }

    /// Deletes a comment on the server, then locally.
    /// A comment the server no longer has counts as deleted.
    pub async fn delete_comment(&self, post_id: PostId, comment_id: CommentId) -> Result<(), AppError> {
        let _turn = self.locks.acquire(post_id).await;
        self.ensure_comment_owner(post_id, comment_id, "delete").await?;

        let existed = match self.api.delete_comment(post_id, comment_id).await {
            Ok(()) => true,
            Err(e) if e.is_not_found() => {
                tracing::warn!("Comment {} was already deleted", comment_id);
                false
            }
            Err(e) => return Err(self.surface(e, "delete comment")),
        };

        self.apply(post_id, |s| {
            if let Some(list) = s.comments.as_mut() {
                list.retain(|c| c.id != comment_id);
            }
            if existed {
                s.server_comment_count = s.server_comment_count.saturating_sub(1);
            }
        })
        .await;
        self.sync_feed(post_id).await;
        Ok(())
    }

    /// Looks up the current user's comment on the server and refreshes the
    /// local list with the response.
    async fn own_comment(&self, post_id: PostId) -> Result<Option<Comment>, AppError> {
        let comments = self
            .api
            .list_comments(post_id)
            .await
            .map_err(|e| self.surface(e, "check comments"))?;
        let me = self.session.user_id();
        let existing = comments.iter().find(|c| c.is_owned_by(me)).cloned();

        self.apply(post_id, |s| s.comments = Some(comments)).await;
        Ok(existing)
    }

    /// Comments known to belong to someone else cannot be changed.
    async fn ensure_comment_owner(
        &self,
        post_id: PostId,
        comment_id: CommentId,
        action: &str,
    ) -> Result<(), AppError> {
        let state = self.require_mounted(post_id).await?;
        match state.comment(comment_id) {
            Some(comment) if !comment.is_owned_by(self.session.user_id()) => Err(self.surface(
                AppError::InvalidState(format!("You can only {} your own comments", action)),
                action,
            )),
            _ => Ok(()),
        }
    }

    async fn require_mounted(&self, post_id: PostId) -> Result<PostInteraction, AppError> {
        self.state(post_id).await.ok_or_else(|| unmounted(post_id))
    }

    /// Applies `update` if the post is still mounted.
    async fn apply<F>(&self, post_id: PostId, update: F) -> Option<PostInteraction>
    where
        F: FnOnce(&mut PostInteraction),
    {
        let mut posts = self.posts.write().await;
        match posts.get_mut(&post_id) {
            Some(state) => {
                update(state);
                Some(state.clone())
            }
            None => {
                tracing::debug!("Discarding response for unmounted post {}", post_id);
                None
            }
        }
    }

    async fn sync_feed(&self, post_id: PostId) {
        let (Some(feed), Some(state)) = (&self.feed, self.state(post_id).await) else {
            return;
        };
        feed.set_counters(post_id, state.like_count, state.comment_count())
            .await;
    }

    fn surface(&self, err: AppError, action: &str) -> AppError {
        tracing::error!("Failed to {}: {}", action, err);
        self.notices.error(&err);
        err
    }
}

fn unmounted(post_id: PostId) -> AppError {
    AppError::InvalidState(format!("Post {} is not displayed", post_id))
}
