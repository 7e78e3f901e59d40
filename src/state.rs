use std::sync::Arc;

use crate::{
    api::SocialApi,
    config::Config,
    controllers::{connection::ConnectionManager, feed::FeedStore, interaction::InteractionController},
    models::user::{User, UserId},
    notice::NoticeBoard,
};

/// Explicit per-login context handed to every controller.
/// Created at login or session restore, dropped at logout.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub current_user: User,
}

impl Session {
    pub fn user_id(&self) -> UserId {
        self.current_user.id
    }
}

/// Everything the view layer needs to build its stores.
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn SocialApi>,
    pub session: Session,
    pub notices: NoticeBoard,
    pub config: Config,
}

impl AppState {
    pub fn feed_store(&self) -> Arc<FeedStore> {
        Arc::new(FeedStore::new(
            self.api.clone(),
            self.session.clone(),
            self.notices.clone(),
        ))
    }

    /// Interaction controller that keeps `feed`'s counters in step.
    pub fn interactions(&self, feed: Arc<FeedStore>) -> InteractionController {
        InteractionController::new(self.api.clone(), self.session.clone(), self.notices.clone())
            .with_feed(feed)
    }

    pub fn connections(&self) -> ConnectionManager {
        ConnectionManager::new(self.api.clone(), self.session.clone(), self.notices.clone())
    }
}
