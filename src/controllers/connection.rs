use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    api::SocialApi,
    error::AppError,
    models::{
        connection::{
            Buckets, ConnectionRequest, Relation, RequestId, RequestStatus, SendRequest,
            Suggestion, find_active_between,
        },
        user::UserId,
    },
    notice::NoticeBoard,
    state::Session,
    utils::{entity_lock::EntityLocks, lifecycle::Lifecycle},
};

/// Result of sending a friend request.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Sent(ConnectionRequest),
    /// A Pending or Accepted request already links the two users.
    /// Holds it when it is known locally.
    AlreadyActive(Option<ConnectionRequest>),
}

/// Friend request records of the current user and the transitions on them.
///
/// Only the flat record list is stored. Incoming, outgoing and accepted are
/// derived from it on every read, and a successful refresh replaces it
/// wholesale.
pub struct ConnectionManager {
    api: Arc<dyn SocialApi>,
    session: Session,
    notices: NoticeBoard,
    records: RwLock<Vec<ConnectionRequest>>,
    request_locks: EntityLocks<RequestId>,
    recipient_locks: EntityLocks<UserId>,
    lifecycle: Lifecycle,
}

impl ConnectionManager {
    pub fn new(api: Arc<dyn SocialApi>, session: Session, notices: NoticeBoard) -> Self {
        Self {
            api,
            session,
            notices,
            records: RwLock::new(Vec::new()),
            request_locks: EntityLocks::new(),
            recipient_locks: EntityLocks::new(),
            lifecycle: Lifecycle::new(),
        }
    }

    pub async fn records(&self) -> Vec<ConnectionRequest> {
        self.records.read().await.clone()
    }

    pub async fn buckets(&self) -> Buckets {
        Buckets::partition(&self.records.read().await, self.session.user_id())
    }

    pub async fn incoming(&self) -> Vec<ConnectionRequest> {
        self.buckets().await.incoming
    }

    pub async fn outgoing(&self) -> Vec<ConnectionRequest> {
        self.buckets().await.outgoing
    }

    pub async fn accepted(&self) -> Vec<ConnectionRequest> {
        self.buckets().await.accepted
    }

    pub fn detach(&self) {
        self.lifecycle.detach();
    }

    pub fn attach(&self) {
        self.lifecycle.attach();
    }

    /// Reloads every record visible to the current user.
    /// The server's list supersedes whatever was applied locally.
    pub async fn refresh(&self) -> Result<Buckets, AppError> {
        let ticket = self.lifecycle.begin_load();
        let fetched = self
            .api
            .list_friend_requests()
            .await
            .map_err(|e| self.surface(e, "load connection requests"))?;

        if self.lifecycle.accepts(ticket) {
            *self.records.write().await = fetched;
        } else {
            tracing::debug!("Discarding superseded connection refresh");
        }
        Ok(self.buckets().await)
    }

    /// Sends a request to `to_user` unless the pair already has an active one.
    pub async fn send_request(&self, to_user: UserId) -> Result<SendOutcome, AppError> {
        let me = self.session.user_id();
        if to_user == me {
            return Err(self.surface(
                AppError::InvalidState("You cannot send a request to yourself".to_string()),
                "send connection request",
            ));
        }

        let _turn = self.recipient_locks.acquire(to_user).await;
        if let Some(active) = self.active_with(to_user).await {
            tracing::info!("Request {} already links users {} and {}", active.id, me, to_user);
            return Ok(SendOutcome::AlreadyActive(Some(active)));
        }

        let created = match self.api.send_friend_request(&SendRequest { to_user }).await {
            Ok(record) => record,
            Err(e) if e.is_conflict() => {
                tracing::warn!("Server reports an existing request to user {}", to_user);
                return Ok(SendOutcome::AlreadyActive(None));
            }
            Err(e) => return Err(self.surface(e, "send connection request")),
        };

        if self.lifecycle.is_attached() {
            let mut records = self.records.write().await;
            if !records.iter().any(|r| r.id == created.id) {
                records.push(created.clone());
            }
        }
        self.notices.info(format!(
            "Connection request sent to {}!",
            created.to_user.display_name()
        ));
        tracing::info!("Sent connection request {} to user {}", created.id, to_user);
        Ok(SendOutcome::Sent(created))
    }

    /// Accepts an incoming pending request.
    pub async fn accept(&self, id: RequestId) -> Result<ConnectionRequest, AppError> {
        let _turn = self.request_locks.acquire(id).await;
        let record = self.require_incoming(id, "accept connection request").await?;

        self.api
            .accept_friend_request(id)
            .await
            .map_err(|e| self.surface(e, "accept connection request"))?;

        let updated = self
            .transition(id, RequestStatus::Accepted)
            .await
            .unwrap_or_else(|| ConnectionRequest {
                status: RequestStatus::Accepted,
                ..record.clone()
            });
        self.notices.info(format!(
            "Connection request from {} accepted!",
            record.from_user.display_name()
        ));
        tracing::info!("Accepted connection request {}", id);
        Ok(updated)
    }

    /// Declines an incoming pending request. It disappears from every bucket.
    pub async fn reject(&self, id: RequestId) -> Result<ConnectionRequest, AppError> {
        let _turn = self.request_locks.acquire(id).await;
        let record = self.require_incoming(id, "decline connection request").await?;

        self.api
            .reject_friend_request(id)
            .await
            .map_err(|e| self.surface(e, "decline connection request"))?;

        let updated = self
            .transition(id, RequestStatus::Rejected)
            .await
            .unwrap_or_else(|| ConnectionRequest {
                status: RequestStatus::Rejected,
                ..record.clone()
            });
        self.notices.info(format!(
            "Connection request from {} declined.",
            record.from_user.display_name()
        ));
        tracing::info!("Declined connection request {}", id);
        Ok(updated)
    }

    /// Withdraws an outgoing pending request.
    /// A request the server no longer has counts as withdrawn.
    pub async fn cancel(&self, id: RequestId) -> Result<(), AppError> {
        let _turn = self.request_locks.acquire(id).await;
        let me = self.session.user_id();
        let record = self.find(id).await;
        if !record.as_ref().is_some_and(|r| r.is_outgoing_for(me)) {
            return Err(self.surface(
                AppError::InvalidState(format!(
                    "Request {} is not a pending request you sent",
                    id
                )),
                "cancel connection request",
            ));
        }

        match self.api.delete_friend_request(id).await {
            Ok(()) => tracing::info!("Cancelled connection request {}", id),
            Err(e) if e.is_not_found() => {
                tracing::warn!("Connection request {} was already removed", id);
            }
            Err(e) => return Err(self.surface(e, "cancel connection request")),
        }

        if self.lifecycle.is_attached() {
            self.records.write().await.retain(|r| r.id != id);
        }
        Ok(())
    }

    /// Random users to connect with, minus the viewer, each tagged with the
    /// viewer's current relation to them.
    pub async fn suggestions(&self) -> Result<Vec<Suggestion>, AppError> {
        let me = self.session.user_id();
        let users = self
            .api
            .random_users()
            .await
            .map_err(|e| self.surface(e, "load suggestions"))?;

        let records = self.records.read().await;
        Ok(users
            .into_iter()
            .filter(|u| u.id != me)
            .map(|user| Suggestion {
                relation: Relation::between(&records, me, user.id),
                user,
            })
            .collect())
    }

    async fn find(&self, id: RequestId) -> Option<ConnectionRequest> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    async fn active_with(&self, other: UserId) -> Option<ConnectionRequest> {
        find_active_between(&self.records.read().await, self.session.user_id(), other).cloned()
    }

    /// Only a pending request addressed to the viewer may be answered.
    async fn require_incoming(
        &self,
        id: RequestId,
        action: &str,
    ) -> Result<ConnectionRequest, AppError> {
        let me = self.session.user_id();
        match self.find(id).await {
            Some(record) if record.is_incoming_for(me) => Ok(record),
            _ => Err(self.surface(
                AppError::InvalidState(format!(
                    "Request {} is not a pending request addressed to you",
                    id
                )),
                action,
            )),
        }
    }

    /// Moves a record to `next` if the state machine allows it.
    async fn transition(&self, id: RequestId, next: RequestStatus) -> Option<ConnectionRequest> {
        if !self.lifecycle.is_attached() {
            return None;
        }
        let mut records = self.records.write().await;
        let record = records.iter_mut().find(|r| r.id == id)?;
        if record.status.can_transition_to(next) {
            record.status = next;
        } else {
            tracing::warn!(
                "Request {} is already {:?}; keeping the refreshed state",
                id,
                record.status
            );
        }
        Some(record.clone())
    }

    fn surface(&self, err: AppError, action: &str) -> AppError {
        tracing::error!("Failed to {}: {}", action, err);
        self.notices.error(&err);
        err
    }
}
