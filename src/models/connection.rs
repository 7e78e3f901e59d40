use serde::{Deserialize, Serialize};

use crate::models::{
    lenient_timestamp,
    user::{User, UserId},
};

pub type RequestId = i64;

/// Status of a friend request. Serialized with the backend's one-letter codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    #[serde(rename = "P", alias = "pending")]
    Pending,
    #[serde(rename = "A", alias = "accepted")]
    Accepted,
    #[serde(rename = "R", alias = "rejected")]
    Rejected,
}

impl RequestStatus {
    /// Accepted and Rejected never change again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Accepted)
                | (RequestStatus::Pending, RequestStatus::Rejected)
        )
    }
}

/// A friend request record from `/friend-requests/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    pub id: RequestId,
    pub from_user: User,
    pub to_user: User,
    pub status: RequestStatus,
    #[serde(
        alias = "timestamp",
        default,
        deserialize_with = "lenient_timestamp"
    )]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ConnectionRequest {
    pub fn is_incoming_for(&self, viewer: UserId) -> bool {
        self.status == RequestStatus::Pending && self.to_user.id == viewer
    }

    pub fn is_outgoing_for(&self, viewer: UserId) -> bool {
        self.status == RequestStatus::Pending && self.from_user.id == viewer
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.from_user.id == user || self.to_user.id == user
    }

    /// Pending or Accepted. Rejected records no longer block a new request.
    pub fn is_active(&self) -> bool {
        self.status != RequestStatus::Rejected
    }

    /// The user on the other side of the request from `viewer`.
    pub fn counterpart(&self, viewer: UserId) -> &User {
        if self.from_user.id == viewer {
            &self.to_user
        } else {
            &self.from_user
        }
    }
}

/// DTO for `POST /friend-requests/`.
#[derive(Debug, Clone, Serialize)]
pub struct SendRequest {
    pub to_user: UserId,
}

/// Display buckets derived from the full record set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buckets {
    pub incoming: Vec<ConnectionRequest>,
    pub outgoing: Vec<ConnectionRequest>,
    pub accepted: Vec<ConnectionRequest>,
    /// Rejected records and anything not addressed to or from the viewer.
    pub hidden: Vec<ConnectionRequest>,
}

impl Buckets {
    /// Classifies every record into exactly one bucket.
    pub fn partition(records: &[ConnectionRequest], viewer: UserId) -> Self {
        let mut buckets = Buckets::default();
        for record in records {
            let target = if record.is_incoming_for(viewer) {
                &mut buckets.incoming
            } else if record.is_outgoing_for(viewer) {
                &mut buckets.outgoing
            } else if record.status == RequestStatus::Accepted {
                &mut buckets.accepted
            } else {
                &mut buckets.hidden
            };
            target.push(record.clone());
        }
        buckets
    }

    pub fn len(&self) -> usize {
        self.incoming.len() + self.outgoing.len() + self.accepted.len() + self.hidden.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Relationship between the viewer and another user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    NotConnected,
    RequestSent,
    RequestReceived,
    Connected,
}

impl Relation {
    pub fn between(records: &[ConnectionRequest], viewer: UserId, other: UserId) -> Self {
        match find_active_between(records, viewer, other) {
            Some(r) if r.status == RequestStatus::Accepted => Relation::Connected,
            Some(r) if r.from_user.id == viewer => Relation::RequestSent,
            Some(_) => Relation::RequestReceived,
            None => Relation::NotConnected,
        }
    }
}

/// A suggested user annotated with the viewer's relation to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub user: User,
    pub relation: Relation,
}

/// The active request for the unordered pair {a, b}, if any.
pub fn find_active_between(
    records: &[ConnectionRequest],
    a: UserId,
    b: UserId,
) -> Option<&ConnectionRequest> {
    records
        .iter()
        .find(|r| r.is_active() && r.involves(a) && r.involves(b))
}
