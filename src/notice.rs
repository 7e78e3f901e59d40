// src/notice.rs

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use crate::error::AppError;

/// Oldest notices are dropped past this many.
const MAX_PENDING: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A dismissible, user-visible message.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Default)]
struct Queue {
    next_id: u64,
    items: VecDeque<Notice>,
}

/// Shared queue of notices, cloned into every controller.
#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    queue: Arc<Mutex<Queue>>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Info, message.into())
    }

    /// Posts the user-facing text of `err`.
    /// Conflicts are resolved as no-ops and never shown.
    pub fn error(&self, err: &AppError) -> Option<u64> {
        if err.is_conflict() {
            return None;
        }
        Some(self.push(NoticeLevel::Error, err.user_message()))
    }

    pub fn dismiss(&self, id: u64) -> bool {
        let mut queue = self.lock();
        let before = queue.items.len();
        queue.items.retain(|n| n.id != id);
        queue.items.len() != before
    }

    pub fn pending(&self) -> Vec<Notice> {
        self.lock().items.iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().items.clear();
    }

    fn push(&self, level: NoticeLevel, message: String) -> u64 {
        let mut queue = self.lock();
        queue.next_id += 1;
        let id = queue.next_id;
        queue.items.push_back(Notice { id, level, message });
        while queue.items.len() > MAX_PENDING {
            queue.items.pop_front();
        }
        id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Queue> {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
