// src/utils/lifecycle.rs

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Ticket handed out when a full reload starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Tracks whether the view owning a store is still mounted, and which reload
/// is the most recent one.
///
/// Responses that arrive after `detach()`, or that belong to a reload that
/// has since been superseded, must be dropped instead of written.
#[derive(Debug)]
pub struct Lifecycle {
    attached: AtomicBool,
    generation: AtomicU64,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            attached: AtomicBool::new(true),
            generation: AtomicU64::new(0),
        }
    }

    pub fn attach(&self) {
        self.attached.store(true, Ordering::SeqCst);
    }

    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    /// Starts a reload; every earlier ticket becomes stale.
    pub fn begin_load(&self) -> LoadTicket {
        LoadTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether a reload's response may still be applied.
    pub fn accepts(&self, ticket: LoadTicket) -> bool {
        self.is_attached() && self.generation.load(Ordering::SeqCst) == ticket.0
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
