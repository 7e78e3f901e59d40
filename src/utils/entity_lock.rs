// src/utils/entity_lock.rs

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Mutex},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One FIFO async lock per entity id.
///
/// Mutations on the same entity queue up in the order they were issued, so
/// the last issued mutation is also the last one applied. Different entities
/// never wait on each other.
pub struct EntityLocks<K> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K: Eq + Hash + Copy> EntityLocks<K> {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Waits for the entity's turn. The returned guard releases it on drop.
    pub async fn acquire(&self, key: K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // Entries nobody holds or waits on only have the map's reference.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(key).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of entities with a holder or waiter, as of the last acquire.
    pub fn tracked(&self) -> usize {
        self.locks
            .lock()
            .map(|locks| locks.len())
            .unwrap_or_default()
    }
}

impl<K: Eq + Hash + Copy> Default for EntityLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}
