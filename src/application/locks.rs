use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<Mutex<()>>>;

/// Per-card mutual exclusion for balance mutations.
///
/// Two operations on the same card number never run at the same time.
/// Operations on two cards take both locks in ascending card-number order.
/// An entry lives only while some task holds or waits for its lock.
#[derive(Default)]
pub struct CardLocks {
    locks: Arc<LockMap>,
}

/// Guard for a single card. Releasing the last guard or waiter for a card
/// drops its map entry.
pub struct CardGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
    card_number: String,
}

impl Drop for CardGuard {
    fn drop(&mut self) {
        // Release the mutex first so its only remaining owner is the map.
        drop(self.guard.take());
        // Cloning a handle needs the shard lock held by `remove_if`, so a
        // count of one means no task can be holding or awaiting this mutex.
        self.locks
            .remove_if(&self.card_number, |_, m| Arc::strong_count(m) == 1);
    }
}

impl CardLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, card_number: &str) -> Arc<Mutex<()>> {
        // The map shard lock is released before the returned mutex is awaited.
        self.locks
            .entry(card_number.to_string())
            .or_default()
            .clone()
    }

    pub async fn lock(&self, card_number: &str) -> CardGuard {
        let guard = self.handle(card_number).lock_owned().await;
        CardGuard {
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
            card_number: card_number.to_string(),
        }
    }

    /// Lock two distinct cards in ascending card-number order.
    pub async fn lock_pair(&self, a: &str, b: &str) -> (CardGuard, CardGuard) {
        assert_ne!(a, b, "lock_pair needs two distinct cards");
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first = self.lock(first).await;
        let second = self.lock(second).await;
        (first, second)
    }

    /// Number of cards with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
