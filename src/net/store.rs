use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::net::messages::{
    KillFeedRecord, LeaderboardEntry, LeaderboardRecord, PlayerRecord, PlayersSnapshot,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("shared store is offline")]
    Offline,
    #[error("store connection closed")]
    Closed,
    #[error("store rejected request: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Connecting,
    Online,
    Offline,
}

pub type Callback<T> = Box<dyn Fn(T) + Send + Sync>;

/// Capability interface over the shared multi-writer store.
///
/// Calls never block on the network: an implementation either completes in memory
/// or hands the request to a background transport. `Ok` means "accepted", not
/// "durably applied".
pub trait SharedStore: Send + Sync {
    fn upsert_player(&self, id: &str, record: PlayerRecord) -> Result<(), StoreError>;

    fn remove_player(&self, id: &str) -> Result<(), StoreError>;

    /// Asks the backend to delete `id` once this writer's connection goes away.
    fn remove_on_disconnect(&self, id: &str) -> Result<(), StoreError>;

    /// `on_update` receives the full collection on every change.
    fn subscribe_players(
        &self,
        on_update: Callback<PlayersSnapshot>,
    ) -> Result<Subscription, StoreError>;

    /// Stores `record` under `key` only if it strictly beats the stored score.
    fn submit_score(&self, key: &str, record: LeaderboardRecord) -> Result<(), StoreError>;

    /// Top `limit` entries, highest score first.
    fn subscribe_leaderboard(
        &self,
        limit: usize,
        on_update: Callback<Vec<LeaderboardEntry>>,
    ) -> Result<Subscription, StoreError>;

    fn report_kill(&self, killer: &str, victim: &str) -> Result<(), StoreError>;

    /// `limit` most recent kills, newest first.
    fn subscribe_kill_feed(
        &self,
        limit: usize,
        on_update: Callback<Vec<KillFeedRecord>>,
    ) -> Result<Subscription, StoreError>;

    fn status(&self) -> LinkStatus {
        LinkStatus::Online
    }
}

/// Cancellation handle for a store subscription. Dropping it cancels.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn cancel(mut self) {
        self.fire();
    }

    fn fire(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.fire();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

pub(crate) struct Listener<T> {
    pub(crate) limit: usize,
    pub(crate) callback: Arc<dyn Fn(T) + Send + Sync>,
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Self {
            limit: self.limit,
            callback: Arc::clone(&self.callback),
        }
    }
}

/// Registered callbacks for one topic, keyed by subscription id.
pub(crate) struct Listeners<T> {
    next_id: u64,
    entries: BTreeMap<u64, Listener<T>>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            entries: BTreeMap::new(),
        }
    }
}

impl<T> Listeners<T> {
    pub(crate) fn add(&mut self, limit: usize, callback: Callback<T>) -> (u64, Listener<T>) {
        let id = self.next_id;
        self.next_id += 1;
        let listener = Listener {
            limit,
            callback: Arc::from(callback),
        };
        self.entries.insert(id, listener.clone());
        (id, listener)
    }

    pub(crate) fn remove(&mut self, id: u64) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn max_limit(&self) -> usize {
        self.entries.values().map(|l| l.limit).max().unwrap_or(0)
    }

    /// Cloned out so callbacks can run after the owning lock is released.
    pub(crate) fn snapshot(&self) -> Vec<Listener<T>> {
        self.entries.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn subscription_cancels_once_on_drop() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let sub = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(sub);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let counter = Arc::clone(&hits);
        let sub = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        sub.cancel();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn listeners_track_largest_limit() {
        let mut listeners: Listeners<u32> = Listeners::default();
        let (a, _) = listeners.add(5, Box::new(|_| {}));
        let (_b, _) = listeners.add(10, Box::new(|_| {}));
        assert_eq!(listeners.max_limit(), 10);
        assert!(listeners.remove(a));
        assert!(!listeners.remove(a));
        assert_eq!(listeners.snapshot().len(), 1);
    }
}
