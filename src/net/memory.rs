use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::net::messages::{
    KillFeedRecord, LeaderboardEntry, LeaderboardRecord, PlayerRecord, PlayersSnapshot, Topic,
};
use crate::net::store::{Callback, LinkStatus, Listeners, SharedStore, StoreError, Subscription};
use crate::state::tables::Tables;

/// Milliseconds since the Unix epoch, as stamped by the backend.
pub fn server_time_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

type Delivery = Box<dyn FnOnce() + Send>;

/// In-process backend. Every writer gets its own [`MemoryConnection`] so
/// disconnect hooks can be scoped per connection.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Backend>>,
}

#[derive(Default)]
struct Backend {
    tables: Tables,
    offline: bool,
    next_conn: u64,
    players: Listeners<PlayersSnapshot>,
    leaderboard: Listeners<Vec<LeaderboardEntry>>,
    kills: Listeners<Vec<KillFeedRecord>>,
    disconnect_hooks: HashMap<u64, BTreeSet<String>>,
}

impl Backend {
    fn players_deliveries(&self) -> Vec<Delivery> {
        let snapshot = self.tables.players().clone();
        self.players
            .snapshot()
            .into_iter()
            .map(|listener| {
                let snapshot = snapshot.clone();
                Box::new(move || (listener.callback)(snapshot)) as Delivery
            })
            .collect()
    }

    fn leaderboard_deliveries(&self) -> Vec<Delivery> {
        self.leaderboard
            .snapshot()
            .into_iter()
            .map(|listener| {
                let entries = self.tables.top_scores(listener.limit);
                Box::new(move || (listener.callback)(entries)) as Delivery
            })
            .collect()
    }

    fn kill_deliveries(&self) -> Vec<Delivery> {
        self.kills
            .snapshot()
            .into_iter()
            .map(|listener| {
                let kills = self.tables.recent_kills(listener.limit);
                Box::new(move || (listener.callback)(kills)) as Delivery
            })
            .collect()
    }

    fn unsubscribe(&mut self, topic: Topic, id: u64) {
        match topic {
            Topic::Players => self.players.remove(id),
            Topic::Leaderboard => self.leaderboard.remove(id),
            Topic::KillFeed => self.kills.remove(id),
        };
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self) -> MemoryConnection {
        let id = {
            let mut backend = self.lock();
            backend.next_conn += 1;
            backend.next_conn
        };
        tracing::debug!(conn = id, "store connection opened");
        MemoryConnection {
            id,
            store: self.clone(),
            closed: AtomicBool::new(false),
        }
    }

    /// Simulates losing the backend; writes fail with [`StoreError::Offline`].
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub fn is_offline(&self) -> bool {
        self.lock().offline
    }

    pub fn players(&self) -> PlayersSnapshot {
        self.lock().tables.players().clone()
    }

    pub fn player_count(&self) -> usize {
        self.lock().tables.players().len()
    }

    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        self.lock().tables.top_scores(limit)
    }

    pub fn leaderboard_record(&self, key: &str) -> Option<LeaderboardRecord> {
        self.lock().tables.leaderboard_record(key).cloned()
    }

    pub fn kill_feed(&self, limit: usize) -> Vec<KillFeedRecord> {
        self.lock().tables.recent_kills(limit)
    }

    fn lock(&self) -> MutexGuard<'_, Backend> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` under the lock, then delivers notifications with the lock released.
    fn update<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Backend) -> Vec<Delivery>,
    {
        let deliveries = {
            let mut backend = self.lock();
            if backend.offline {
                return Err(StoreError::Offline);
            }
            f(&mut backend)
        };
        for deliver in deliveries {
            deliver();
        }
        Ok(())
    }

    fn subscribe<F>(&self, topic: Topic, register: F) -> Result<Subscription, StoreError>
    where
        F: FnOnce(&mut Backend) -> (u64, Delivery),
    {
        let (id, initial) = {
            let mut backend = self.lock();
            if backend.offline {
                return Err(StoreError::Offline);
            }
            register(&mut backend)
        };
        initial();

        let weak: Weak<Mutex<Backend>> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut backend = inner.lock().unwrap_or_else(PoisonError::into_inner);
                backend.unsubscribe(topic, id);
            }
        }))
    }
}

/// One writer's view of a [`MemoryStore`]. Closing it (or dropping it) fires
/// the disconnect hooks it registered.
pub struct MemoryConnection {
    id: u64,
    store: MemoryStore,
    closed: AtomicBool,
}

impl MemoryConnection {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let deliveries = {
            let mut backend = self.store.lock();
            let ids = backend.disconnect_hooks.remove(&self.id).unwrap_or_default();
            let mut removed = false;
            for id in &ids {
                removed |= backend.tables.remove_player(id);
            }
            if removed {
                backend.players_deliveries()
            } else {
                Vec::new()
            }
        };
        tracing::debug!(conn = self.id, "store connection closed");
        for deliver in deliveries {
            deliver();
        }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.close();
    }
}

impl SharedStore for MemoryConnection {
    fn upsert_player(&self, id: &str, record: PlayerRecord) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.store.update(|backend| {
            backend.tables.upsert_player(id, record, server_time_ms());
            backend.players_deliveries()
        })
    }

    fn remove_player(&self, id: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.store.update(|backend| {
            if backend.tables.remove_player(id) {
                backend.players_deliveries()
            } else {
                Vec::new()
            }
        })
    }

    fn remove_on_disconnect(&self, id: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        let conn = self.id;
        self.store.update(|backend| {
            backend
                .disconnect_hooks
                .entry(conn)
                .or_default()
                .insert(id.to_owned());
            Vec::new()
        })
    }

    fn subscribe_players(
        &self,
        on_update: Callback<PlayersSnapshot>,
    ) -> Result<Subscription, StoreError> {
        self.ensure_open()?;
        self.store.subscribe(Topic::Players, |backend| {
            let (id, listener) = backend.players.add(0, on_update);
            let snapshot = backend.tables.players().clone();
            (id, Box::new(move || (listener.callback)(snapshot)) as Delivery)
        })
    }

    fn submit_score(&self, key: &str, record: LeaderboardRecord) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.store.update(|backend| {
            if backend.tables.submit_score(key, record) {
                tracing::info!(key, "leaderboard entry improved");
                backend.leaderboard_deliveries()
            } else {
                Vec::new()
            }
        })
    }

    fn subscribe_leaderboard(
        &self,
        limit: usize,
        on_update: Callback<Vec<LeaderboardEntry>>,
    ) -> Result<Subscription, StoreError> {
        self.ensure_open()?;
        self.store.subscribe(Topic::Leaderboard, |backend| {
            let (id, listener) = backend.leaderboard.add(limit, on_update);
            let entries = backend.tables.top_scores(limit);
            (id, Box::new(move || (listener.callback)(entries)) as Delivery)
        })
    }

    fn report_kill(&self, killer: &str, victim: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.store.update(|backend| {
            backend.tables.push_kill(killer, victim, server_time_ms());
            backend.kill_deliveries()
        })
    }

    fn subscribe_kill_feed(
        &self,
        limit: usize,
        on_update: Callback<Vec<KillFeedRecord>>,
    ) -> Result<Subscription, StoreError> {
        self.ensure_open()?;
        self.store.subscribe(Topic::KillFeed, |backend| {
            let (id, listener) = backend.kills.add(limit, on_update);
            let kills = backend.tables.recent_kills(limit);
            (id, Box::new(move || (listener.callback)(kills)) as Delivery)
        })
    }

    fn status(&self) -> LinkStatus {
        if self.closed.load(Ordering::SeqCst) || self.store.is_offline() {
            LinkStatus::Offline
        } else {
            LinkStatus::Online
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn player(name: &str) -> PlayerRecord {
        PlayerRecord {
            name: name.to_owned(),
            ..PlayerRecord::default()
        }
    }

    #[test]
    fn subscriber_gets_current_snapshot_then_updates() {
        let store = MemoryStore::new();
        let conn = store.connect();
        conn.upsert_player("a", player("A")).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = conn
            .subscribe_players(Box::new(move |snap: PlayersSnapshot| {
                sink.lock().unwrap().push(snap.len());
            }))
            .unwrap();
        conn.upsert_player("b", player("B")).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn dropping_subscription_stops_delivery() {
        let store = MemoryStore::new();
        let conn = store.connect();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let sub = conn
            .subscribe_kill_feed(
                5,
                Box::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        conn.report_kill("a", "b").unwrap();
        drop(sub);
        conn.report_kill("c", "d").unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(store.kill_feed(5).len(), 2);
    }

    #[test]
    fn disconnect_hook_removes_only_registered_records() {
        let store = MemoryStore::new();
        let watcher = store.connect();
        let leaving = store.connect();
        leaving.upsert_player("gone", player("GONE")).unwrap();
        leaving.remove_on_disconnect("gone").unwrap();
        watcher.upsert_player("stay", player("STAY")).unwrap();

        drop(leaving);
        let players = store.players();
        assert!(players.contains_key("stay"));
        assert!(!players.contains_key("gone"));
    }

    #[test]
    fn leaderboard_listener_honours_its_limit() {
        let store = MemoryStore::new();
        let conn = store.connect();
        for (key, score) in [("a", 10), ("b", 30), ("c", 20)] {
            let record = LeaderboardRecord {
                name: key.to_owned(),
                score,
                ..LeaderboardRecord::default()
            };
            conn.submit_score(key, record).unwrap();
        }
        let latest = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&latest);
        let _sub = conn
            .subscribe_leaderboard(
                2,
                Box::new(move |entries: Vec<LeaderboardEntry>| {
                    *sink.lock().unwrap() = entries.iter().map(|e| e.score).collect();
                }),
            )
            .unwrap();
        assert_eq!(*latest.lock().unwrap(), vec![30, 20]);
    }

    #[test]
    fn offline_backend_rejects_writes() {
        let store = MemoryStore::new();
        let conn = store.connect();
        store.set_offline(true);
        assert!(matches!(
            conn.upsert_player("a", player("A")),
            Err(StoreError::Offline)
        ));
        assert_eq!(conn.status(), LinkStatus::Offline);
        conn.close();
        store.set_offline(false);
        assert!(matches!(conn.remove_player("a"), Err(StoreError::Closed)));
    }
}
