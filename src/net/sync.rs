use std::collections::BTreeMap;

use crate::game::collision::EnemyBody;
use crate::game::grid::Position;
use crate::net::messages::PlayersSnapshot;

/// Gate for outbound publishes: at most one per interval, skipped rather than queued.
#[derive(Debug, Clone, Copy)]
pub struct PublishThrottle {
    interval_ms: u64,
    last: Option<u64>,
}

impl PublishThrottle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last: None,
        }
    }

    pub fn try_acquire(&mut self, now_ms: u64) -> bool {
        match self.last {
            Some(last) if now_ms.saturating_sub(last) < self.interval_ms => false,
            _ => {
                self.last = Some(now_ms);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Read-only mirror of a peer, as last received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePlayer {
    pub name: String,
    pub snake: Vec<Position>,
    pub score: u32,
    pub color: String,
    /// Local clock, never sent.
    pub last_seen: u64,
}

/// Peers that left the snapshot between two merges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departed {
    pub id: String,
    pub player: RemotePlayer,
}

#[derive(Debug, Default)]
pub struct RemotePlayers {
    players: BTreeMap<String, RemotePlayer>,
}

impl RemotePlayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cache with `snapshot`, minus the local identity and nameless records.
    ///
    /// Returns the peers that were cached before and are absent now.
    pub fn merge(&mut self, snapshot: PlayersSnapshot, self_id: &str, now_ms: u64) -> Vec<Departed> {
        let mut next = BTreeMap::new();
        for (id, record) in snapshot {
            if id == self_id {
                continue;
            }
            if record.name.trim().is_empty() {
                tracing::debug!(peer = %id, "skipping nameless player record");
                continue;
            }
            next.insert(
                id,
                RemotePlayer {
                    name: record.name,
                    snake: record.snake,
                    score: record.score,
                    color: record.color,
                    last_seen: now_ms,
                },
            );
        }

        let previous = std::mem::replace(&mut self.players, next);
        previous
            .into_iter()
            .filter(|(id, _)| !self.players.contains_key(id))
            .map(|(id, player)| Departed { id, player })
            .collect()
    }

    /// Drops peers not seen within `timeout_ms`. Returns how many were evicted.
    pub fn evict_stale(&mut self, now_ms: u64, timeout_ms: u64) -> usize {
        let before = self.players.len();
        self.players
            .retain(|_, p| now_ms.saturating_sub(p.last_seen) <= timeout_ms);
        let evicted = before - self.players.len();
        if evicted > 0 {
            tracing::debug!(evicted, "evicted stale peers");
        }
        evicted
    }

    pub fn clear(&mut self) {
        self.players.clear();
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&RemotePlayer> {
        self.players.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RemotePlayer)> {
        self.players.iter().map(|(id, p)| (id.as_str(), p))
    }

    /// Borrowed bodies for collision and food placement. Bodiless peers are skipped.
    pub fn enemy_bodies(&self) -> Vec<EnemyBody<'_>> {
        self.players
            .values()
            .filter(|p| !p.snake.is_empty())
            .map(|p| EnemyBody {
                name: &p.name,
                segments: &p.snake,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::messages::PlayerRecord;

    fn record(name: &str, cells: &[(i32, i32)]) -> PlayerRecord {
        PlayerRecord {
            name: name.to_owned(),
            snake: cells.iter().map(|&(x, y)| Position::new(x, y)).collect(),
            score: 20,
            color: "#00ffff".to_owned(),
            updated_at: None,
        }
    }

    #[test]
    fn throttle_skips_inside_the_interval() {
        let mut throttle = PublishThrottle::new(150);
        assert!(throttle.try_acquire(1_000));
        assert!(!throttle.try_acquire(1_100));
        assert!(!throttle.try_acquire(1_149));
        assert!(throttle.try_acquire(1_150));
        throttle.reset();
        assert!(throttle.try_acquire(1_151));
    }

    #[test]
    fn merge_excludes_self_and_nameless() {
        let mut snapshot = PlayersSnapshot::new();
        snapshot.insert("me".to_owned(), record("ME", &[(1, 1)]));
        snapshot.insert("a".to_owned(), record("A", &[(2, 2)]));
        snapshot.insert("bad".to_owned(), record(" ", &[(3, 3)]));
        snapshot.insert("ghost".to_owned(), record("GHOST", &[]));

        let mut remote = RemotePlayers::new();
        assert!(remote.merge(snapshot, "me", 10).is_empty());
        assert_eq!(remote.len(), 2);
        assert!(remote.get("me").is_none());
        assert!(remote.get("bad").is_none());
        assert_eq!(remote.get("a").map(|p| p.last_seen), Some(10));

        let bodies = remote.enemy_bodies();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].name, "A");
    }

    #[test]
    fn merge_reports_departures() {
        let mut remote = RemotePlayers::new();
        let mut first = PlayersSnapshot::new();
        first.insert("a".to_owned(), record("A", &[(2, 2)]));
        first.insert("b".to_owned(), record("B", &[(4, 4)]));
        remote.merge(first, "me", 0);

        let mut second = PlayersSnapshot::new();
        second.insert("b".to_owned(), record("B", &[(4, 3)]));
        let departed = remote.merge(second, "me", 150);
        assert_eq!(departed.len(), 1);
        assert_eq!(departed[0].id, "a");
        assert_eq!(remote.get("b").map(|p| p.snake[0]), Some(Position::new(4, 3)));
    }

    #[test]
    fn sweep_evicts_only_stale_peers() {
        let mut remote = RemotePlayers::new();
        let mut snapshot = PlayersSnapshot::new();
        snapshot.insert("a".to_owned(), record("A", &[(2, 2)]));
        remote.merge(snapshot, "me", 0);

        assert_eq!(remote.evict_stale(10_000, 10_000), 0);
        assert_eq!(remote.evict_stale(10_001, 10_000), 1);
        assert!(remote.is_empty());
    }
}
