use std::collections::{BTreeMap, VecDeque};

use crate::config::KILL_FEED_RETAIN;
use crate::net::messages::{
    KillFeedRecord, LeaderboardEntry, LeaderboardRecord, PlayerRecord, PlayersSnapshot,
};

/// Leaderboard identity: lowercase, each whitespace run collapsed to `_`.
pub fn identity_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut in_space = false;
    for ch in name.chars() {
        if ch.is_whitespace() {
            if !in_space {
                key.push('_');
            }
            in_space = true;
        } else {
            key.extend(ch.to_lowercase());
            in_space = false;
        }
    }
    key
}

/// Applies a score submission. Returns whether the stored entry changed.
///
/// A missing entry counts as score 0, so zero-score rounds never create rows.
pub fn apply_submission(
    board: &mut BTreeMap<String, LeaderboardRecord>,
    key: &str,
    record: LeaderboardRecord,
) -> bool {
    let stored = board.get(key).map(|r| r.score).unwrap_or(0);
    if record.score <= stored {
        return false;
    }
    board.insert(key.to_owned(), record);
    true
}

pub fn top_entries(board: &BTreeMap<String, LeaderboardRecord>, limit: usize) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = board
        .iter()
        .map(|(id, record)| LeaderboardEntry::from_record(id, record))
        .collect();
    entries.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    entries.truncate(limit);
    entries
}

/// The backend's collections: live players, best scores, kill feed.
#[derive(Debug, Default)]
pub struct Tables {
    players: PlayersSnapshot,
    leaderboard: BTreeMap<String, LeaderboardRecord>,
    kills: VecDeque<KillFeedRecord>,
}

impl Tables {
    pub fn upsert_player(&mut self, id: &str, mut record: PlayerRecord, now_ms: u64) {
        record.updated_at = Some(now_ms);
        self.players.insert(id.to_owned(), record);
    }

    pub fn remove_player(&mut self, id: &str) -> bool {
        self.players.remove(id).is_some()
    }

    pub fn players(&self) -> &PlayersSnapshot {
        &self.players
    }

    pub fn submit_score(&mut self, key: &str, record: LeaderboardRecord) -> bool {
        apply_submission(&mut self.leaderboard, key, record)
    }

    pub fn leaderboard_record(&self, key: &str) -> Option<&LeaderboardRecord> {
        self.leaderboard.get(key)
    }

    pub fn top_scores(&self, limit: usize) -> Vec<LeaderboardEntry> {
        top_entries(&self.leaderboard, limit)
    }

    /// Appends with a server timestamp that never runs backwards.
    pub fn push_kill(&mut self, killer: &str, victim: &str, now_ms: u64) {
        let last = self.kills.back().map(|k| k.timestamp).unwrap_or(0);
        self.kills.push_back(KillFeedRecord {
            killer: killer.to_owned(),
            victim: victim.to_owned(),
            timestamp: now_ms.max(last),
        });
        while self.kills.len() > KILL_FEED_RETAIN {
            self.kills.pop_front();
        }
    }

    pub fn recent_kills(&self, limit: usize) -> Vec<KillFeedRecord> {
        self.kills.iter().rev().take(limit).cloned().collect()
    }
}
