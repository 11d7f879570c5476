use serde::{Deserialize, Serialize};

use crate::config::{KILL_FEED_LEN, MAX_LEADERBOARD_ENTRIES};
use crate::net::messages::{KillFeedRecord, LeaderboardEntry};

/// Hard cap on `?limit=`, whatever the caller asks for.
pub const MAX_QUERY_LIMIT: usize = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    pub fn resolve(&self, default: usize) -> usize {
        self.limit.unwrap_or(default).min(MAX_QUERY_LIMIT)
    }

    pub fn leaderboard(&self) -> usize {
        self.resolve(MAX_LEADERBOARD_ENTRIES)
    }

    pub fn kills(&self) -> usize {
        self.resolve(KILL_FEED_LEN)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillFeedResponse {
    pub kills: Vec<KillFeedRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayersResponse {
    pub online: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub server_time: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_default_and_clamp() {
        let q = LimitQuery::default();
        assert_eq!(q.leaderboard(), MAX_LEADERBOARD_ENTRIES);
        assert_eq!(q.kills(), KILL_FEED_LEN);
        let q = LimitQuery { limit: Some(5_000) };
        assert_eq!(q.leaderboard(), MAX_QUERY_LIMIT);
    }
}
