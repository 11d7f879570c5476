use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::grid::Position;

pub const PROTOCOL_VERSION: u8 = 1;

/// Live player record, keyed by session identity.
///
/// Every field defaults so one malformed record never poisons a whole snapshot;
/// consumers decide what to skip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub snake: Vec<Position>,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub color: String,
    /// Stamped by the store on write, ignored on upsert.
    #[serde(default)]
    pub updated_at: Option<u64>,
}

/// Best-ever result stored under an identity key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRecord {
    pub name: String,
    pub score: u32,
    #[serde(default)]
    pub kills: u32,
    #[serde(default)]
    pub max_length: usize,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: String,
    pub name: String,
    pub score: u32,
    pub kills: u32,
    pub max_length: usize,
    pub date: String,
}

impl LeaderboardEntry {
    pub fn from_record(id: &str, record: &LeaderboardRecord) -> Self {
        Self {
            id: id.to_owned(),
            name: record.name.clone(),
            score: record.score,
            kills: record.kills,
            max_length: record.max_length,
            date: record.date.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillFeedRecord {
    pub killer: String,
    pub victim: String,
    /// Server clock, ms since the Unix epoch.
    pub timestamp: u64,
}

pub type PlayersSnapshot = BTreeMap<String, PlayerRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Players,
    Leaderboard,
    KillFeed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientEnvelope {
    pub v: u8,
    pub msg: ClientMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEnvelope {
    pub v: u8,
    pub msg: ServerMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientMessage {
    UpsertPlayer { id: String, record: PlayerRecord },
    RemovePlayer { id: String },
    RemoveOnDisconnect { id: String },
    SubmitScore { key: String, record: LeaderboardRecord },
    ReportKill { killer: String, victim: String },
    Subscribe { topic: Topic, limit: u32 },
    Unsubscribe { topic: Topic },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerMessage {
    Players { players: PlayersSnapshot },
    Leaderboard { entries: Vec<LeaderboardEntry> },
    KillFeed { kills: Vec<KillFeedRecord> },
    Error { message: String },
}
