use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[serde(rename = "singleplayer")]
    Solo,
    Multiplayer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Dead,
}

/// Round statistics of the local player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameState {
    pub is_playing: bool,
    pub is_dead: bool,
    pub score: u32,
    pub kills: u32,
    pub max_length: usize,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            is_playing: false,
            is_dead: false,
            score: 0,
            kills: 0,
            max_length: crate::config::START_LENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeathCause {
    Wall,
    SelfHit,
    Enemy(String),
}

impl DeathCause {
    pub fn enemy(name: &str) -> Self {
        let name = name.trim();
        if name.is_empty() {
            Self::Enemy("ENEMY".to_owned())
        } else {
            Self::Enemy(name.to_owned())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Wall => "WALL",
            Self::SelfHit => "SELF",
            Self::Enemy(name) => name,
        }
    }
}

impl fmt::Display for DeathCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running, nothing moved.
    Idle,
    Moved,
    Ate,
    Died(DeathCause),
}
