use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::START_LENGTH;
use crate::game::types::{GameMode, GameState};

const USERNAME_FILE: &str = "cybersnake-username";
const PERSONAL_BEST_FILE: &str = "cybersnake-personal-best";

#[derive(Debug, thiserror::Error)]
enum ProfileError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub high_score: u32,
    pub max_length: usize,
    pub total_games: u32,
    pub kills: u32,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            high_score: 0,
            max_length: START_LENGTH,
            total_games: 0,
            kills: 0,
        }
    }
}

impl PlayerStats {
    /// Folds one finished round into the running bests.
    pub fn record_round(&mut self, round: &GameState) {
        self.total_games += 1;
        self.high_score = self.high_score.max(round.score);
        self.kills += round.kills;
        self.max_length = self.max_length.max(round.max_length);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalBest {
    #[serde(default)]
    pub singleplayer: PlayerStats,
    #[serde(default)]
    pub multiplayer: PlayerStats,
}

impl PersonalBest {
    pub fn for_mode(&self, mode: GameMode) -> &PlayerStats {
        match mode {
            GameMode::Solo => &self.singleplayer,
            GameMode::Multiplayer => &self.multiplayer,
        }
    }

    pub fn for_mode_mut(&mut self, mode: GameMode) -> &mut PlayerStats {
        match mode {
            GameMode::Solo => &mut self.singleplayer,
            GameMode::Multiplayer => &mut self.multiplayer,
        }
    }
}

/// Two small files in a data directory. With no directory configured, nothing is
/// persisted and loads return defaults.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    dir: Option<PathBuf>,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    pub fn ephemeral() -> Self {
        Self { dir: None }
    }

    pub fn from_dir(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn load_username(&self) -> Option<String> {
        let dir = self.dir.as_deref()?;
        match fs::read_to_string(dir.join(USERNAME_FILE)) {
            Ok(name) => {
                let name = name.trim().to_owned();
                (!name.is_empty()).then_some(name)
            }
            Err(err) => {
                tracing::debug!(%err, "no saved username");
                None
            }
        }
    }

    pub fn save_username(&self, name: &str) {
        if let Some(dir) = self.dir.as_deref() {
            if let Err(err) = write_file(dir, USERNAME_FILE, name.as_bytes()) {
                tracing::debug!(%err, "failed to save username");
            }
        }
    }

    pub fn load_personal_best(&self) -> PersonalBest {
        let Some(dir) = self.dir.as_deref() else {
            return PersonalBest::default();
        };
        match read_json(&dir.join(PERSONAL_BEST_FILE)) {
            Ok(best) => best,
            Err(err) => {
                tracing::debug!(%err, "failed to load personal best");
                PersonalBest::default()
            }
        }
    }

    pub fn save_personal_best(&self, best: &PersonalBest) {
        let Some(dir) = self.dir.as_deref() else {
            return;
        };
        let result = serde_json::to_vec(best)
            .map_err(ProfileError::from)
            .and_then(|bytes| write_file(dir, PERSONAL_BEST_FILE, &bytes));
        if let Err(err) = result {
            tracing::debug!(%err, "failed to save personal best");
        }
    }
}

fn read_json(path: &Path) -> Result<PersonalBest, ProfileError> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<(), ProfileError> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(name), bytes)?;
    Ok(())
}
