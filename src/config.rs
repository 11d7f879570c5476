use std::env;
use std::path::PathBuf;

// Grid
pub const TILE_COUNT: i32 = 30;
// Smallest grid that still fits a spawn margin on both sides plus the start body.
pub const MIN_TILE_COUNT: i32 = SPAWN_MARGIN * 2 + START_LENGTH as i32;
pub const GRID_SIZE_PX: f32 = 20.0;

// Timers (ms)
pub const TICK_MS: u64 = 120;
pub const SYNC_INTERVAL_MS: u64 = 150;
pub const GHOST_SWEEP_MS: u64 = 2_000;
pub const GHOST_TIMEOUT_MS: u64 = 10_000;

// Snake
pub const START_LENGTH: usize = 3;
pub const SPAWN_MARGIN: i32 = 5;
pub const FOOD_SPAWN_ATTEMPTS: usize = 100;

// Scoring
pub const FOOD_SCORE: u32 = 10;
pub const KILL_BONUS: u32 = 50;

// Leaderboards / feed
pub const MAX_LEADERBOARD_ENTRIES: usize = 10;
pub const MAX_LIVE_LEADERBOARD: usize = 5;
pub const KILL_FEED_LEN: usize = 5;
// Server-side retention, the feed view only ever shows the tail.
pub const KILL_FEED_RETAIN: usize = 100;

// Input
pub const SWIPE_THRESHOLD_PX: f32 = 30.0;

// Colors
pub const COLOR_BG: &str = "#0a0a12";
pub const COLOR_GRID: &str = "#111122";
pub const COLOR_SELF: &str = "#39ff14";
pub const COLOR_ENEMY: &str = "#00ffff";
pub const COLOR_FOOD: &str = "#ff0055";

// Network defaults
pub const DEFAULT_WS_ADDR: &str = "0.0.0.0:9001";
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:9100";
pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:9001";
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:9100";

/// What happens when the head leaves the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgePolicy {
    /// Reappear on the opposite edge.
    #[default]
    Wrap,
    /// Leaving the grid is fatal (`WALL`).
    Wall,
}

impl EdgePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "wrap" => Some(Self::Wrap),
            "wall" => Some(Self::Wall),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub tile_count: i32,
    pub tick_ms: u64,
    pub sync_interval_ms: u64,
    pub ghost_sweep_ms: u64,
    pub ghost_timeout_ms: u64,
    pub edge_policy: EdgePolicy,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tile_count: TILE_COUNT,
            tick_ms: TICK_MS,
            sync_interval_ms: SYNC_INTERVAL_MS,
            ghost_sweep_ms: GHOST_SWEEP_MS,
            ghost_timeout_ms: GHOST_TIMEOUT_MS,
            edge_policy: EdgePolicy::Wrap,
        }
    }
}

impl GameConfig {
    pub fn from_env() -> Self {
        let mut tile_count = read_env_i32("SNAKE_TILE_COUNT", TILE_COUNT);
        if tile_count < MIN_TILE_COUNT {
            tracing::warn!(
                "SNAKE_TILE_COUNT ({}) below minimum {}. Falling back to default.",
                tile_count,
                MIN_TILE_COUNT
            );
            tile_count = TILE_COUNT;
        }

        let edge_policy = match env::var("SNAKE_EDGE") {
            Ok(raw) => EdgePolicy::parse(&raw).unwrap_or_else(|| {
                tracing::warn!("SNAKE_EDGE={:?} is not wrap|wall. Using wrap.", raw);
                EdgePolicy::Wrap
            }),
            Err(_) => EdgePolicy::Wrap,
        };

        Self {
            tile_count,
            tick_ms: read_env_u64("SNAKE_TICK_MS", TICK_MS).max(1),
            sync_interval_ms: read_env_nonzero_u64("SNAKE_SYNC_MS", SYNC_INTERVAL_MS),
            ghost_sweep_ms: GHOST_SWEEP_MS,
            ghost_timeout_ms: read_env_nonzero_u64("SNAKE_GHOST_TIMEOUT_MS", GHOST_TIMEOUT_MS),
            edge_policy,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub ws_addr: String,
    pub http_addr: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            ws_addr: env::var("SNAKE_WS_ADDR").unwrap_or_else(|_| DEFAULT_WS_ADDR.to_owned()),
            http_addr: env::var("SNAKE_HTTP_ADDR")
                .unwrap_or_else(|_| DEFAULT_HTTP_ADDR.to_owned()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub relay_url: String,
    pub api_url: String,
    pub data_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_owned(),
            api_url: DEFAULT_API_URL.to_owned(),
            data_dir: Some(PathBuf::from(".")),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            relay_url: env::var("SNAKE_RELAY_URL").unwrap_or(defaults.relay_url),
            api_url: env::var("SNAKE_API_URL").unwrap_or(defaults.api_url),
            data_dir: env::var_os("SNAKE_DATA_DIR")
                .map(PathBuf::from)
                .or(defaults.data_dir),
        }
    }
}

pub(crate) fn read_env_u64(name: &str, default: u64) -> u64 {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("{}={:?} is not a valid integer. Using {}.", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

/// Like [`read_env_u64`], but 0 is rejected. Zero periods panic `tokio::time::interval`.
pub(crate) fn read_env_nonzero_u64(name: &str, default: u64) -> u64 {
    match read_env_u64(name, default) {
        0 => {
            tracing::warn!("{} must be above 0. Using {}.", name, default);
            default
        }
        value => value,
    }
}

pub(crate) fn read_env_i32(name: &str, default: i32) -> i32 {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("{}={:?} is not a valid integer. Using {}.", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_periods_fall_back_to_defaults() {
        env::set_var("SNAKE_SYNC_MS", "0");
        env::set_var("SNAKE_GHOST_TIMEOUT_MS", "0");
        let config = GameConfig::from_env();
        env::remove_var("SNAKE_SYNC_MS");
        env::remove_var("SNAKE_GHOST_TIMEOUT_MS");
        assert_eq!(config.sync_interval_ms, SYNC_INTERVAL_MS);
        assert_eq!(config.ghost_timeout_ms, GHOST_TIMEOUT_MS);
    }

    #[test]
    fn nonzero_override_is_kept() {
        env::set_var("CYBERSNAKE_TEST_PERIOD", "75");
        assert_eq!(read_env_nonzero_u64("CYBERSNAKE_TEST_PERIOD", 150), 75);
        env::set_var("CYBERSNAKE_TEST_PERIOD", "0");
        assert_eq!(read_env_nonzero_u64("CYBERSNAKE_TEST_PERIOD", 150), 150);
        env::remove_var("CYBERSNAKE_TEST_PERIOD");
    }

    #[test]
    fn edge_policy_parses_case_insensitively() {
        assert_eq!(EdgePolicy::parse("WALL"), Some(EdgePolicy::Wall));
        assert_eq!(EdgePolicy::parse(" wrap "), Some(EdgePolicy::Wrap));
        assert_eq!(EdgePolicy::parse("bounce"), None);
    }

    #[test]
    fn minimum_grid_fits_spawn_margin() {
        assert_eq!(MIN_TILE_COUNT, 13);
        assert!(TILE_COUNT >= MIN_TILE_COUNT);
    }
}
