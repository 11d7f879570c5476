use std::sync::Arc;

use rand::Rng;
use tokio::sync::mpsc;

use crate::client::profile::{PersonalBest, ProfileStore};
use crate::config::{GameConfig, COLOR_SELF, KILL_FEED_LEN, MAX_LEADERBOARD_ENTRIES, MAX_LIVE_LEADERBOARD};
use crate::game::collision::ran_into;
use crate::game::grid::{Direction, Position};
use crate::game::sim::Simulation;
use crate::game::snake::Snake;
use crate::game::types::{DeathCause, GameMode, GameState, RunState, TickOutcome};
use crate::net::messages::{
    KillFeedRecord, LeaderboardEntry, LeaderboardRecord, PlayerRecord, PlayersSnapshot,
};
use crate::net::store::{LinkStatus, SharedStore, Subscription};
use crate::net::sync::{PublishThrottle, RemotePlayers};
use crate::state::tables::identity_key;

const STATUS_CONNECTING: &str = "CONNECTING TO NET...";
const STATUS_OFFLINE: &str = "OFFLINE MODE";

/// Store notifications, queued by callbacks and applied by [`GameSession::pump`].
#[derive(Debug)]
enum StoreEvent {
    Players(PlayersSnapshot),
    Leaderboard(Vec<LeaderboardEntry>),
    KillFeed(Vec<KillFeedRecord>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveEntry {
    pub name: String,
    pub score: u32,
    pub is_self: bool,
}

/// Owns everything one player's client knows: the local simulation, the mirror of
/// remote peers, and the store link. All mutation goes through `&mut self`.
pub struct GameSession {
    config: GameConfig,
    store: Option<Arc<dyn SharedStore>>,
    profile: ProfileStore,

    player_id: String,
    player_name: String,
    mode: GameMode,

    sim: Simulation,
    remote: RemotePlayers,
    throttle: PublishThrottle,

    events_tx: mpsc::UnboundedSender<StoreEvent>,
    events_rx: mpsc::UnboundedReceiver<StoreEvent>,
    round_subs: Vec<Subscription>,
    leaderboard_sub: Option<Subscription>,
    networked: bool,

    leaderboard: Vec<LeaderboardEntry>,
    kill_feed: Vec<KillFeedRecord>,
    player_count: usize,
    link: LinkStatus,
    status: String,
    killer: String,
    personal_best: PersonalBest,
    closed: bool,
}

impl GameSession {
    pub fn new(
        config: GameConfig,
        store: Option<Arc<dyn SharedStore>>,
        profile: ProfileStore,
    ) -> Self {
        let sim = Simulation::new(&config);
        Self::build(config, store, profile, sim)
    }

    /// Deterministic food and spawn placement for tests and replays.
    pub fn with_seed(
        config: GameConfig,
        store: Option<Arc<dyn SharedStore>>,
        profile: ProfileStore,
        seed: u64,
    ) -> Self {
        let sim = Simulation::with_seed(&config, seed);
        Self::build(config, store, profile, sim)
    }

    fn build(
        config: GameConfig,
        store: Option<Arc<dyn SharedStore>>,
        profile: ProfileStore,
        sim: Simulation,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let personal_best = profile.load_personal_best();
        let mut session = Self {
            throttle: PublishThrottle::new(config.sync_interval_ms),
            config,
            store,
            profile,
            player_id: uuid::Uuid::new_v4().simple().to_string(),
            player_name: String::new(),
            mode: GameMode::Multiplayer,
            sim,
            remote: RemotePlayers::new(),
            events_tx,
            events_rx,
            round_subs: Vec::new(),
            leaderboard_sub: None,
            networked: false,
            leaderboard: Vec::new(),
            kill_feed: Vec::new(),
            player_count: 1,
            link: LinkStatus::Offline,
            status: STATUS_OFFLINE.to_owned(),
            killer: DeathCause::Wall.label().to_owned(),
            personal_best,
            closed: false,
        };
        session.refresh_link();
        session.subscribe_leaderboard();
        session
    }

    /// Last name this profile played under, for prefilling the start screen.
    pub fn saved_name(&self) -> Option<String> {
        self.profile.load_username()
    }

    pub fn start_session(&mut self, name: &str, mode: GameMode) {
        if self.networked {
            self.leave_network();
        }
        self.closed = false;
        self.mode = mode;
        self.player_name = normalize_name(name, &mut rand::thread_rng());
        self.profile.save_username(&self.player_name);

        self.discard_round_events();
        self.subscribe_leaderboard();
        self.refresh_link();

        if mode == GameMode::Multiplayer && self.store_usable() {
            self.networked = self.join_network();
        }
        if !self.networked {
            self.remote.clear();
            self.kill_feed.clear();
            self.player_count = 1;
        }

        let bodies = self.remote.enemy_bodies();
        self.sim.reset(&bodies);
        self.throttle.reset();
        tracing::info!(
            name = %self.player_name,
            ?mode,
            networked = self.networked,
            "session started"
        );
    }

    /// Swaps in a prepared layout for the current round (replays and scripted scenarios).
    pub fn place_layout(&mut self, snake: Snake, direction: Direction, food: Position) {
        if self.closed {
            return;
        }
        self.sim.place(snake, direction, food);
    }

    pub fn set_direction(&mut self, dir: Direction) -> bool {
        self.sim.set_direction(dir)
    }

    /// Starts a new round after a death, keeping name, mode and subscriptions.
    pub fn respawn(&mut self) -> bool {
        if self.closed || self.sim.run_state() != RunState::Dead {
            return false;
        }
        let bodies = self.remote.enemy_bodies();
        self.sim.reset(&bodies);
        self.throttle.reset();
        tracing::info!(name = %self.player_name, "respawned");
        true
    }

    pub fn on_tick(&mut self, now_ms: u64) -> TickOutcome {
        if self.closed {
            return TickOutcome::Idle;
        }
        let outcome = {
            let bodies = self.remote.enemy_bodies();
            self.sim.tick(&bodies)
        };
        match &outcome {
            TickOutcome::Died(cause) => self.on_death(cause.clone()),
            TickOutcome::Moved | TickOutcome::Ate => {
                self.maybe_publish(now_ms);
            }
            TickOutcome::Idle => {}
        }
        outcome
    }

    pub fn on_sync(&mut self, now_ms: u64) -> bool {
        self.maybe_publish(now_ms)
    }

    /// Publishes the full local state unless the throttle window is still open.
    pub fn maybe_publish(&mut self, now_ms: u64) -> bool {
        if !self.networked || !self.sim.is_running() {
            return false;
        }
        if !self.throttle.try_acquire(now_ms) {
            return false;
        }
        let Some(store) = self.store.as_ref() else {
            return false;
        };
        let record = PlayerRecord {
            name: self.player_name.clone(),
            snake: self.sim.snake().to_vec(),
            score: self.sim.state().score,
            color: COLOR_SELF.to_owned(),
            updated_at: None,
        };
        if let Err(err) = store.upsert_player(&self.player_id, record) {
            tracing::warn!(%err, "dropped player publish");
        }
        true
    }

    /// Credits the local player with `victim`. Ignored unless a round is running.
    pub fn register_kill(&mut self, victim: &str) -> bool {
        if !self.sim.award_kill() {
            return false;
        }
        tracing::info!(killer = %self.player_name, victim, "kill registered");
        if self.networked {
            if let Some(store) = self.store.as_ref() {
                if let Err(err) = store.report_kill(&self.player_name, victim) {
                    tracing::warn!(%err, "dropped kill report");
                }
            }
        }
        true
    }

    /// Applies queued store notifications. Call from the thread that owns the session.
    pub fn pump(&mut self, now_ms: u64) {
        self.refresh_link();
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                StoreEvent::Players(snapshot) => self.apply_players(snapshot, now_ms),
                StoreEvent::Leaderboard(entries) => self.leaderboard = entries,
                StoreEvent::KillFeed(kills) => {
                    if self.networked {
                        self.kill_feed = kills;
                    }
                }
            }
        }
    }

    pub fn on_sweep(&mut self, now_ms: u64) -> usize {
        self.remote.evict_stale(now_ms, self.config.ghost_timeout_ms)
    }

    /// Local player (while alive) plus every cached peer, best score first.
    pub fn live_leaderboard(&self) -> Vec<LiveEntry> {
        let mut list = Vec::with_capacity(self.remote.len() + 1);
        if self.sim.is_running() {
            list.push(LiveEntry {
                name: self.player_name.clone(),
                score: self.sim.state().score,
                is_self: true,
            });
        }
        list.extend(self.remote.iter().map(|(_, p)| LiveEntry {
            name: p.name.clone(),
            score: p.score,
            is_self: false,
        }));
        list.sort_by(|a, b| b.score.cmp(&a.score));
        list.truncate(MAX_LIVE_LEADERBOARD);
        list
    }

    /// Removes the local record, cancels every subscription and stops the round.
    /// Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.closed {
            return;
        }
        if self.networked {
            self.leave_network();
        }
        self.leaderboard_sub = None;
        self.sim.stop();
        self.closed = true;
        tracing::info!(name = %self.player_name, "session closed");
    }

    fn on_death(&mut self, cause: DeathCause) {
        self.killer = cause.label().to_owned();
        let round = *self.sim.state();

        self.personal_best.for_mode_mut(self.mode).record_round(&round);
        self.profile.save_personal_best(&self.personal_best);

        tracing::info!(
            name = %self.player_name,
            killer = %self.killer,
            score = round.score,
            "player died"
        );

        if !self.networked {
            return;
        }
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let record = LeaderboardRecord {
            name: self.player_name.clone(),
            score: round.score,
            kills: round.kills,
            max_length: round.max_length,
            date: chrono::Utc::now().format("%Y-%m-%d").to_string(),
        };
        if let Err(err) = store.submit_score(&identity_key(&self.player_name), record) {
            tracing::warn!(%err, "dropped score submission");
        }
        if let Err(err) = store.remove_player(&self.player_id) {
            tracing::warn!(%err, "failed to remove player record");
        }
    }

    fn apply_players(&mut self, snapshot: PlayersSnapshot, now_ms: u64) {
        if !self.networked {
            return;
        }
        self.player_count = snapshot.len().max(1);
        let departed = self.remote.merge(snapshot, &self.player_id, now_ms);
        if departed.is_empty() || !self.sim.is_running() {
            return;
        }

        let tile_count = self.sim.tile_count();
        let edge_policy = self.sim.edge_policy();
        let victims: Vec<String> = departed
            .into_iter()
            .filter(|d| ran_into(&d.player.snake, self.sim.snake(), tile_count, edge_policy))
            .map(|d| d.player.name)
            .collect();
        for victim in victims {
            self.register_kill(&victim);
        }
    }

    fn join_network(&mut self) -> bool {
        let Some(store) = self.store.clone() else {
            return false;
        };
        if let Err(err) = store.remove_on_disconnect(&self.player_id) {
            tracing::warn!(%err, "disconnect cleanup not registered");
        }

        let tx = self.events_tx.clone();
        let players = store.subscribe_players(Box::new(move |snapshot| {
            let _ = tx.send(StoreEvent::Players(snapshot));
        }));
        let tx = self.events_tx.clone();
        let kills = store.subscribe_kill_feed(
            KILL_FEED_LEN,
            Box::new(move |kills| {
                let _ = tx.send(StoreEvent::KillFeed(kills));
            }),
        );

        match (players, kills) {
            (Ok(players), Ok(kills)) => {
                self.round_subs = vec![players, kills];
                true
            }
            (players, kills) => {
                let err = players.err().or(kills.err());
                tracing::warn!(?err, "subscribe failed, playing locally");
                self.status = STATUS_OFFLINE.to_owned();
                false
            }
        }
    }

    fn leave_network(&mut self) {
        if let Some(store) = self.store.as_ref() {
            if let Err(err) = store.remove_player(&self.player_id) {
                tracing::warn!(%err, "failed to remove player record");
            }
        }
        self.round_subs.clear();
        self.networked = false;
    }

    fn subscribe_leaderboard(&mut self) {
        if self.leaderboard_sub.is_some() || !self.store_usable() {
            return;
        }
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let tx = self.events_tx.clone();
        let result = store.subscribe_leaderboard(
            MAX_LEADERBOARD_ENTRIES,
            Box::new(move |entries| {
                let _ = tx.send(StoreEvent::Leaderboard(entries));
            }),
        );
        match result {
            Ok(sub) => self.leaderboard_sub = Some(sub),
            Err(err) => {
                tracing::warn!(%err, "leaderboard unavailable");
                self.leaderboard.clear();
            }
        }
    }

    // Peer and feed notifications queued by a previous round must not leak into this one.
    fn discard_round_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            if let StoreEvent::Leaderboard(entries) = event {
                self.leaderboard = entries;
            }
        }
    }

    fn refresh_link(&mut self) {
        let link = match self.store.as_ref() {
            Some(store) => store.status(),
            None => LinkStatus::Offline,
        };
        if link == self.link {
            return;
        }
        tracing::debug!(?link, "store link changed");
        self.link = link;
        self.status = match link {
            LinkStatus::Online => {
                let short: String = self.player_id.chars().take(6).collect();
                format!("CONNECTED: {short}")
            }
            LinkStatus::Connecting => STATUS_CONNECTING.to_owned(),
            LinkStatus::Offline => STATUS_OFFLINE.to_owned(),
        };
        if link == LinkStatus::Offline && self.networked {
            self.drop_to_local();
        }
    }

    // The link is gone, so there is nobody to tell. The round carries on locally.
    fn drop_to_local(&mut self) {
        tracing::warn!(name = %self.player_name, "store went offline, playing locally");
        self.round_subs.clear();
        self.leaderboard_sub = None;
        self.networked = false;
        self.remote.clear();
        self.kill_feed.clear();
        self.player_count = 1;
    }

    fn store_usable(&self) -> bool {
        self.store.is_some() && self.link != LinkStatus::Offline
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn sim(&self) -> &Simulation {
        &self.sim
    }

    pub fn snake(&self) -> &Snake {
        self.sim.snake()
    }

    pub fn food(&self) -> Position {
        self.sim.food()
    }

    pub fn state(&self) -> &GameState {
        self.sim.state()
    }

    pub fn run_state(&self) -> RunState {
        self.sim.run_state()
    }

    pub fn remote_players(&self) -> &RemotePlayers {
        &self.remote
    }

    pub fn leaderboard(&self) -> &[LeaderboardEntry] {
        &self.leaderboard
    }

    pub fn kill_feed(&self) -> &[KillFeedRecord] {
        let n = self.kill_feed.len().min(KILL_FEED_LEN);
        &self.kill_feed[..n]
    }

    pub fn player_count(&self) -> usize {
        self.player_count
    }

    pub fn status_message(&self) -> &str {
        &self.status
    }

    /// Label of whatever ended the last round.
    pub fn killer(&self) -> &str {
        &self.killer
    }

    pub fn personal_best(&self) -> &PersonalBest {
        &self.personal_best
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn is_networked(&self) -> bool {
        self.networked
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Trims `name`; an empty result becomes `PLAYER <n>`.
pub fn normalize_name<R: Rng>(name: &str, rng: &mut R) -> String {
    let name = name.trim();
    if name.is_empty() {
        format!("PLAYER {}", rng.gen_range(0..1000))
    } else {
        name.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::memory::MemoryStore;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn solo_session() -> GameSession {
        GameSession::with_seed(GameConfig::default(), None, ProfileStore::ephemeral(), 3)
    }

    #[test]
    fn empty_name_gets_placeholder() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let name = normalize_name("   ", &mut rng);
        assert!(name.starts_with("PLAYER "), "{name}");
        let n: u32 = name["PLAYER ".len()..].parse().unwrap();
        assert!(n < 1000);
        assert_eq!(normalize_name("  neo ", &mut rng), "neo");
    }

    #[test]
    fn without_store_everything_is_local() {
        let mut session = solo_session();
        assert_eq!(session.status_message(), STATUS_OFFLINE);
        session.start_session("neo", GameMode::Multiplayer);
        assert!(!session.is_networked());
        assert!(session.sim().is_running());
        assert_eq!(session.player_count(), 1);
        assert!(!session.maybe_publish(1_000));
    }

    #[test]
    fn online_store_reports_connected_status() {
        let store = MemoryStore::new();
        let conn: Arc<dyn SharedStore> = Arc::new(store.connect());
        let mut session =
            GameSession::with_seed(GameConfig::default(), Some(conn), ProfileStore::ephemeral(), 3);
        assert!(session.status_message().starts_with("CONNECTED: "));

        session.start_session("neo", GameMode::Multiplayer);
        assert!(session.is_networked());
        assert!(session.maybe_publish(0));
        assert!(!session.maybe_publish(100));
        assert!(store.players().contains_key(session.player_id()));

        session.teardown();
        session.teardown();
        assert!(session.is_closed());
        assert!(store.players().is_empty());
    }

    #[test]
    fn losing_the_link_mid_round_goes_local() {
        let store = MemoryStore::new();
        let peer = store.connect();
        peer.upsert_player(
            "peer",
            PlayerRecord {
                name: "PEER".to_owned(),
                snake: vec![Position::new(1, 1)],
                ..PlayerRecord::default()
            },
        )
        .unwrap();
        let conn: Arc<dyn SharedStore> = Arc::new(store.connect());
        let mut session =
            GameSession::with_seed(GameConfig::default(), Some(conn), ProfileStore::ephemeral(), 3);
        session.start_session("neo", GameMode::Multiplayer);
        session.pump(0);
        assert!(session.is_networked());
        assert_eq!(session.remote_players().len(), 1);

        store.set_offline(true);
        session.pump(50);
        assert!(!session.is_networked());
        assert_eq!(session.status_message(), STATUS_OFFLINE);
        assert!(session.remote_players().is_empty());
        assert_eq!(session.player_count(), 1);
        assert!(session.sim().is_running());
        assert!(!session.on_sync(1_000));
        assert!(!session.on_sync(2_000));
    }

    #[test]
    fn solo_round_does_not_touch_the_store() {
        let store = MemoryStore::new();
        let conn: Arc<dyn SharedStore> = Arc::new(store.connect());
        let mut session =
            GameSession::with_seed(GameConfig::default(), Some(conn), ProfileStore::ephemeral(), 3);
        session.start_session("solo", GameMode::Solo);
        assert!(!session.is_networked());
        for t in 0..10 {
            session.on_tick(t * 120);
        }
        assert!(store.players().is_empty());
    }

    #[test]
    fn kill_credit_requires_a_running_round() {
        let mut session = solo_session();
        assert!(!session.register_kill("FOO"));
        session.start_session("neo", GameMode::Solo);
        assert!(session.register_kill("FOO"));
        assert_eq!(session.state().kills, 1);
    }

    #[test]
    fn respawn_only_after_death() {
        let mut session = solo_session();
        session.start_session("neo", GameMode::Solo);
        assert!(!session.respawn());
    }
}
