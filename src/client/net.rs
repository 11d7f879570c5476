use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::net::codec::{decode_server_bin, decode_server_json, encode_client_bin};
use crate::net::messages::{
    ClientMessage, KillFeedRecord, LeaderboardEntry, LeaderboardRecord, PlayerRecord,
    PlayersSnapshot, ServerMessage, Topic,
};
use crate::net::store::{Callback, LinkStatus, Listeners, SharedStore, StoreError, Subscription};

/// [`SharedStore`] backed by the WebSocket relay.
///
/// A background thread owns a tokio runtime and the socket. Writes are queued and
/// never wait for the network; subscription callbacks run on that thread.
pub struct RelayStore {
    outbound_tx: UnboundedSender<ClientMessage>,
    state: Arc<Mutex<RelayState>>,
}

struct RelayState {
    status: LinkStatus,
    players: Listeners<PlayersSnapshot>,
    leaderboard: Listeners<Vec<LeaderboardEntry>>,
    kills: Listeners<Vec<KillFeedRecord>>,
    last_players: Option<PlayersSnapshot>,
    last_leaderboard: Option<Vec<LeaderboardEntry>>,
    last_kills: Option<Vec<KillFeedRecord>>,
}

impl Default for RelayState {
    fn default() -> Self {
        Self {
            status: LinkStatus::Connecting,
            players: Listeners::default(),
            leaderboard: Listeners::default(),
            kills: Listeners::default(),
            last_players: None,
            last_leaderboard: None,
            last_kills: None,
        }
    }
}

fn lock(state: &Mutex<RelayState>) -> MutexGuard<'_, RelayState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RelayStore {
    pub fn connect(url: String) -> Self {
        let (outbound_tx, outbound_rx) = unbounded_channel::<ClientMessage>();
        let state = Arc::new(Mutex::new(RelayState::default()));
        let worker_state = Arc::clone(&state);

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(err) => {
                    tracing::error!(%err, "relay runtime failed to start");
                    lock(&worker_state).status = LinkStatus::Offline;
                    return;
                }
            };
            rt.block_on(run_link(url, outbound_rx, Arc::clone(&worker_state)));
            lock(&worker_state).status = LinkStatus::Offline;
        });

        Self { outbound_tx, state }
    }

    /// Blocks until the link leaves `Connecting` or `timeout` passes.
    pub fn wait_until_ready(&self, timeout: Duration) -> LinkStatus {
        let deadline = Instant::now() + timeout;
        loop {
            let status = lock(&self.state).status;
            if status != LinkStatus::Connecting || Instant::now() >= deadline {
                return status;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    fn send(&self, msg: ClientMessage) -> Result<(), StoreError> {
        if lock(&self.state).status == LinkStatus::Offline {
            return Err(StoreError::Offline);
        }
        self.outbound_tx.send(msg).map_err(|_| StoreError::Closed)
    }

    fn subscribe<T, F>(
        &self,
        topic: Topic,
        limit: usize,
        on_update: Callback<T>,
        select: F,
    ) -> Result<Subscription, StoreError>
    where
        T: Clone + 'static,
        F: Fn(&mut RelayState) -> (&mut Listeners<T>, Option<T>),
    {
        let (id, initial, request) = {
            let mut state = lock(&self.state);
            if state.status == LinkStatus::Offline {
                return Err(StoreError::Offline);
            }
            let (listeners, cached) = select(&mut *state);
            let before = listeners.max_limit();
            let was_empty = listeners.is_empty();
            let (id, listener) = listeners.add(limit, on_update);
            let after = listeners.max_limit();
            let request = (was_empty || after > before).then_some(after);
            (id, cached.map(|value| (listener, value)), request)
        };

        if let Some(limit) = request {
            self.outbound_tx
                .send(ClientMessage::Subscribe {
                    topic,
                    limit: limit as u32,
                })
                .map_err(|_| StoreError::Closed)?;
        }
        if let Some((listener, value)) = initial {
            (listener.callback)(value);
        }

        let weak: Weak<Mutex<RelayState>> = Arc::downgrade(&self.state);
        let tx = self.outbound_tx.clone();
        Ok(Subscription::new(move || {
            let Some(state) = weak.upgrade() else {
                return;
            };
            let now_empty = {
                let mut state = lock(&state);
                match topic {
                    Topic::Players => {
                        state.players.remove(id);
                        state.players.is_empty()
                    }
                    Topic::Leaderboard => {
                        state.leaderboard.remove(id);
                        state.leaderboard.is_empty()
                    }
                    Topic::KillFeed => {
                        state.kills.remove(id);
                        state.kills.is_empty()
                    }
                }
            };
            if now_empty {
                let _ = tx.send(ClientMessage::Unsubscribe { topic });
            }
        }))
    }
}

impl SharedStore for RelayStore {
    fn upsert_player(&self, id: &str, record: PlayerRecord) -> Result<(), StoreError> {
        self.send(ClientMessage::UpsertPlayer {
            id: id.to_owned(),
            record,
        })
    }

    fn remove_player(&self, id: &str) -> Result<(), StoreError> {
        self.send(ClientMessage::RemovePlayer { id: id.to_owned() })
    }

    fn remove_on_disconnect(&self, id: &str) -> Result<(), StoreError> {
        self.send(ClientMessage::RemoveOnDisconnect { id: id.to_owned() })
    }

    fn subscribe_players(
        &self,
        on_update: Callback<PlayersSnapshot>,
    ) -> Result<Subscription, StoreError> {
        self.subscribe(Topic::Players, 0, on_update, |state| {
            let cached = state.last_players.clone();
            (&mut state.players, cached)
        })
    }

    fn submit_score(&self, key: &str, record: LeaderboardRecord) -> Result<(), StoreError> {
        self.send(ClientMessage::SubmitScore {
            key: key.to_owned(),
            record,
        })
    }

    fn subscribe_leaderboard(
        &self,
        limit: usize,
        on_update: Callback<Vec<LeaderboardEntry>>,
    ) -> Result<Subscription, StoreError> {
        self.subscribe(Topic::Leaderboard, limit, on_update, |state| {
            let cached = state
                .last_leaderboard
                .as_ref()
                .map(|entries| entries.iter().take(limit).cloned().collect());
            (&mut state.leaderboard, cached)
        })
    }

    fn report_kill(&self, killer: &str, victim: &str) -> Result<(), StoreError> {
        self.send(ClientMessage::ReportKill {
            killer: killer.to_owned(),
            victim: victim.to_owned(),
        })
    }

    fn subscribe_kill_feed(
        &self,
        limit: usize,
        on_update: Callback<Vec<KillFeedRecord>>,
    ) -> Result<Subscription, StoreError> {
        self.subscribe(Topic::KillFeed, limit, on_update, |state| {
            let cached = state
                .last_kills
                .as_ref()
                .map(|kills| kills.iter().take(limit).cloned().collect());
            (&mut state.kills, cached)
        })
    }

    fn status(&self) -> LinkStatus {
        lock(&self.state).status
    }
}

async fn run_link(
    url: String,
    mut outbound_rx: UnboundedReceiver<ClientMessage>,
    state: Arc<Mutex<RelayState>>,
) {
    let ws_stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(err) => {
            tracing::warn!(%url, %err, "relay unreachable");
            return;
        }
    };
    lock(&state).status = LinkStatus::Online;
    tracing::info!(%url, "relay connected");
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                let Some(msg) = outbound else {
                    let _ = ws_sender.close().await;
                    break;
                };
                match encode_client_bin(msg) {
                    Ok(bytes) => {
                        if let Err(err) = ws_sender.send(Message::Binary(bytes)).await {
                            tracing::warn!(%err, "relay send failed");
                            break;
                        }
                    }
                    Err(err) => tracing::warn!(%err, "dropped unencodable message"),
                }
            }
            inbound = ws_receiver.next() => {
                match inbound {
                    Some(Ok(Message::Binary(bytes))) => {
                        match decode_server_bin(&bytes) {
                            Ok(msg) => dispatch(&state, msg),
                            Err(err) => tracing::debug!(%err, "bad binary frame"),
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        match decode_server_json(text.as_bytes()) {
                            Ok(msg) => dispatch(&state, msg),
                            Err(err) => tracing::debug!(%err, "bad text frame"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        tracing::info!("relay connection closed");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Caches the update and fans it out with the lock released.
fn dispatch(state: &Mutex<RelayState>, msg: ServerMessage) {
    let deliveries: Vec<Box<dyn FnOnce()>> = {
        let mut state = lock(state);
        match msg {
            ServerMessage::Players { players } => {
                state.last_players = Some(players.clone());
                state
                    .players
                    .snapshot()
                    .into_iter()
                    .map(|l| {
                        let players = players.clone();
                        Box::new(move || (l.callback)(players)) as Box<dyn FnOnce()>
                    })
                    .collect()
            }
            ServerMessage::Leaderboard { entries } => {
                let out = state
                    .leaderboard
                    .snapshot()
                    .into_iter()
                    .map(|l| {
                        let view: Vec<_> = entries.iter().take(l.limit).cloned().collect();
                        Box::new(move || (l.callback)(view)) as Box<dyn FnOnce()>
                    })
                    .collect();
                state.last_leaderboard = Some(entries);
                out
            }
            ServerMessage::KillFeed { kills } => {
                let out = state
                    .kills
                    .snapshot()
                    .into_iter()
                    .map(|l| {
                        let view: Vec<_> = kills.iter().take(l.limit).cloned().collect();
                        Box::new(move || (l.callback)(view)) as Box<dyn FnOnce()>
                    })
                    .collect();
                state.last_kills = Some(kills);
                out
            }
            ServerMessage::Error { message } => {
                tracing::warn!(%message, "relay rejected request");
                Vec::new()
            }
        }
    };
    for deliver in deliveries {
        deliver();
    }
}
