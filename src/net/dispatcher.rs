use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::{KILL_FEED_RETAIN, MAX_LEADERBOARD_ENTRIES};
use crate::net::memory::{MemoryConnection, MemoryStore};
use crate::net::messages::{ClientMessage, ServerMessage, Topic};
use crate::net::session::{InboundMessage, OutboundMessage, SessionHandle, SessionId};
use crate::net::store::{SharedStore, StoreError, Subscription};

/// Routes relay traffic into the shared [`MemoryStore`]. Each socket owns one store
/// connection, so its disconnect hooks fire when the socket goes away.
#[derive(Clone)]
pub struct DispatcherHandle {
    inner: Arc<Mutex<Dispatcher>>,
}

impl DispatcherHandle {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Dispatcher::new(store))),
        }
    }

    pub async fn register_session(&self, session: SessionHandle) {
        let mut guard = self.inner.lock().await;
        let connection = guard.store.connect();
        tracing::debug!(session = session.id, "relay session registered");
        guard.sessions.insert(
            session.id,
            RelaySession {
                handle: session,
                connection,
                subscriptions: HashMap::new(),
            },
        );
    }

    pub async fn unregister_session(&self, session_id: SessionId) {
        let removed = {
            let mut guard = self.inner.lock().await;
            guard.sessions.remove(&session_id)
        };
        if let Some(mut session) = removed {
            session.subscriptions.clear();
            session.connection.close();
            tracing::debug!(session = session_id, "relay session closed");
        }
    }

    pub async fn handle_inbound(&self, inbound: InboundMessage) -> Vec<OutboundMessage> {
        let mut guard = self.inner.lock().await;
        let Some(session) = guard.sessions.get_mut(&inbound.session_id) else {
            return Vec::new();
        };
        match session.apply(inbound.message) {
            Ok(()) => Vec::new(),
            Err(err) => vec![OutboundMessage::error(inbound.session_id, err)],
        }
    }

    /// Never waits on the socket buffer: the socket's own task is the one draining it.
    pub async fn send_outbound(&self, outbound: OutboundMessage) -> bool {
        let guard = self.inner.lock().await;
        guard
            .sessions
            .get(&outbound.session_id)
            .is_some_and(|s| s.handle.push(outbound.message))
    }

    pub async fn session_count(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }
}

struct Dispatcher {
    store: MemoryStore,
    sessions: HashMap<SessionId, RelaySession>,
}

impl Dispatcher {
    fn new(store: MemoryStore) -> Self {
        Self {
            store,
            sessions: HashMap::new(),
        }
    }
}

struct RelaySession {
    handle: SessionHandle,
    connection: MemoryConnection,
    subscriptions: HashMap<Topic, Subscription>,
}

impl RelaySession {
    fn apply(&mut self, message: ClientMessage) -> Result<(), StoreError> {
        let conn = &self.connection;
        match message {
            ClientMessage::UpsertPlayer { id, record } => conn.upsert_player(&id, record),
            ClientMessage::RemovePlayer { id } => conn.remove_player(&id),
            ClientMessage::RemoveOnDisconnect { id } => conn.remove_on_disconnect(&id),
            ClientMessage::SubmitScore { key, record } => {
                if key.is_empty() {
                    return Err(StoreError::Rejected("empty leaderboard key".to_owned()));
                }
                conn.submit_score(&key, record)
            }
            ClientMessage::ReportKill { killer, victim } => conn.report_kill(&killer, &victim),
            ClientMessage::Subscribe { topic, limit } => self.subscribe(topic, limit as usize),
            ClientMessage::Unsubscribe { topic } => {
                self.subscriptions.remove(&topic);
                Ok(())
            }
        }
    }

    fn subscribe(&mut self, topic: Topic, limit: usize) -> Result<(), StoreError> {
        // Replacing drops (and cancels) the old one first.
        self.subscriptions.remove(&topic);
        let tx = self.handle.clone();
        // Store callbacks run under the dispatcher lock, so they only ever push.
        let subscription = match topic {
            Topic::Players => self.connection.subscribe_players(Box::new(move |players| {
                tx.push(ServerMessage::Players { players });
            }))?,
            Topic::Leaderboard => self.connection.subscribe_leaderboard(
                limit.min(MAX_LEADERBOARD_ENTRIES),
                Box::new(move |entries| {
                    tx.push(ServerMessage::Leaderboard { entries });
                }),
            )?,
            Topic::KillFeed => self.connection.subscribe_kill_feed(
                limit.min(KILL_FEED_RETAIN),
                Box::new(move |kills| {
                    tx.push(ServerMessage::KillFeed { kills });
                }),
            )?,
        };
        self.subscriptions.insert(topic, subscription);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::messages::PlayerRecord;
    use crate::net::session::OUTBOUND_CAPACITY;
    use tokio::sync::mpsc;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn subscriber_sees_other_sessions_writes() {
        runtime().block_on(async {
            let store = MemoryStore::new();
            let dispatcher = DispatcherHandle::new(store.clone());
            let (tx_a, mut rx_a) = mpsc::channel(OUTBOUND_CAPACITY);
            let (tx_b, _rx_b) = mpsc::channel(OUTBOUND_CAPACITY);
            dispatcher.register_session(SessionHandle::new(1, tx_a)).await;
            dispatcher.register_session(SessionHandle::new(2, tx_b)).await;

            dispatcher
                .handle_inbound(InboundMessage {
                    session_id: 1,
                    message: ClientMessage::Subscribe {
                        topic: Topic::Players,
                        limit: 0,
                    },
                })
                .await;
            assert!(matches!(
                rx_a.recv().await,
                Some(ServerMessage::Players { players }) if players.is_empty()
            ));

            let record = PlayerRecord {
                name: "B".to_owned(),
                ..PlayerRecord::default()
            };
            for message in [
                ClientMessage::UpsertPlayer {
                    id: "b".to_owned(),
                    record,
                },
                ClientMessage::RemoveOnDisconnect { id: "b".to_owned() },
            ] {
                dispatcher
                    .handle_inbound(InboundMessage {
                        session_id: 2,
                        message,
                    })
                    .await;
            }
            match rx_a.recv().await {
                Some(ServerMessage::Players { players }) => assert!(players.contains_key("b")),
                other => panic!("unexpected {other:?}"),
            }

            dispatcher.unregister_session(2).await;
            match rx_a.recv().await {
                Some(ServerMessage::Players { players }) => assert!(players.is_empty()),
                other => panic!("unexpected {other:?}"),
            }
            assert_eq!(dispatcher.session_count().await, 1);
        });
    }

    #[test]
    fn error_reply_to_a_full_socket_is_dropped() {
        runtime().block_on(async {
            let dispatcher = DispatcherHandle::new(MemoryStore::new());
            let (tx, mut rx) = mpsc::channel(OUTBOUND_CAPACITY);
            dispatcher.register_session(SessionHandle::new(4, tx)).await;
            for _ in 0..OUTBOUND_CAPACITY {
                assert!(dispatcher.send_outbound(OutboundMessage::error(4, "fill")).await);
            }

            let out = dispatcher
                .handle_inbound(InboundMessage {
                    session_id: 4,
                    message: ClientMessage::SubmitScore {
                        key: String::new(),
                        record: Default::default(),
                    },
                })
                .await;
            for reply in out {
                let sent = tokio::time::timeout(
                    std::time::Duration::from_secs(2),
                    dispatcher.send_outbound(reply),
                )
                .await;
                assert_eq!(sent, Ok(false));
            }

            // The socket stays usable once drained.
            while rx.try_recv().is_ok() {}
            assert!(dispatcher.send_outbound(OutboundMessage::error(4, "later")).await);
            assert_eq!(dispatcher.session_count().await, 1);
        });
    }

    #[test]
    fn empty_leaderboard_key_is_rejected() {
        runtime().block_on(async {
            let dispatcher = DispatcherHandle::new(MemoryStore::new());
            let (tx, _rx) = mpsc::channel(OUTBOUND_CAPACITY);
            dispatcher.register_session(SessionHandle::new(7, tx)).await;
            let out = dispatcher
                .handle_inbound(InboundMessage {
                    session_id: 7,
                    message: ClientMessage::SubmitScore {
                        key: String::new(),
                        record: Default::default(),
                    },
                })
                .await;
            assert_eq!(out.len(), 1);
            assert!(matches!(out[0].message, ServerMessage::Error { .. }));
        });
    }
}
