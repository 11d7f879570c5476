use std::fmt::Display;

use tokio::sync::mpsc;

use crate::net::messages::{ClientMessage, ServerMessage};

pub type SessionId = u64;

/// Outbound frames buffered per socket before updates start being dropped.
pub const OUTBOUND_CAPACITY: usize = 256;

/// A decoded frame from one relay socket.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub session_id: SessionId,
    pub message: ClientMessage,
}

/// A reply addressed to a single socket.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub session_id: SessionId,
    pub message: ServerMessage,
}

impl OutboundMessage {
    pub fn error(session_id: SessionId, err: impl Display) -> Self {
        Self {
            session_id,
            message: ServerMessage::Error {
                message: err.to_string(),
            },
        }
    }
}

/// Write half of a relay socket, as the dispatcher sees it.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    outbound_tx: mpsc::Sender<ServerMessage>,
}

impl SessionHandle {
    pub fn new(id: SessionId, outbound_tx: mpsc::Sender<ServerMessage>) -> Self {
        Self { id, outbound_tx }
    }

    /// Queues without waiting. A full or closed buffer drops the update.
    pub fn push(&self, message: ServerMessage) -> bool {
        match self.outbound_tx.try_send(message) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(session = self.id, %err, "dropped relay update");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_drops_when_buffer_is_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let handle = SessionHandle::new(3, tx);
        let pong = || ServerMessage::Error {
            message: "x".to_owned(),
        };
        assert!(handle.push(pong()));
        assert!(!handle.push(pong()));
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn error_reply_carries_the_message() {
        let out = OutboundMessage::error(9, "nope");
        assert_eq!(out.session_id, 9);
        assert!(matches!(out.message, ServerMessage::Error { ref message } if message == "nope"));
    }
}
