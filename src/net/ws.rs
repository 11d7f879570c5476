use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use crate::net::codec::{decode_client_bin, decode_client_json, encode_server_bin};
use crate::net::dispatcher::DispatcherHandle;
use crate::net::messages::ClientMessage;
use crate::net::session::{InboundMessage, SessionHandle, OUTBOUND_CAPACITY};

/// WebSocket front of the relay. Binary frames carry bincode, text frames JSON;
/// replies are always binary.
pub struct WsServer {
    listener: TcpListener,
}

impl WsServer {
    pub async fn bind(addr: &str) -> tokio::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> tokio::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn serve(addr: &str, dispatcher: DispatcherHandle) -> tokio::io::Result<()> {
        Self::bind(addr).await?.run(dispatcher).await
    }

    pub async fn run(self, dispatcher: DispatcherHandle) -> tokio::io::Result<()> {
        if let Ok(addr) = self.local_addr() {
            tracing::info!(%addr, "relay listening");
        }
        let mut next_id: u64 = 1;

        loop {
            let (stream, peer) = self.listener.accept().await?;
            let dispatcher = dispatcher.clone();
            let session_id = next_id;
            next_id = next_id.saturating_add(1);

            tokio::spawn(async move {
                let ws_stream = match accept_async(stream).await {
                    Ok(stream) => stream,
                    Err(err) => {
                        tracing::debug!(%peer, %err, "websocket handshake failed");
                        return;
                    }
                };
                tracing::info!(%peer, session = session_id, "relay client connected");
                let (mut ws_sender, mut ws_receiver) = ws_stream.split();
                let (outbound_tx, mut outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);

                dispatcher
                    .register_session(SessionHandle::new(session_id, outbound_tx))
                    .await;

                loop {
                    tokio::select! {
                        inbound = ws_receiver.next() => {
                            let decoded = match inbound {
                                Some(Ok(Message::Text(text))) => decode_client_json(text.as_bytes()),
                                Some(Ok(Message::Binary(bytes))) => {
                                    decode_client_bin(&bytes).or_else(|_| decode_client_json(&bytes))
                                }
                                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                                _ => continue,
                            };
                            match decoded {
                                Ok(message) => handle(&dispatcher, session_id, message).await,
                                Err(err) => tracing::debug!(session = session_id, %err, "bad frame"),
                            }
                        }
                        outbound = outbound_rx.recv() => {
                            let Some(msg) = outbound else {
                                break;
                            };
                            match encode_server_bin(msg) {
                                Ok(payload) => {
                                    if ws_sender.send(Message::Binary(payload)).await.is_err() {
                                        break;
                                    }
                                }
                                Err(err) => tracing::warn!(%err, "dropped unencodable update"),
                            }
                        }
                    }
                }

                dispatcher.unregister_session(session_id).await;
                tracing::info!(%peer, session = session_id, "relay client disconnected");
            });
        }
    }
}

async fn handle(dispatcher: &DispatcherHandle, session_id: u64, message: ClientMessage) {
    let outbound = dispatcher
        .handle_inbound(InboundMessage {
            session_id,
            message,
        })
        .await;
    for out in outbound {
        dispatcher.send_outbound(out).await;
    }
}
