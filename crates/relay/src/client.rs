use std::sync::{Arc, Mutex};
use std::time::Duration;

use axon_core::config::RelayConfig;
use axon_core::{Error, Fault, FaultHub, FaultKind, Result};
use axon_rpc::{Dispatcher, RelayReply};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

const OUTBOUND_QUEUE: usize = 64;

enum OutboundFrame {
    Text(String),
    Pong(Vec<u8>),
}

/// Handle to the currently live relay connection, if any. Bound by the
/// connection manager on connect and cleared on loss; everyone else treats
/// it as possibly-absent and never sends-and-assumes-connected.
#[derive(Clone, Default)]
pub struct RelayHandle {
    tx: Arc<Mutex<Option<mpsc::Sender<OutboundFrame>>>>,
}

impl RelayHandle {
    pub fn is_connected(&self) -> bool {
        self.tx.lock().unwrap().is_some()
    }

    /// Best-effort send. When there is no live connection the payload is
    /// dropped and logged; the only remediation is the next reconnect.
    pub fn send_json<T: Serialize>(&self, payload: &T) {
        let tx = match self.tx.lock().unwrap().clone() {
            Some(tx) => tx,
            None => {
                warn!("Relay not connected, dropping outbound message");
                return;
            }
        };
        let text = match serde_json::to_string(payload) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to serialize outbound relay message");
                return;
            }
        };
        if let Err(e) = tx.try_send(OutboundFrame::Text(text)) {
            warn!(error = %e, "Failed to queue outbound relay message");
        }
    }

    fn bind(&self, tx: mpsc::Sender<OutboundFrame>) {
        *self.tx.lock().unwrap() = Some(tx);
    }

    fn clear(&self) {
        *self.tx.lock().unwrap() = None;
    }
}

/// Maintains the persistent outbound connection to the relay:
/// disconnected → connecting → connected → (any fault) → disconnected,
/// with a fixed delay before each new attempt and no retry cap.
pub struct RelayClient {
    config: RelayConfig,
    dispatcher: Arc<Dispatcher>,
    faults: Arc<FaultHub>,
    handle: RelayHandle,
}

impl RelayClient {
    pub fn new(config: RelayConfig, dispatcher: Arc<Dispatcher>, faults: Arc<FaultHub>) -> Self {
        Self {
            config,
            dispatcher,
            faults,
            handle: RelayHandle::default(),
        }
    }

    pub fn handle(&self) -> RelayHandle {
        self.handle.clone()
    }

    /// Never returns under normal operation.
    pub async fn run_forever(&self) {
        let delay = Duration::from_secs(self.config.reconnect_delay_secs.max(1));
        loop {
            info!(url = %self.config.url, "Connecting to relay");
            match self.serve_connection().await {
                Ok(()) => info!("Relay connection closed"),
                Err(e) => warn!(error = %e, "Relay connection failed"),
            }
            self.handle.clear();
            self.faults
                .publish(Fault::new(FaultKind::TransportLost, self.config.url.clone()));
            info!(delay_secs = delay.as_secs(), "Reconnecting after delay");
            tokio::time::sleep(delay).await;
        }
    }

    /// One connection lifetime: handshake, tool sync, then serve inbound
    /// envelopes until the transport faults.
    async fn serve_connection(&self) -> Result<()> {
        let url = url::Url::parse(&self.config.url)
            .map_err(|e| Error::Relay(format!("Invalid relay URL: {}", e)))?;
        let (ws, _) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::Relay(e.to_string()))?;
        info!("Relay connected, syncing tools");

        let (mut sink, mut stream) = ws.split();
        let (tx, mut rx) = mpsc::channel::<OutboundFrame>(OUTBOUND_QUEUE);
        self.handle.bind(tx.clone());

        // Refresh the remote side's view of our capabilities on every
        // (re)connect, before serving any request.
        self.handle.send_json(&self.dispatcher.tool_sync());

        let mut ping_timer =
            tokio::time::interval(Duration::from_secs(self.config.ping_interval_secs.max(1)));
        ping_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // Generous pong deadline: a slow handler must not look like a dead
        // connection.
        let pong_deadline = Duration::from_secs(self.config.ping_timeout_secs.max(1));
        let mut last_pong = tokio::time::Instant::now();

        loop {
            tokio::select! {
                frame = rx.recv() => {
                    let frame = frame.ok_or_else(|| Error::Relay("Outbound queue closed".to_string()))?;
                    let message = match frame {
                        OutboundFrame::Text(text) => WsMessage::Text(text),
                        OutboundFrame::Pong(payload) => WsMessage::Pong(payload),
                    };
                    sink.send(message).await.map_err(|e| Error::Relay(e.to_string()))?;
                }

                _ = ping_timer.tick() => {
                    if last_pong.elapsed() > pong_deadline {
                        return Err(Error::Relay(format!(
                            "No pong within {}s",
                            pong_deadline.as_secs()
                        )));
                    }
                    sink.send(WsMessage::Ping(Vec::new()))
                        .await
                        .map_err(|e| Error::Relay(e.to_string()))?;
                }

                message = stream.next() => match message {
                    Some(Ok(WsMessage::Text(raw))) => {
                        // One task per request: a slow handler never stalls
                        // this read loop, and responses go out whenever
                        // they finish; correlation is by id, not order.
                        let dispatcher = self.dispatcher.clone();
                        let handle = self.handle.clone();
                        tokio::spawn(async move {
                            match dispatcher.handle_relay(&raw).await {
                                Some(RelayReply::Response(resp)) => handle.send_json(&resp),
                                Some(RelayReply::ToolSync(sync)) => handle.send_json(&sync),
                                None => {}
                            }
                        });
                    }
                    Some(Ok(WsMessage::Ping(payload))) => {
                        let _ = tx.try_send(OutboundFrame::Pong(payload));
                    }
                    Some(Ok(WsMessage::Pong(_))) => {
                        last_pong = tokio::time::Instant::now();
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        debug!(?frame, "Relay sent close frame");
                        return Ok(());
                    }
                    Some(Ok(_)) => {} // binary frames are not part of the protocol
                    Some(Err(e)) => return Err(Error::Relay(e.to_string())),
                    None => return Ok(()),
                },
            }
        }
    }
}
