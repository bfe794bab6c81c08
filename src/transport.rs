//! WebSocket transport connector.
//!
//! Manages a single logical streaming connection to a remote reading
//! producer. Decoded batches and connection status flow out through
//! channels; reconnection is an explicit state machine
//! ({idle, connecting, connected, backoff}) driven by one spawned task
//! that selects every wait against a cancellation token, so teardown
//! can never leave a reconnect timer running.
//!
//! Connection failures and malformed frames are recovered locally
//! (logged, backed off, or dropped) and never surfaced to the alerting
//! layer as faults.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::source::SensorBatch;

/// Reconnection is abandoned after this many consecutive failures until
/// the caller re-invokes `connect` explicitly.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 3;

const BACKOFF_BASE_MS: u64 = 1000;
const BACKOFF_CAP_MS: u64 = 10_000;

/// Development placeholder target: no real producer listens here, so
/// connecting would only generate connection-failure noise.
const PLACEHOLDER_ENDPOINT: &str = "localhost:8080";

/// Connection status, published through a watch channel.
///
/// Owned by the connector; read-only to everyone else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub connected: bool,
    pub last_error: Option<String>,
}

/// Reconnect state machine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Attempts exhausted or peer closed cleanly; parked until teardown.
    Idle,
    Connecting,
    /// Waiting out the delay before reconnect attempt `attempt + 1`.
    Backoff { attempt: u32 },
}

/// How a connected session ended.
enum SessionEnd {
    /// Owner-initiated teardown; a clean close frame was sent.
    Cancelled,
    /// Peer closed with a normal code; not a failure, no reconnect.
    ClosedByPeer,
    /// Unexpected closure or stream error; reconnect applies.
    Dropped(String),
}

/// Delay before the reconnect attempt following failure `attempt`.
///
/// Exponential from 1s, capped at 10s: 1000, 2000, 4000, ... ms.
pub fn backoff_delay(attempt: u32) -> Duration {
    let ms = BACKOFF_BASE_MS.saturating_mul(1u64 << attempt.min(16));
    Duration::from_millis(ms.min(BACKOFF_CAP_MS))
}

/// Whether an endpoint is the non-operational development placeholder.
pub fn is_placeholder(endpoint: &str) -> bool {
    endpoint.contains(PLACEHOLDER_ENDPOINT)
}

fn phase_after_drop(attempt: u32) -> Phase {
    if attempt < MAX_RECONNECT_ATTEMPTS {
        Phase::Backoff { attempt }
    } else {
        Phase::Idle
    }
}

/// Handle to a single logical transport session.
///
/// Created by [`connect`](Self::connect); dropped or shut down, it
/// cancels the driver task and any pending reconnect timer.
#[derive(Debug)]
pub struct WsConnector {
    readings: mpsc::Receiver<SensorBatch>,
    state: watch::Receiver<ConnectionState>,
    outbound: Option<mpsc::Sender<serde_json::Value>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    description: String,
    noop: bool,
}

impl WsConnector {
    /// Open a transport session.
    ///
    /// If the endpoint is absent, the connector is disabled, or the
    /// endpoint is the development placeholder, no network action is
    /// taken: the connector reports disconnected and its reading stream
    /// stays silent, so the surrounding system can run entirely on the
    /// synthetic producer.
    ///
    /// # Example
    ///
    /// ```
    /// use hydrowatch::WsConnector;
    ///
    /// # tokio_test::block_on(async {
    /// // No endpoint configured: the no-op policy applies
    /// let connector = WsConnector::connect(None, true);
    /// assert!(connector.is_noop());
    /// # });
    /// ```
    pub fn connect(endpoint: Option<&str>, enabled: bool) -> Self {
        let usable = endpoint.filter(|url| enabled && !is_placeholder(url));

        let Some(url) = usable else {
            tracing::info!("transport skipped - no usable endpoint or disabled");
            let (_state_tx, state_rx) = watch::channel(ConnectionState::default());
            let (_readings_tx, readings_rx) = mpsc::channel(1);
            return Self {
                readings: readings_rx,
                state: state_rx,
                outbound: None,
                cancel: CancellationToken::new(),
                task: None,
                description: "disabled".to_string(),
                noop: true,
            };
        };

        let (state_tx, state_rx) = watch::channel(ConnectionState::default());
        let (readings_tx, readings_rx) = mpsc::channel(16);
        let (outbound_tx, outbound_rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_connector(
            url.to_string(),
            readings_tx,
            outbound_rx,
            state_tx,
            cancel.clone(),
        ));

        Self {
            readings: readings_rx,
            state: state_rx,
            outbound: Some(outbound_tx),
            cancel,
            task: Some(task),
            description: format!("ws: {}", url),
            noop: false,
        }
    }

    /// True when the no-op policy applied and no session was started.
    pub fn is_noop(&self) -> bool {
        self.noop
    }

    /// Human-readable description of the session target.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Current connection status snapshot.
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// A watch receiver for observing status transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Receive the next decoded reading batch.
    ///
    /// Returns `None` once the session has ended.
    pub async fn recv(&mut self) -> Option<SensorBatch> {
        self.readings.recv().await
    }

    /// Send a payload to the producer, best-effort.
    ///
    /// Dropped with a local diagnostic if the socket is not connected;
    /// never blocks, never escalates.
    pub fn send(&self, payload: serde_json::Value) {
        if !self.state.borrow().connected {
            tracing::debug!("transport not connected, dropping outbound payload");
            return;
        }
        if let Some(tx) = &self.outbound {
            if tx.try_send(payload).is_err() {
                tracing::warn!("outbound queue full, dropping payload");
            }
        }
    }

    /// Tear the session down cleanly.
    ///
    /// Cancels any pending reconnect timer and sends a normal close
    /// frame if a socket is open.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for WsConnector {
    fn drop(&mut self) {
        // A dropped handle must not leave the driver task reconnecting.
        self.cancel.cancel();
    }
}

/// Driver task: runs the reconnect state machine until cancelled.
async fn run_connector(
    endpoint: String,
    readings: mpsc::Sender<SensorBatch>,
    mut outbound: mpsc::Receiver<serde_json::Value>,
    state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
) {
    let mut phase = Phase::Connecting;
    let mut attempt: u32 = 0;

    loop {
        match phase {
            Phase::Idle => {
                cancel.cancelled().await;
                return;
            }
            Phase::Connecting => {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    result = connect_async(endpoint.as_str()) => match result {
                        Ok((ws, _response)) => {
                            attempt = 0;
                            let _ = state.send(ConnectionState { connected: true, last_error: None });
                            tracing::info!(endpoint = %endpoint, "transport connected");

                            match drive_session(ws, &readings, &mut outbound, &cancel).await {
                                SessionEnd::Cancelled => {
                                    let _ = state.send(ConnectionState::default());
                                    return;
                                }
                                SessionEnd::ClosedByPeer => {
                                    let _ = state.send(ConnectionState::default());
                                    tracing::info!(endpoint = %endpoint, "producer closed the session");
                                    phase = Phase::Idle;
                                }
                                SessionEnd::Dropped(reason) => {
                                    let _ = state.send(ConnectionState {
                                        connected: false,
                                        last_error: Some(reason.clone()),
                                    });
                                    tracing::warn!(endpoint = %endpoint, reason = %reason, "transport dropped");
                                    phase = phase_after_drop(attempt);
                                }
                            }
                        }
                        Err(e) => {
                            let _ = state.send(ConnectionState {
                                connected: false,
                                last_error: Some(e.to_string()),
                            });
                            tracing::error!(endpoint = %endpoint, error = %e, "transport connection failed");
                            phase = phase_after_drop(attempt);
                        }
                    }
                }
            }
            Phase::Backoff { attempt: current } => {
                let delay = backoff_delay(current);
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {
                        attempt = current + 1;
                        tracing::info!(
                            attempt = attempt,
                            max = MAX_RECONNECT_ATTEMPTS,
                            delay_ms = delay.as_millis() as u64,
                            "attempting to reconnect"
                        );
                        phase = Phase::Connecting;
                    }
                }
            }
        }
    }
}

/// Drive one connected session: decode inbound frames, flush outbound
/// payloads, and close cleanly on cancellation.
async fn drive_session(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    readings: &mpsc::Sender<SensorBatch>,
    outbound: &mut mpsc::Receiver<serde_json::Value>,
    cancel: &CancellationToken,
) -> SessionEnd {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: "session ended".into(),
                };
                if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                    tracing::debug!(error = %e, "close frame not delivered");
                }
                return SessionEnd::Cancelled;
            }
            payload = outbound.recv() => match payload {
                Some(payload) => {
                    if let Err(e) = sink.send(Message::Text(payload.to_string())).await {
                        return SessionEnd::Dropped(format!("send failed: {}", e));
                    }
                }
                // All handles gone; treat like owner teardown.
                None => return SessionEnd::Cancelled,
            },
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<SensorBatch>(&text) {
                        Ok(batch) => {
                            if readings.send(batch).await.is_err() {
                                // Receiver dropped; session owner is gone.
                                return SessionEnd::Cancelled;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "dropping malformed frame");
                        }
                    }
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                    // Handled automatically by tungstenite.
                }
                Some(Ok(Message::Close(frame))) => {
                    let clean = frame
                        .as_ref()
                        .is_some_and(|f| f.code == CloseCode::Normal);
                    if clean {
                        return SessionEnd::ClosedByPeer;
                    }
                    return SessionEnd::Dropped(format!("closed: {:?}", frame));
                }
                Some(Ok(_)) => {
                    // Binary / Frame - ignore.
                }
                Some(Err(e)) => return SessionEnd::Dropped(e.to_string()),
                None => return SessionEnd::Dropped("stream exhausted".to_string()),
            }
        }
    }
}
