//! Monitoring session driver.
//!
//! One producer drives the pipeline per session: the live transport
//! when a usable endpoint is configured, otherwise the synthetic
//! generator on a timer. Never both at once, which would double-count
//! readings. Every wait selects against the session's cancellation
//! token, and teardown shuts the transport down cleanly, so no timer
//! outlives its owner.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::context::SensorContext;
use crate::data::Alert;
use crate::source::{ReadingSource, SyntheticSource};
use crate::transport::WsConnector;

/// Default producer cadence.
pub const DEFAULT_CADENCE: Duration = Duration::from_secs(5);

/// Parameters for one monitoring session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket endpoint of the reading producer. Absent means
    /// synthetic-only mode.
    pub endpoint: Option<String>,
    /// Polling cadence for the synthetic producer.
    pub cadence: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            cadence: DEFAULT_CADENCE,
        }
    }
}

/// Run a monitoring session until the token is cancelled.
pub async fn run_session(ctx: &mut SensorContext, config: &SessionConfig, cancel: CancellationToken) {
    let connector = WsConnector::connect(config.endpoint.as_deref(), true);

    if connector.is_noop() {
        tracing::info!(cadence = ?config.cadence, "running on the synthetic producer");
        let mut source = SyntheticSource::new();
        run_with_source(ctx, &mut source, config.cadence, cancel).await;
    } else {
        tracing::info!(source = connector.description(), "running on the live transport");
        run_with_transport(ctx, connector, cancel).await;
    }
}

/// Drive the pipeline from a polled reading source on a fixed cadence.
///
/// Used for the synthetic producer and for embedded/channel-fed setups.
pub async fn run_with_source(
    ctx: &mut SensorContext,
    source: &mut dyn ReadingSource,
    cadence: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(cadence);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Some(err) = source.error() {
                    tracing::warn!(source = source.description(), error = %err, "source error");
                }
                if let Some(batch) = source.poll() {
                    let created = ctx.ingest(&batch);
                    log_alerts(&created);
                }
            }
        }
    }
}

/// Drive the pipeline from the live transport until it ends or the
/// session is torn down.
async fn run_with_transport(
    ctx: &mut SensorContext,
    mut connector: WsConnector,
    cancel: CancellationToken,
) {
    let mut state_rx = connector.watch_state();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    // Driver gone; only happens at teardown.
                    break;
                }
                let state = state_rx.borrow().clone();
                if state.connected {
                    tracing::info!("producer connected");
                } else if let Some(ref err) = state.last_error {
                    tracing::warn!(error = %err, "producer disconnected");
                } else {
                    tracing::info!("producer disconnected");
                }
            }
            batch = connector.recv() => match batch {
                Some(batch) => {
                    let created = ctx.ingest(&batch);
                    log_alerts(&created);
                }
                None => break,
            }
        }
    }

    connector.shutdown().await;
}

fn log_alerts(alerts: &[Alert]) {
    for alert in alerts {
        tracing::warn!(
            id = %alert.id,
            sensor = %alert.sensor,
            value = alert.value,
            severity = ?alert.severity,
            threshold = %alert.threshold,
            "{}",
            alert.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::StateStore;
    use crate::source::{ChannelSource, SensorBatch};
    use tempfile::TempDir;

    fn batch(entries: &[(&str, f64)]) -> SensorBatch {
        entries.iter().map(|&(s, v)| (s.to_string(), v)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_driven_session_ingests_and_stops() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        let mut ctx = SensorContext::new(store);

        let (tx, mut source) = ChannelSource::create("test harness");
        // temperature default threshold is 18-28: this violates
        tx.send(batch(&[("temperature", 32.0)])).unwrap();

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();

        let driver = run_with_source(&mut ctx, &mut source, Duration::from_millis(10), cancel);
        let stop = async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            stopper.cancel();
        };
        tokio::join!(driver, stop);

        assert!(ctx.last_updated().is_some());
        assert_eq!(ctx.active_alert_count(), 1);
        assert_eq!(ctx.readings().get("temperature"), Some(&32.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_without_endpoint_uses_synthetic() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        let mut ctx = SensorContext::new(store);

        let config = SessionConfig {
            endpoint: None,
            cadence: Duration::from_millis(10),
        };
        let cancel = CancellationToken::new();
        let stopper = cancel.clone();

        let driver = run_session(&mut ctx, &config, cancel);
        let stop = async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            stopper.cancel();
        };
        tokio::join!(driver, stop);

        // The synthetic producer delivered at least one full batch
        assert!(ctx.last_updated().is_some());
        assert_eq!(ctx.readings().len(), 6);
        assert!(!ctx.history_all("temperature").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_placeholder_endpoint_falls_back_to_synthetic() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        let mut ctx = SensorContext::new(store);

        let config = SessionConfig {
            endpoint: Some("ws://localhost:8080/readings".to_string()),
            cadence: Duration::from_millis(10),
        };
        let cancel = CancellationToken::new();
        let stopper = cancel.clone();

        let driver = run_session(&mut ctx, &config, cancel);
        let stop = async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stopper.cancel();
        };
        tokio::join!(driver, stop);

        assert!(ctx.last_updated().is_some());
    }
}
