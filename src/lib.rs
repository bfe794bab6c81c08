//! # hydrowatch
//!
//! A headless monitoring core for hydroponic/greenhouse sensor
//! telemetry: live-data ingestion, bounded history, and threshold-based
//! alerting, exposed through a consumer API any view layer can poll.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Session                             │
//! │  ┌───────────┐     ┌─────────┐     ┌─────────┐   ┌────────┐ │
//! │  │ transport │────▶│ context │────▶│ history │   │ alerts │ │
//! │  │ (ws feed) │     │ (ingest)│     └─────────┘   └────────┘ │
//! │  └───────────┘     └────┬────┘          ▲            ▲      │
//! │  ┌───────────┐          │               └─────┬──────┘      │
//! │  │  source   │──────────┘                ┌────┴─────┐       │
//! │  │(synthetic)│                           │thresholds│       │
//! │  └───────────┘                           └────┬─────┘       │
//! │                                          ┌────┴────┐        │
//! │                                          │ persist │        │
//! │                                          └─────────┘        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`transport`]**: WebSocket connector with an explicit reconnect
//!   state machine (exponential backoff, bounded attempts, clean-close
//!   teardown)
//! - **[`source`]**: Polled reading sources ([`ReadingSource`] trait):
//!   the synthetic generator and a channel-fed source for embedding
//! - **[`context`]**: [`SensorContext`], the per-session state object:
//!   readings snapshot, history, alert engine, thresholds, and the
//!   command surface (`update_thresholds`, `clear_alert`, ...)
//! - **[`data`]**: History store, alert engine, and threshold
//!   configuration
//! - **[`session`]**: The driver loop: exactly one producer per session,
//!   cancellation-scoped timers
//! - **[`persist`]**: Durable JSON key-value state (thresholds, identity)
//! - **[`auth`]**: The opaque operator identity gate
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Synthetic readings every 5 seconds
//! hydrowatch --operator demo
//!
//! # Live readings from a producer
//! hydrowatch --operator demo --endpoint ws://greenhouse.local:9000/readings
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use hydrowatch::{SensorContext, StateStore};
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = StateStore::open(".hydrowatch")?;
//! let mut ctx = SensorContext::new(store);
//!
//! let batch = [("temperature".to_string(), 31.5)].into_iter().collect();
//! for alert in ctx.ingest(&batch) {
//!     println!("{}: {}", alert.sensor, alert.message);
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod context;
pub mod data;
pub mod persist;
pub mod session;
pub mod source;
pub mod transport;

pub use auth::{AuthGate, Identity};
pub use context::SensorContext;
pub use data::{
    default_thresholds, Alert, AlertEngine, AlertStatus, History, Sample, Severity, Threshold,
    ThresholdConfig, ThresholdError, ThresholdMap, DEFAULT_HISTORY_CAP,
};
pub use persist::StateStore;
pub use session::{run_session, run_with_source, SessionConfig, DEFAULT_CADENCE};
pub use source::{unit_for, ChannelSource, ReadingSource, SensorBatch, SyntheticSource};
pub use transport::{ConnectionState, WsConnector, MAX_RECONNECT_ATTEMPTS};
