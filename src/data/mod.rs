//! Data models and processing for the monitoring pipeline.
//!
//! ## Submodules
//!
//! - [`alert`]: Alert records and the threshold evaluation engine
//! - [`history`]: Bounded per-sensor (timestamp, value) series
//! - [`thresholds`]: Per-sensor safe ranges with validation and persistence
//!
//! ## Data Flow
//!
//! ```text
//! SensorBatch (raw JSON)
//!        │
//!        ▼
//! SensorContext::ingest()
//!        │
//!        ├──▶ History::append() (per sensor, FIFO-capped)
//!        │
//!        └──▶ AlertEngine::evaluate() (reads ThresholdConfig)
//! ```

pub mod alert;
pub mod history;
pub mod thresholds;

pub use alert::{Alert, AlertEngine, AlertStatus, Severity};
pub use history::{History, Sample, DEFAULT_HISTORY_CAP};
pub use thresholds::{
    default_thresholds, Threshold, ThresholdConfig, ThresholdError, ThresholdMap,
};
