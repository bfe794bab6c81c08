//! Session data context and the consumer API.
//!
//! [`SensorContext`] is the explicit context object the whole pipeline
//! hangs off: the current readings snapshot, per-sensor history, the
//! alert engine, and the threshold configuration, created when a
//! monitoring session starts and dropped at teardown. The view layer
//! (or any embedding application) reads state through its accessors and
//! issues commands through its methods; nothing else mutates alerts or
//! thresholds.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::data::{Alert, AlertEngine, History, Sample, ThresholdConfig, ThresholdError, ThresholdMap};
use crate::persist::StateStore;
use crate::source::SensorBatch;

/// All mutable state for one monitoring session.
pub struct SensorContext {
    readings: SensorBatch,
    history: History,
    alerts: AlertEngine,
    thresholds: ThresholdConfig,
    last_updated: Option<DateTime<Utc>>,
    store: StateStore,
}

impl SensorContext {
    /// Create a context backed by the given state store, restoring the
    /// persisted threshold configuration.
    pub fn new(store: StateStore) -> Self {
        Self::with_history_cap(store, crate::data::DEFAULT_HISTORY_CAP)
    }

    /// Create a context with a custom history retention cap.
    pub fn with_history_cap(store: StateStore, cap: usize) -> Self {
        let thresholds = ThresholdConfig::load(&store);
        Self {
            readings: SensorBatch::new(),
            history: History::with_cap(cap),
            alerts: AlertEngine::new(),
            thresholds,
            last_updated: None,
            store,
        }
    }

    /// Ingest one reading batch, stamped with the current instant.
    ///
    /// Returns the alerts this batch newly created.
    pub fn ingest(&mut self, batch: &SensorBatch) -> Vec<Alert> {
        self.ingest_at(batch, Utc::now())
    }

    /// Ingest one reading batch with an explicit timestamp.
    ///
    /// All readings in the batch are considered simultaneous: each gets
    /// the same timestamp, is appended to its history series, and is
    /// evaluated against the thresholds.
    pub fn ingest_at(&mut self, batch: &SensorBatch, timestamp: DateTime<Utc>) -> Vec<Alert> {
        let mut created = Vec::new();

        for (sensor, &value) in batch {
            self.history.append(sensor, timestamp, value);
            if let Some(alert) = self.alerts.evaluate(sensor, value, timestamp, &self.thresholds) {
                created.push(alert.clone());
            }
        }

        self.readings = batch.clone();
        self.last_updated = Some(timestamp);
        created
    }

    /// The most recent reading per sensor.
    pub fn readings(&self) -> &SensorBatch {
        &self.readings
    }

    /// When the last batch was ingested, if any.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// The most recent `count` samples for a sensor, oldest first.
    pub fn history_window(&self, sensor: &str, count: usize) -> Vec<Sample> {
        self.history.window(sensor, count)
    }

    /// The full retained series for a sensor.
    pub fn history_all(&self, sensor: &str) -> Vec<Sample> {
        self.history.all(sensor)
    }

    /// All alerts, most recent first.
    pub fn alerts(&self) -> &[Alert] {
        self.alerts.alerts()
    }

    /// Number of currently active alerts.
    pub fn active_alert_count(&self) -> usize {
        self.alerts.active_count()
    }

    /// The current threshold configuration.
    pub fn thresholds(&self) -> &ThresholdMap {
        self.thresholds.map()
    }

    /// Replace the threshold configuration atomically and persist it.
    pub fn update_thresholds(&mut self, new_map: ThresholdMap) -> Result<(), ThresholdError> {
        self.thresholds.update(new_map, &self.store)
    }

    /// Resolve one alert by id; benign no-op for unknown ids.
    pub fn clear_alert(&mut self, alert_id: &str) {
        self.alerts.clear(alert_id);
    }

    /// Resolve every active alert.
    pub fn clear_all_alerts(&mut self) {
        self.alerts.clear_all();
    }

    /// Export current state to a JSON file.
    ///
    /// The headless stand-in for a dashboard's "current state" surface:
    /// a summary block plus readings, thresholds, and the alert list.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        use std::io::Write;

        let mut export = serde_json::Map::new();

        let mut summary = serde_json::Map::new();
        summary.insert(
            "sensors".to_string(),
            serde_json::json!(self.readings.len()),
        );
        summary.insert(
            "active_alerts".to_string(),
            serde_json::json!(self.active_alert_count()),
        );
        summary.insert(
            "last_updated".to_string(),
            serde_json::json!(self.last_updated.map(|t| t.to_rfc3339())),
        );
        export.insert("summary".to_string(), serde_json::Value::Object(summary));

        export.insert("readings".to_string(), serde_json::json!(&self.readings));
        export.insert(
            "thresholds".to_string(),
            serde_json::json!(self.thresholds.map()),
        );
        export.insert("alerts".to_string(), serde_json::json!(self.alerts.alerts()));

        let history: serde_json::Map<String, serde_json::Value> = self
            .readings
            .keys()
            .map(|sensor| {
                (
                    sensor.clone(),
                    serde_json::json!(self.history.all(sensor)),
                )
            })
            .collect();
        export.insert("history".to_string(), serde_json::Value::Object(history));

        let json = serde_json::to_string_pretty(&serde_json::Value::Object(export))?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(json.as_bytes())?;

        Ok(())
    }
}
