//! Alert model and the threshold evaluation engine.
//!
//! The engine is the only writer of alert records. Readings are checked
//! against the configured safe ranges on every ingest; a violation
//! raises at most one active alert per sensor, classified by how far the
//! value sits past the violated bound. Resolution is an operator action
//! (`clear` / `clear_all`); a value returning to range does not resolve
//! anything on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::thresholds::ThresholdConfig;
use crate::source::unit_for;

/// Qualitative magnitude of a threshold violation.
///
/// `Info` is reserved for advisory records; evaluation only ever
/// produces `Warning` or `Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

/// Lifecycle state of an alert. Resolved is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Resolved,
}

/// A threshold violation record.
///
/// Created exclusively by [`AlertEngine::evaluate`]; consumers request
/// state transitions through the engine rather than mutating fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Creation instant in milliseconds concatenated with the sensor
    /// name, so same-millisecond batches stay collision-free.
    pub id: String,
    pub sensor: String,
    pub message: String,
    pub severity: Severity,
    pub status: AlertStatus,
    pub timestamp: DateTime<Utc>,
    /// Violating value, rounded to 2 decimal places.
    pub value: f64,
    pub unit: String,
    /// The violated range, e.g. `"18 - 28"`.
    pub threshold: String,
}

/// Fraction of the threshold span beyond which a violation is critical.
const CRITICAL_EXCESS_RATIO: f64 = 0.2;

/// Evaluates readings against thresholds and owns the alert lifecycle.
#[derive(Debug, Clone, Default)]
pub struct AlertEngine {
    /// Most-recent-first; this ordering is the externally observed one.
    alerts: Vec<Alert>,
}

impl AlertEngine {
    /// Create an engine with no alert history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check one reading against the configured thresholds.
    ///
    /// Returns the newly created alert, if this reading produced one.
    /// Unmonitored sensors, in-range values, and sensors that already
    /// have an active alert all produce nothing.
    pub fn evaluate(
        &mut self,
        sensor: &str,
        value: f64,
        timestamp: DateTime<Utc>,
        thresholds: &ThresholdConfig,
    ) -> Option<&Alert> {
        let threshold = thresholds.get(sensor)?;

        if value >= threshold.min && value <= threshold.max {
            // In range. Existing active alerts stay active until an
            // operator clears them.
            return None;
        }

        if self.active_for(sensor).is_some() {
            // Deduplication: the first violation's record stands as-is.
            return None;
        }

        let below = value < threshold.min;
        let violated_bound = if below { threshold.min } else { threshold.max };
        let excess = (value - violated_bound).abs();
        let severity = if excess > threshold.span() * CRITICAL_EXCESS_RATIO {
            Severity::Critical
        } else {
            Severity::Warning
        };

        let alert = Alert {
            id: format!("{}{}", timestamp.timestamp_millis(), sensor),
            sensor: sensor.to_string(),
            message: format!(
                "{} is {} safe threshold",
                sensor.to_uppercase(),
                if below { "below" } else { "above" }
            ),
            severity,
            status: AlertStatus::Active,
            timestamp,
            value: (value * 100.0).round() / 100.0,
            unit: unit_for(sensor).to_string(),
            threshold: threshold.describe(),
        };

        self.alerts.insert(0, alert);
        self.alerts.first()
    }

    /// Resolve the alert with this id.
    ///
    /// Unknown or already-resolved ids are a benign no-op. Resolution is
    /// terminal: a later violation creates a fresh record.
    pub fn clear(&mut self, alert_id: &str) {
        if let Some(alert) = self.alerts.iter_mut().find(|a| a.id == alert_id) {
            alert.status = AlertStatus::Resolved;
        }
    }

    /// Resolve every active alert.
    pub fn clear_all(&mut self) {
        for alert in &mut self.alerts {
            alert.status = AlertStatus::Resolved;
        }
    }

    /// All alerts, most recent first.
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    /// The active alert for a sensor, if one exists.
    pub fn active_for(&self, sensor: &str) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.sensor == sensor && a.status == AlertStatus::Active)
    }

    /// Number of currently active alerts.
    pub fn active_count(&self) -> usize {
        self.alerts.iter().filter(|a| a.status == AlertStatus::Active).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::thresholds::{Threshold, ThresholdMap};
    use chrono::TimeZone;

    fn ts(offset_secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + offset_secs, 0).unwrap()
    }

    fn config(entries: &[(&str, f64, f64)]) -> ThresholdConfig {
        let map: ThresholdMap = entries
            .iter()
            .map(|&(sensor, min, max)| (sensor.to_string(), Threshold { min, max }))
            .collect();
        ThresholdConfig::from_map(map)
    }

    #[test]
    fn test_in_range_produces_nothing() {
        let thresholds = config(&[("temperature", 18.0, 28.0)]);
        let mut engine = AlertEngine::new();

        assert!(engine.evaluate("temperature", 22.0, ts(0), &thresholds).is_none());
        assert!(engine.alerts().is_empty());
    }

    #[test]
    fn test_unmonitored_sensor_is_noop() {
        let thresholds = config(&[("temperature", 18.0, 28.0)]);
        let mut engine = AlertEngine::new();

        assert!(engine.evaluate("co2", 100000.0, ts(0), &thresholds).is_none());
        assert!(engine.alerts().is_empty());
    }

    #[test]
    fn test_violation_above_creates_warning_at_boundary() {
        // Span 10, excess 2 → exactly 20%, which is not > 20%
        let thresholds = config(&[("temperature", 18.0, 28.0)]);
        let mut engine = AlertEngine::new();

        let alert = engine.evaluate("temperature", 30.0, ts(0), &thresholds).unwrap();
        assert_eq!(alert.severity, Severity::Warning);
        assert_eq!(alert.status, AlertStatus::Active);
        assert_eq!(alert.message, "TEMPERATURE is above safe threshold");
        assert_eq!(alert.threshold, "18 - 28");
        assert_eq!(alert.unit, "°C");
        assert_eq!(alert.value, 30.0);
    }

    #[test]
    fn test_violation_far_above_is_critical() {
        // Span 10, excess 4 → 40% past the bound
        let thresholds = config(&[("temperature", 18.0, 28.0)]);
        let mut engine = AlertEngine::new();

        let alert = engine.evaluate("temperature", 32.0, ts(0), &thresholds).unwrap();
        assert_eq!(alert.severity, Severity::Critical);
    }

    #[test]
    fn test_severity_measured_from_violated_bound() {
        // Below min by 3 on a span of 10 → 30% → critical, even though
        // the distance to max is much larger.
        let thresholds = config(&[("humidity", 60.0, 70.0)]);
        let mut engine = AlertEngine::new();

        let alert = engine.evaluate("humidity", 57.0, ts(0), &thresholds).unwrap();
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.message, "HUMIDITY is below safe threshold");
    }

    #[test]
    fn test_dedup_keeps_first_violation() {
        let thresholds = config(&[("humidity", 60.0, 80.0)]);
        let mut engine = AlertEngine::new();

        assert!(engine.evaluate("humidity", 50.0, ts(0), &thresholds).is_some());
        assert!(engine.evaluate("humidity", 45.0, ts(5), &thresholds).is_none());

        // Exactly one record, frozen at the first violation
        assert_eq!(engine.alerts().len(), 1);
        let alert = &engine.alerts()[0];
        assert_eq!(alert.value, 50.0);
        assert_eq!(alert.timestamp, ts(0));
    }

    #[test]
    fn test_return_to_range_does_not_resolve() {
        let thresholds = config(&[("ph", 5.5, 6.5)]);
        let mut engine = AlertEngine::new();

        engine.evaluate("ph", 7.2, ts(0), &thresholds);
        engine.evaluate("ph", 6.0, ts(5), &thresholds);

        assert_eq!(engine.active_count(), 1);
    }

    #[test]
    fn test_clear_is_terminal_and_reviolation_creates_new_id() {
        let thresholds = config(&[("ec", 1.2, 2.0)]);
        let mut engine = AlertEngine::new();

        let first_id = engine.evaluate("ec", 2.5, ts(0), &thresholds).unwrap().id.clone();
        engine.clear(&first_id);
        assert_eq!(engine.active_count(), 0);

        // Still violating: a new record, not a reactivation
        let second_id = engine.evaluate("ec", 2.5, ts(10), &thresholds).unwrap().id.clone();
        assert_ne!(first_id, second_id);
        assert_eq!(engine.alerts().len(), 2);

        let old = engine.alerts().iter().find(|a| a.id == first_id).unwrap();
        assert_eq!(old.status, AlertStatus::Resolved);
    }

    #[test]
    fn test_clear_unknown_id_is_noop() {
        let thresholds = config(&[("ec", 1.2, 2.0)]);
        let mut engine = AlertEngine::new();
        engine.evaluate("ec", 2.5, ts(0), &thresholds);

        engine.clear("no-such-id");
        assert_eq!(engine.active_count(), 1);
    }

    #[test]
    fn test_clear_all() {
        let thresholds = config(&[("ec", 1.2, 2.0), ("ph", 5.5, 6.5)]);
        let mut engine = AlertEngine::new();
        engine.evaluate("ec", 2.5, ts(0), &thresholds);
        engine.evaluate("ph", 7.0, ts(0), &thresholds);
        assert_eq!(engine.active_count(), 2);

        engine.clear_all();
        assert_eq!(engine.active_count(), 0);
        assert_eq!(engine.alerts().len(), 2);
    }

    #[test]
    fn test_newest_first_ordering() {
        let thresholds = config(&[("ec", 1.2, 2.0), ("ph", 5.5, 6.5)]);
        let mut engine = AlertEngine::new();
        engine.evaluate("ec", 2.5, ts(0), &thresholds);
        engine.evaluate("ph", 7.0, ts(5), &thresholds);

        assert_eq!(engine.alerts()[0].sensor, "ph");
        assert_eq!(engine.alerts()[1].sensor, "ec");
    }

    #[test]
    fn test_value_rounded_to_two_decimals() {
        let thresholds = config(&[("ph", 5.5, 6.5)]);
        let mut engine = AlertEngine::new();

        let alert = engine.evaluate("ph", 7.123456, ts(0), &thresholds).unwrap();
        assert_eq!(alert.value, 7.12);
    }

    #[test]
    fn test_id_disambiguates_same_instant() {
        let thresholds = config(&[("ec", 1.2, 2.0), ("ph", 5.5, 6.5)]);
        let mut engine = AlertEngine::new();

        let a = engine.evaluate("ec", 2.5, ts(0), &thresholds).unwrap().id.clone();
        let b = engine.evaluate("ph", 7.0, ts(0), &thresholds).unwrap().id.clone();
        assert_ne!(a, b);
    }
}
