//! Per-sensor safe-range configuration.
//!
//! Holds the {min, max} bounds the alert engine evaluates readings
//! against. The whole mapping is replaced atomically on update and
//! persisted through the state store; loading falls back to built-in
//! defaults when no usable persisted state exists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persist::{StateStore, THRESHOLDS_KEY};

/// Safe range for a single sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    /// Lower bound of the safe range.
    pub min: f64,
    /// Upper bound of the safe range.
    pub max: f64,
}

impl Threshold {
    /// Width of the safe range.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Human-readable range, e.g. `"18 - 28"`.
    pub fn describe(&self) -> String {
        format!("{} - {}", self.min, self.max)
    }
}

/// The full per-sensor threshold configuration.
pub type ThresholdMap = BTreeMap<String, Threshold>;

/// Errors from the threshold update boundary.
#[derive(Debug, Error)]
pub enum ThresholdError {
    /// A threshold entry has `min >= max`.
    #[error("invalid range for {sensor}: min {min} must be below max {max}")]
    InvalidRange { sensor: String, min: f64, max: f64 },

    /// The validated configuration could not be persisted.
    #[error("failed to persist thresholds: {0}")]
    Persist(String),
}

/// Built-in defaults for the standard greenhouse sensor set.
pub fn default_thresholds() -> ThresholdMap {
    [
        ("temperature", Threshold { min: 18.0, max: 28.0 }),
        ("humidity", Threshold { min: 60.0, max: 80.0 }),
        ("ph", Threshold { min: 5.5, max: 6.5 }),
        ("tds", Threshold { min: 800.0, max: 1200.0 }),
        ("light", Threshold { min: 20000.0, max: 40000.0 }),
        ("ec", Threshold { min: 1.2, max: 2.0 }),
    ]
    .into_iter()
    .map(|(sensor, t)| (sensor.to_string(), t))
    .collect()
}

/// Check every entry satisfies `min < max`.
pub fn validate(map: &ThresholdMap) -> Result<(), ThresholdError> {
    for (sensor, threshold) in map {
        if threshold.min >= threshold.max {
            return Err(ThresholdError::InvalidRange {
                sensor: sensor.clone(),
                min: threshold.min,
                max: threshold.max,
            });
        }
    }
    Ok(())
}

/// The threshold configuration store.
///
/// Owns the in-memory mapping; reads go through [`get`](Self::get) on
/// every evaluation so an update is visible immediately.
#[derive(Debug, Clone)]
pub struct ThresholdConfig {
    map: ThresholdMap,
}

impl ThresholdConfig {
    /// Restore the configuration from the state store.
    ///
    /// Missing or unparseable persisted state falls back to the built-in
    /// defaults; neither case is fatal.
    pub fn load(store: &StateStore) -> Self {
        let map = store.get::<ThresholdMap>(THRESHOLDS_KEY).unwrap_or_else(|| {
            tracing::debug!("no persisted thresholds, using defaults");
            default_thresholds()
        });
        Self { map }
    }

    /// Start from the built-in defaults without touching storage.
    pub fn with_defaults() -> Self {
        Self {
            map: default_thresholds(),
        }
    }

    /// Wrap an existing mapping without validation or persistence.
    ///
    /// Intended for embedding and tests; the update boundary is
    /// [`update`](Self::update).
    pub fn from_map(map: ThresholdMap) -> Self {
        Self { map }
    }

    /// Configured bounds for a sensor, if any.
    pub fn get(&self, sensor: &str) -> Option<Threshold> {
        self.map.get(sensor).copied()
    }

    /// The full current mapping.
    pub fn map(&self) -> &ThresholdMap {
        &self.map
    }

    /// Replace the entire configuration and persist it.
    ///
    /// Every entry is validated first; on any failure the in-memory map
    /// and the persisted entry are left untouched.
    pub fn update(
        &mut self,
        new_map: ThresholdMap,
        store: &StateStore,
    ) -> Result<(), ThresholdError> {
        validate(&new_map)?;
        store
            .put(THRESHOLDS_KEY, &new_map)
            .map_err(|e| ThresholdError::Persist(e.to_string()))?;
        self.map = new_map;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, StateStore) {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_defaults_are_valid() {
        let defaults = default_thresholds();
        assert_eq!(defaults.len(), 6);
        assert!(validate(&defaults).is_ok());
        assert_eq!(defaults["temperature"], Threshold { min: 18.0, max: 28.0 });
    }

    #[test]
    fn test_describe() {
        let t = Threshold { min: 18.0, max: 28.0 };
        assert_eq!(t.describe(), "18 - 28");
        let t = Threshold { min: 5.5, max: 6.5 };
        assert_eq!(t.describe(), "5.5 - 6.5");
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let (_dir, store) = store();
        let config = ThresholdConfig::load(&store);
        assert_eq!(config.map(), &default_thresholds());
    }

    #[test]
    fn test_load_falls_back_on_corrupt_state() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("sensor-thresholds.json"), "{not json").unwrap();

        let config = ThresholdConfig::load(&store);
        assert_eq!(config.map(), &default_thresholds());
    }

    #[test]
    fn test_update_round_trips_through_store() {
        let (_dir, store) = store();
        let mut config = ThresholdConfig::load(&store);

        let mut new_map = ThresholdMap::new();
        new_map.insert("temperature".to_string(), Threshold { min: 20.0, max: 25.0 });
        config.update(new_map.clone(), &store).unwrap();

        // Simulated restart
        let reloaded = ThresholdConfig::load(&store);
        assert_eq!(reloaded.map(), &new_map);
    }

    #[test]
    fn test_update_rejects_inverted_range() {
        let (_dir, store) = store();
        let mut config = ThresholdConfig::load(&store);

        let mut bad = config.map().clone();
        bad.insert("ph".to_string(), Threshold { min: 6.5, max: 5.5 });

        let err = config.update(bad, &store).unwrap_err();
        assert!(matches!(err, ThresholdError::InvalidRange { ref sensor, .. } if sensor == "ph"));

        // In-memory and persisted state both untouched
        assert_eq!(config.get("ph"), Some(Threshold { min: 5.5, max: 6.5 }));
        let reloaded = ThresholdConfig::load(&store);
        assert_eq!(reloaded.map(), &default_thresholds());
    }

    #[test]
    fn test_update_rejects_empty_range() {
        let (_dir, store) = store();
        let mut config = ThresholdConfig::load(&store);

        let mut bad = ThresholdMap::new();
        bad.insert("ec".to_string(), Threshold { min: 1.5, max: 1.5 });

        assert!(config.update(bad, &store).is_err());
    }
}
