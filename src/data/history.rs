//! Historical data tracking for trend charts and analytics.
//!
//! Keeps a bounded, ordered (timestamp, value) series per sensor. The
//! view layer reads windows of this data for sparklines and trend charts;
//! the store itself only guarantees ordering and the retention cap.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Maximum number of retained samples per sensor.
pub const DEFAULT_HISTORY_CAP: usize = 100;

/// One recorded reading for a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    /// When the reading was ingested.
    pub timestamp: DateTime<Utc>,
    /// The reading value.
    pub value: f64,
}

/// Per-sensor bounded history of readings.
///
/// Samples are appended in ingestion order (the single-owner session
/// guarantees timestamps are non-decreasing) and the oldest sample is
/// evicted once a series exceeds the cap.
#[derive(Debug, Clone)]
pub struct History {
    series: BTreeMap<String, VecDeque<Sample>>,
    cap: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Create an empty history with the default retention cap.
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_HISTORY_CAP)
    }

    /// Create an empty history with a custom retention cap.
    pub fn with_cap(cap: usize) -> Self {
        Self {
            series: BTreeMap::new(),
            cap: cap.max(1),
        }
    }

    /// Append a sample for a sensor, evicting the oldest when the cap
    /// would be exceeded.
    pub fn append(&mut self, sensor: &str, timestamp: DateTime<Utc>, value: f64) {
        let samples = self.series.entry(sensor.to_string()).or_default();
        samples.push_back(Sample { timestamp, value });
        if samples.len() > self.cap {
            samples.pop_front();
        }
    }

    /// The most recent `count` samples for a sensor, oldest first.
    ///
    /// Returns all available samples when `count` exceeds the retained
    /// length; an unknown sensor yields an empty Vec.
    pub fn window(&self, sensor: &str, count: usize) -> Vec<Sample> {
        let Some(samples) = self.series.get(sensor) else {
            return Vec::new();
        };
        let skip = samples.len().saturating_sub(count);
        samples.iter().skip(skip).copied().collect()
    }

    /// The full retained series for a sensor, oldest first.
    pub fn all(&self, sensor: &str) -> Vec<Sample> {
        self.series.get(sensor).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    /// Number of retained samples for a sensor.
    pub fn len(&self, sensor: &str) -> usize {
        self.series.get(sensor).map_or(0, |s| s.len())
    }

    /// Whether any samples have been recorded at all.
    pub fn is_empty(&self) -> bool {
        self.series.values().all(|s| s.is_empty())
    }

    /// Names of all sensors with recorded history.
    pub fn sensors(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(|s| s.as_str())
    }

    /// The configured retention cap.
    pub fn cap(&self) -> usize {
        self.cap
    }
}
