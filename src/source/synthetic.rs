//! Synthetic reading generator.
//!
//! The fallback producer used when no live transport session is enabled.
//! Each poll yields a full batch of plausible greenhouse readings: a
//! nominal value per sensor plus uniform jitter. The jitter ranges
//! straddle the default thresholds, so threshold violations occur
//! organically during development.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{ReadingSource, SensorBatch};

/// Nominal value and jitter half-width per generated sensor.
const CHANNELS: &[(&str, f64, f64)] = &[
    ("temperature", 22.0, 4.0),
    ("humidity", 70.0, 10.0),
    ("ph", 6.0, 0.5),
    ("tds", 1000.0, 200.0),
    ("light", 30000.0, 10000.0),
    ("ec", 1.6, 0.4),
];

/// A reading source that fabricates sensor values.
///
/// Every poll produces a fresh batch; the caller's timer sets the cadence.
pub struct SyntheticSource {
    rng: StdRng,
    description: String,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticSource {
    /// Create a new synthetic source.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            description: "synthetic".to_string(),
        }
    }

    /// Generate one batch of readings.
    pub fn generate(&mut self) -> SensorBatch {
        CHANNELS
            .iter()
            .map(|&(sensor, nominal, jitter)| {
                let value = nominal + self.rng.random_range(-jitter..=jitter);
                (sensor.to_string(), value)
            })
            .collect()
    }
}

impl std::fmt::Debug for SyntheticSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntheticSource").finish()
    }
}

impl ReadingSource for SyntheticSource {
    fn poll(&mut self) -> Option<SensorBatch> {
        Some(self.generate())
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generates_all_channels() {
        let mut source = SyntheticSource::new();
        let batch = source.generate();

        assert_eq!(batch.len(), CHANNELS.len());
        for &(sensor, _, _) in CHANNELS {
            assert!(batch.contains_key(sensor), "missing {}", sensor);
        }
    }

    #[test]
    fn test_values_within_jitter_band() {
        let mut source = SyntheticSource::new();

        for _ in 0..50 {
            let batch = source.generate();
            for &(sensor, nominal, jitter) in CHANNELS {
                let value = batch[sensor];
                assert!(
                    (value - nominal).abs() <= jitter + f64::EPSILON,
                    "{} = {} outside {} ± {}",
                    sensor,
                    value,
                    nominal,
                    jitter
                );
            }
        }
    }

    #[test]
    fn test_poll_always_produces() {
        let mut source = SyntheticSource::new();
        assert!(source.poll().is_some());
        assert!(source.error().is_none());
        assert_eq!(source.description(), "synthetic");
    }
}
