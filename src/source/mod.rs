//! Reading source abstraction and the sensor wire format.
//!
//! This module provides a trait-based abstraction for receiving sensor
//! readings from various producers (the synthetic generator, in-memory
//! channels, or an embedding application's own feed). The live WebSocket
//! transport lives in [`crate::transport`] since it is push-driven rather
//! than polled.

mod channel;
mod synthetic;

pub use channel::ChannelSource;
pub use synthetic::SyntheticSource;

use std::collections::BTreeMap;
use std::fmt::Debug;

/// A single update from a reading producer.
///
/// This is the top-level wire structure: one JSON text message per update,
/// mapping sensor name to its current numeric value. All readings in one
/// batch are considered simultaneous.
pub type SensorBatch = BTreeMap<String, f64>;

/// Display unit for a sensor channel.
///
/// Unknown sensors get an empty unit rather than an error; the pipeline
/// monitors whatever channels the producer sends.
pub fn unit_for(sensor: &str) -> &'static str {
    match sensor {
        "temperature" => "°C",
        "humidity" => "%",
        "tds" => "ppm",
        "light" => "lux",
        "ec" => "mS/cm",
        _ => "",
    }
}

/// Trait for receiving sensor readings from various producers.
///
/// Implementations of this trait provide reading batches from different
/// backends, either the synthetic generator or in-memory channels.
///
/// # Example
///
/// ```
/// use hydrowatch::{ReadingSource, SyntheticSource};
///
/// let mut source = SyntheticSource::new();
/// if let Some(batch) = source.poll() {
///     println!("Got {} sensors", batch.len());
/// }
/// ```
pub trait ReadingSource: Send + Debug {
    /// Poll for the latest reading batch.
    ///
    /// Returns `Some(batch)` if new data is available, `None` otherwise.
    /// This method should be non-blocking.
    fn poll(&mut self) -> Option<SensorBatch>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;

    /// Returns the error message if an error occurred during the last poll.
    fn error(&self) -> Option<String>;
}
