//! Channel-based reading source.
//!
//! Receives sensor batches via a tokio watch channel. This is useful for
//! embedding the monitoring core under an external producer that pushes
//! readings rather than being polled.

use tokio::sync::watch;

use super::{ReadingSource, SensorBatch};

/// A reading source fed through a watch channel.
///
/// The producer (e.g. a test harness or an embedding application) sends
/// batches through the channel and this source hands them to the session
/// loop on each poll.
///
/// # Example
///
/// ```
/// use hydrowatch::ChannelSource;
///
/// // Create a channel pair
/// let (tx, source) = ChannelSource::create("test harness");
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: watch::Receiver<SensorBatch>,
    description: String,
    /// Track if we've returned the initial value yet
    initial_returned: bool,
}

impl ChannelSource {
    /// Create a new channel source.
    ///
    /// # Arguments
    ///
    /// * `receiver` - The receiving end of a watch channel
    /// * `source_description` - A description of where readings come from
    pub fn new(receiver: watch::Receiver<SensorBatch>, source_description: &str) -> Self {
        let description = format!("channel: {}", source_description);
        Self {
            receiver,
            description,
            initial_returned: false,
        }
    }

    /// Create a channel pair for sending batches to a ChannelSource.
    ///
    /// Returns (sender, source) where the sender can be used to push
    /// batches and the source can drive a monitoring session.
    pub fn create(source_description: &str) -> (watch::Sender<SensorBatch>, Self) {
        let (tx, rx) = watch::channel(SensorBatch::default());
        let source = Self::new(rx, source_description);
        (tx, source)
    }
}

impl ReadingSource for ChannelSource {
    fn poll(&mut self) -> Option<SensorBatch> {
        // Return the initial value on first poll
        if !self.initial_returned {
            self.initial_returned = true;
            self.receiver.mark_changed();
        }

        // Check if there's a new value without blocking
        if self.receiver.has_changed().unwrap_or(false) {
            let batch = self.receiver.borrow_and_update().clone();
            Some(batch)
        } else {
            None
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        // Producer-side failures are handled by whoever owns the sender
        None
    }
}
