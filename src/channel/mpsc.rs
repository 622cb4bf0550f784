//! Channel sink backed by bounded tokio mpsc queues
//!
//! Each attached channel gets its own queue. A full queue makes `push` wait,
//! which is how downstream backpressure reaches the splitter.
//!
//! End of stream travels in-band as [`ChannelEvent::EndOfStream`], so a queue
//! outlives the session and carries the next stream without re-attaching:
//!
//! ```text
//!   session 1                        session 2
//!   Unit Unit Unit EndOfStream  ──►  Unit Unit EndOfStream  ──► ...
//! ```
//!
//! The queue is closed only by [`MpscSink::detach`] (consumer's `recv()`
//! returns `None`).

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};

use super::index::ChannelIndex;
use super::sink::{ChannelSink, PushError};
use crate::media::AccessUnit;
use crate::split::SplitterConfig;

/// Item delivered on a channel queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// One distributed access unit
    Unit(AccessUnit),
    /// The current stream session is complete for this channel
    EndOfStream,
}

/// Host adapter that maps channel indices to mpsc queues
pub struct MpscSink {
    senders: RwLock<HashMap<ChannelIndex, mpsc::Sender<ChannelEvent>>>,
    capacity: usize,
}

impl MpscSink {
    /// Create a sink whose queues hold `capacity` events each
    pub fn new(capacity: usize) -> Self {
        Self {
            senders: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Create a sink using the configured queue depth
    pub fn with_config(config: &SplitterConfig) -> Self {
        Self::new(config.channel_capacity)
    }

    /// Create the queue for a channel and return its consumer side
    ///
    /// Replaces any queue previously attached under the same index. The queue
    /// stays attached across stream sessions until [`detach`](Self::detach).
    pub async fn attach(&self, channel: ChannelIndex) -> mpsc::Receiver<ChannelEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.senders.write().await.insert(channel, tx);
        rx
    }

    /// Close and drop the queue for a channel
    pub async fn detach(&self, channel: ChannelIndex) -> bool {
        self.senders.write().await.remove(&channel).is_some()
    }

    /// Number of attached queues
    pub async fn attached_count(&self) -> usize {
        self.senders.read().await.len()
    }

    async fn sender(&self, channel: ChannelIndex) -> Option<mpsc::Sender<ChannelEvent>> {
        self.senders.read().await.get(&channel).cloned()
    }
}

impl ChannelSink for MpscSink {
    async fn push(&self, channel: ChannelIndex, unit: AccessUnit) -> Result<(), PushError> {
        // Clone the sender so the map lock is not held while waiting for capacity
        let tx = self
            .sender(channel)
            .await
            .ok_or(PushError::ChannelNotFound(channel))?;

        tx.send(ChannelEvent::Unit(unit))
            .await
            .map_err(|_| PushError::ChannelClosed(channel))
    }

    async fn end_of_stream(&self, channel: ChannelIndex) {
        let Some(tx) = self.sender(channel).await else {
            return;
        };
        if tx.send(ChannelEvent::EndOfStream).await.is_err() {
            tracing::debug!(channel = %channel, "consumer gone before end of stream");
        }
    }
}
