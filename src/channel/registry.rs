//! Channel registry
//!
//! Tracks live output channels in registration order. Registration order is
//! what the distributor uses to hand out GOP blocks, so it is preserved
//! exactly; lookups go through a separate index set.

use std::collections::HashSet;

use super::index::ChannelIndex;
use crate::error::{Result, SplitError};

/// Live channel set with watermark-based index allocation
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    /// Live channels, oldest first
    order: Vec<ChannelIndex>,
    /// Membership check for `order`
    live: HashSet<ChannelIndex>,
    /// Lowest index considered for automatic assignment
    next_index: u32,
}

impl ChannelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel
    ///
    /// With an explicit index, fails if that index is live; the watermark only
    /// moves if the index is at or above it. Without one, takes the lowest free
    /// index at or above the watermark.
    pub fn register(&mut self, requested: Option<ChannelIndex>) -> Result<ChannelIndex> {
        let index = match requested {
            Some(index) => {
                if self.live.contains(&index) {
                    return Err(SplitError::DuplicateChannel(index));
                }
                if index.0 >= self.next_index {
                    self.next_index = index.0.saturating_add(1);
                }
                index
            }
            None => {
                let mut candidate = self.next_index;
                while self.live.contains(&ChannelIndex(candidate)) {
                    candidate = candidate
                        .checked_add(1)
                        .ok_or(SplitError::ChannelsExhausted)?;
                }
                self.next_index = candidate.saturating_add(1);
                ChannelIndex(candidate)
            }
        };

        self.live.insert(index);
        self.order.push(index);
        Ok(index)
    }

    /// Remove a channel
    ///
    /// Returns false if the channel was not registered.
    pub fn unregister(&mut self, index: ChannelIndex) -> bool {
        if !self.live.remove(&index) {
            return false;
        }
        self.order.retain(|&i| i != index);
        true
    }

    /// Whether a channel is live
    pub fn contains(&self, index: ChannelIndex) -> bool {
        self.live.contains(&index)
    }

    /// Snapshot of live channels in registration order
    pub fn live_channels(&self) -> Vec<ChannelIndex> {
        self.order.clone()
    }

    /// Number of live channels
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no channel is live
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
