//! Contiguous GOP partitioning
//!
//! GOPs are split into one contiguous block per channel, in registration
//! order, so each channel sees a temporally contiguous slice of the stream:
//!
//! ```text
//!   10 GOPs, 3 channels (base = 3)
//!   gops:  0 1 2 | 3 4 5 | 6 7 8 9
//!          ch 0    ch 1    ch 2 (last channel takes the remainder)
//!
//!   2 GOPs, 5 channels (undersupplied)
//!   gops:  0 | 1 | - | - | -
//! ```
//!
//! Blocks are plain `(start, len)` ranges into the GOP list; nothing is moved
//! until the distributor materializes them.

use std::ops::Range;

use crate::channel::ChannelIndex;
use crate::error::{Result, SplitError};

/// GOPs assigned to one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Receiving channel
    pub channel: ChannelIndex,
    /// Offset of the first GOP in the pending list
    pub start: usize,
    /// Number of GOPs
    pub len: usize,
}

impl Block {
    /// GOP index range covered by this block
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }
}

/// Assignment of every pending GOP to exactly one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    blocks: Vec<Block>,
    idle_channels: usize,
}

impl PartitionPlan {
    /// Plan the distribution of `gop_count` GOPs over `channels`
    ///
    /// Fails with `NoChannels` if there is no channel and with `NoData` if
    /// there is nothing to distribute. Every channel gets a block, possibly
    /// empty when there are fewer GOPs than channels.
    pub fn compute(gop_count: usize, channels: &[ChannelIndex]) -> Result<Self> {
        if channels.is_empty() {
            return Err(SplitError::NoChannels {
                discarded_gops: gop_count,
            });
        }
        if gop_count == 0 {
            return Err(SplitError::NoData);
        }

        let channel_count = channels.len();

        if gop_count < channel_count {
            // One GOP each for the first channels, nothing for the rest
            let blocks = channels
                .iter()
                .enumerate()
                .map(|(i, &channel)| Block {
                    channel,
                    start: i.min(gop_count),
                    len: usize::from(i < gop_count),
                })
                .collect();

            return Ok(Self {
                blocks,
                idle_channels: channel_count - gop_count,
            });
        }

        let base = gop_count / channel_count;
        let last = channel_count - 1;
        let blocks = channels
            .iter()
            .enumerate()
            .map(|(i, &channel)| {
                let start = i * base;
                let len = if i == last { gop_count - start } else { base };
                Block {
                    channel,
                    start,
                    len,
                }
            })
            .collect();

        Ok(Self {
            blocks,
            idle_channels: 0,
        })
    }

    /// Blocks in channel registration order
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Channels left without data (fewer GOPs than channels)
    pub fn idle_channels(&self) -> usize {
        self.idle_channels
    }

    /// Whether some channels receive nothing
    pub fn is_undersupplied(&self) -> bool {
        self.idle_channels > 0
    }

    /// Largest block length, i.e. number of push rounds
    pub fn rounds(&self) -> usize {
        self.blocks.iter().map(|b| b.len).max().unwrap_or(0)
    }
}
