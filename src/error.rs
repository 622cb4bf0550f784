//! Error types
//!
//! Errors surfaced by the splitter to its host. Channel-level push failures
//! live in [`crate::channel::PushError`] and are aggregated into
//! [`SplitError::PushFailed`] once a distribution pass completes.

use crate::channel::ChannelIndex;

/// Result type for splitter operations
pub type Result<T> = std::result::Result<T, SplitError>;

/// Error type for splitter operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitError {
    /// An explicitly requested channel index is already live
    DuplicateChannel(ChannelIndex),
    /// Automatic assignment found no free index above the watermark
    ChannelsExhausted,
    /// Malformed access unit, dropped without touching state
    InvalidUnit(&'static str),
    /// Distribution ran with no live channels; pending GOPs were discarded
    NoChannels {
        /// Number of GOPs that were dropped
        discarded_gops: usize,
    },
    /// Distribution ran with nothing to distribute
    NoData,
    /// One or more channels could not accept their assigned units
    PushFailed(Vec<ChannelIndex>),
}

impl std::fmt::Display for SplitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SplitError::DuplicateChannel(index) => {
                write!(f, "Channel index is not unique: {}", index)
            }
            SplitError::ChannelsExhausted => write!(f, "No free channel index left"),
            SplitError::InvalidUnit(reason) => write!(f, "Invalid access unit: {}", reason),
            SplitError::NoChannels { discarded_gops } => {
                write!(f, "No channels to distribute to ({} GOPs discarded)", discarded_gops)
            }
            SplitError::NoData => write!(f, "No GOPs available to distribute"),
            SplitError::PushFailed(channels) => {
                write!(f, "Push failed on {} channel(s):", channels.len())?;
                for index in channels {
                    write!(f, " {}", index)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for SplitError {}
