//! Push interface toward output channels
//!
//! The splitter never owns the downstream outputs. It hands each unit to the
//! host through [`ChannelSink::push`], which may wait on downstream capacity.

use std::future::Future;
use std::sync::Arc;

use super::index::ChannelIndex;
use crate::media::AccessUnit;

/// Failure to deliver a unit to one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    /// The host has no output for this index
    ChannelNotFound(ChannelIndex),
    /// The output was closed by its consumer
    ChannelClosed(ChannelIndex),
    /// The host refused the unit
    ///
    /// For host `ChannelSink` implementations that apply their own admission
    /// rules; the bundled `MpscSink` never returns it.
    Rejected(String),
}

impl std::fmt::Display for PushError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushError::ChannelNotFound(index) => write!(f, "Channel not found: {}", index),
            PushError::ChannelClosed(index) => write!(f, "Channel closed: {}", index),
            PushError::Rejected(reason) => write!(f, "Push rejected: {}", reason),
        }
    }
}

impl std::error::Error for PushError {}

/// Destination for distributed units
///
/// Implementations must be safe to call without the splitter's lock held;
/// the splitter releases its lock around every call.
pub trait ChannelSink: Send + Sync {
    /// Deliver one unit to a channel, transferring ownership
    fn push(
        &self,
        channel: ChannelIndex,
        unit: AccessUnit,
    ) -> impl Future<Output = Result<(), PushError>> + Send;

    /// Signal that a channel will receive nothing more this session
    ///
    /// The channel stays registered, so the next session may push to it again.
    fn end_of_stream(&self, channel: ChannelIndex) -> impl Future<Output = ()> + Send {
        let _ = channel;
        async {}
    }
}

impl<T: ChannelSink> ChannelSink for Arc<T> {
    fn push(
        &self,
        channel: ChannelIndex,
        unit: AccessUnit,
    ) -> impl Future<Output = Result<(), PushError>> + Send {
        (**self).push(channel, unit)
    }

    fn end_of_stream(&self, channel: ChannelIndex) -> impl Future<Output = ()> + Send {
        (**self).end_of_stream(channel)
    }
}
