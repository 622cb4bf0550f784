//! Access units
//!
//! An access unit is one undecoded compressed-video frame as delivered by the
//! upstream parser (H.264 byte-stream, AU alignment). The splitter never looks
//! inside the payload; it only needs the keyframe flag to find GOP boundaries.

use bytes::Bytes;

use crate::error::{Result, SplitError};

/// One compressed video frame
///
/// The payload is moved from collection to collection and finally handed to a
/// channel sink; it is never copied by the splitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessUnit {
    /// Presentation timestamp (nanoseconds, host clock)
    pub pts: u64,
    /// Encoded frame data
    pub data: Bytes,
    /// Whether this unit can be decoded independently (IDR)
    pub is_keyframe: bool,
    /// Set on keyframes that start a new GOP
    pub discont: bool,
}

impl AccessUnit {
    /// Create a keyframe unit
    pub fn keyframe(pts: u64, data: Bytes) -> Self {
        Self {
            pts,
            data,
            is_keyframe: true,
            discont: false,
        }
    }

    /// Create a delta (non-key) unit
    pub fn delta(pts: u64, data: Bytes) -> Self {
        Self {
            pts,
            data,
            is_keyframe: false,
            discont: false,
        }
    }

    /// Size of the payload in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Check that the unit carries a payload
    pub fn validate(&self) -> Result<()> {
        if self.data.is_empty() {
            return Err(SplitError::InvalidUnit("empty payload"));
        }
        Ok(())
    }
}
