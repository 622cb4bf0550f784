//! GOP (Group of Pictures) accumulation
//!
//! Units arrive in decode order. Every keyframe closes the group that is
//! currently open and starts a new one:
//!
//! ```text
//!   K P P K P K        (K = keyframe, P = delta)
//!   └─┬─┘ └┬┘ │
//!   gop 0 gop 1 gop 2  (gop 2 is closed by finalize())
//! ```
//!
//! The first group may start with a delta unit if the stream did not begin on
//! a keyframe. Every other group starts with a keyframe.

use super::unit::AccessUnit;
use crate::error::Result;

/// A closed group of access units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gop {
    units: Vec<AccessUnit>,
}

impl Gop {
    fn new(units: Vec<AccessUnit>) -> Self {
        debug_assert!(!units.is_empty());
        Self { units }
    }

    /// Units in this GOP, in arrival order
    pub fn units(&self) -> &[AccessUnit] {
        &self.units
    }

    /// Number of units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Always false for a closed GOP
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Whether the GOP begins on a keyframe
    pub fn starts_with_keyframe(&self) -> bool {
        self.units.first().map(|u| u.is_keyframe).unwrap_or(false)
    }

    /// Timestamp of the first and last unit
    pub fn pts_range(&self) -> Option<(u64, u64)> {
        match (self.units.first(), self.units.last()) {
            (Some(first), Some(last)) => Some((first.pts, last.pts)),
            _ => None,
        }
    }

    /// Total payload size in bytes
    pub fn size(&self) -> usize {
        self.units.iter().map(AccessUnit::size).sum()
    }

    /// Take ownership of the units
    pub fn into_units(self) -> Vec<AccessUnit> {
        self.units
    }
}

/// Splits an incoming unit sequence into GOPs
#[derive(Debug, Default)]
pub struct GopAccumulator {
    /// Group currently being filled
    open: Vec<AccessUnit>,
    /// Closed groups waiting for end of stream
    closed: Vec<Gop>,
}

impl GopAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit
    ///
    /// A keyframe closes the open group (if any) and becomes the first unit of
    /// the next one. Malformed units are rejected without touching state.
    pub fn ingest(&mut self, mut unit: AccessUnit) -> Result<()> {
        unit.validate()?;

        if unit.is_keyframe {
            unit.discont = true;
            if !self.open.is_empty() {
                self.close_open();
            }
        }

        tracing::trace!(pts = unit.pts, keyframe = unit.is_keyframe, "unit arrived");
        self.open.push(unit);
        Ok(())
    }

    /// Close the open group and drain every closed group
    ///
    /// Leaves the accumulator empty. Calling it again without new input
    /// returns an empty list.
    pub fn finalize(&mut self) -> Vec<Gop> {
        if !self.open.is_empty() {
            self.close_open();
        }
        std::mem::take(&mut self.closed)
    }

    /// Number of closed groups
    pub fn closed_count(&self) -> usize {
        self.closed.len()
    }

    /// Number of units in the open group
    pub fn open_len(&self) -> usize {
        self.open.len()
    }

    /// Whether there is nothing buffered
    pub fn is_empty(&self) -> bool {
        self.open.is_empty() && self.closed.is_empty()
    }

    fn close_open(&mut self) {
        let units = std::mem::take(&mut self.open);
        self.closed.push(Gop::new(units));
        tracing::debug!(
            gop = self.closed.len(),
            units = self.closed.last().map(Gop::len).unwrap_or(0),
            "gop closed"
        );
    }
}
