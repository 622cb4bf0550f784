//! Statistics for the splitter

/// Running counters kept under the splitter lock
#[derive(Debug, Clone, Default)]
pub(crate) struct Counters {
    pub units_ingested: u64,
    pub units_rejected: u64,
    pub units_pushed: u64,
    pub units_dropped: u64,
    pub sessions_distributed: u64,
}

/// Point-in-time view of splitter state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitStats {
    /// Number of live channels
    pub live_channels: usize,
    /// Closed GOPs waiting for end of stream
    pub pending_gops: usize,
    /// Units in the GOP currently being filled
    pub open_units: usize,
    /// Units accepted since creation
    pub units_ingested: u64,
    /// Malformed units rejected
    pub units_rejected: u64,
    /// Units handed to channels
    pub units_pushed: u64,
    /// Units discarded (no channels, failed or released channel)
    pub units_dropped: u64,
    /// Stream-end events that ran a distribution pass
    pub sessions_distributed: u64,
}

impl SplitStats {
    /// Units buffered and not yet distributed
    pub fn units_in_flight(&self) -> u64 {
        self.units_ingested
            .saturating_sub(self.units_pushed)
            .saturating_sub(self.units_dropped)
    }
}
