//! Channel identity

/// Stable identity of an output channel
///
/// Indices are handed out by [`ChannelRegistry`](super::ChannelRegistry) and
/// stay unique among live channels. The host maps them to its own outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelIndex(pub u32);

impl ChannelIndex {
    /// Channel name in `<prefix>_<index>` form, e.g. `src_3`
    pub fn name(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.0)
    }

    /// Parse a `<prefix>_<index>` name
    ///
    /// Returns `None` if the name does not follow the template.
    pub fn parse_name(name: &str, prefix: &str) -> Option<Self> {
        let digits = name.strip_prefix(prefix)?.strip_prefix('_')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(ChannelIndex)
    }
}

impl std::fmt::Display for ChannelIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ChannelIndex {
    fn from(index: u32) -> Self {
        ChannelIndex(index)
    }
}
