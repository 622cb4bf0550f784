//! Splitter configuration

/// Splitter configuration options
#[derive(Debug, Clone)]
pub struct SplitterConfig {
    /// Prefix for channel names (`<prefix>_<index>`)
    pub channel_prefix: String,

    /// Suppress per-unit push logging
    pub silent: bool,

    /// Queue depth for mpsc-backed channels
    pub channel_capacity: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            channel_prefix: "src".to_string(),
            silent: true,
            channel_capacity: 64,
        }
    }
}

impl SplitterConfig {
    /// Set the channel name prefix
    pub fn channel_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.channel_prefix = prefix.into();
        self
    }

    /// Enable or disable per-unit push logging
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Set the mpsc queue depth (at least 1)
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}
