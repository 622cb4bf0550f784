//! GOP splitter engine
//!
//! The host drives the splitter through four hooks:
//!
//! - [`GopSplitter::on_unit_arrived`] for every access unit, in arrival order
//! - [`GopSplitter::on_stream_end`] once per stream
//! - [`GopSplitter::request_channel`] / [`GopSplitter::release_channel`] as
//!   downstream consumers attach and detach
//!
//! Registry and accumulator share one lock. Ingestion and registration hold it
//! briefly; distribution releases it around every push.

use tokio::sync::Mutex;

use super::config::SplitterConfig;
use super::distributor::{DistributionReport, Distributor};
use super::stats::{Counters, SplitStats};
use crate::channel::{ChannelIndex, ChannelRegistry, ChannelSink};
use crate::error::Result;
use crate::media::{AccessUnit, GopAccumulator};

/// State guarded by the splitter lock
#[derive(Debug, Default)]
pub(crate) struct SplitState {
    pub registry: ChannelRegistry,
    pub accumulator: GopAccumulator,
    pub counters: Counters,
}

/// Splits a stream into contiguous GOP blocks across output channels
pub struct GopSplitter<S> {
    state: Mutex<SplitState>,
    sink: S,
    config: SplitterConfig,
}

impl<S: ChannelSink> GopSplitter<S> {
    /// Create a splitter with default configuration
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, SplitterConfig::default())
    }

    /// Create a splitter with custom configuration
    pub fn with_config(sink: S, config: SplitterConfig) -> Self {
        Self {
            state: Mutex::new(SplitState::default()),
            sink,
            config,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Get the channel sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Accept one access unit
    ///
    /// Malformed units are dropped and reported; the stream continues.
    pub async fn on_unit_arrived(&self, unit: AccessUnit) -> Result<()> {
        let mut state = self.state.lock().await;
        let pts = unit.pts;

        match state.accumulator.ingest(unit) {
            Ok(()) => {
                state.counters.units_ingested += 1;
                Ok(())
            }
            Err(err) => {
                state.counters.units_rejected += 1;
                tracing::warn!(pts = pts, error = %err, "Dropping access unit");
                Err(err)
            }
        }
    }

    /// Close the stream and distribute everything accumulated
    ///
    /// The pending GOP list is empty afterwards whatever the outcome, and the
    /// next stream starts from a clean accumulator.
    pub async fn on_stream_end(&self) -> Result<DistributionReport> {
        let (gops, channels) = {
            let mut state = self.state.lock().await;
            let gops = state.accumulator.finalize();
            let channels = state.registry.live_channels();
            (gops, channels)
        };

        tracing::info!(
            gops = gops.len(),
            channels = channels.len(),
            "End of stream"
        );

        Distributor::new(&self.state, &self.sink, &self.config)
            .run(gops, channels)
            .await
    }

    /// Register an output channel
    ///
    /// With `Some(index)` the index is used as-is and must not be live.
    pub async fn request_channel(&self, index: Option<ChannelIndex>) -> Result<ChannelIndex> {
        let mut state = self.state.lock().await;

        match state.registry.register(index) {
            Ok(index) => {
                tracing::info!(
                    channel = %index,
                    name = %index.name(&self.config.channel_prefix),
                    channels = state.registry.len(),
                    "Channel registered"
                );
                Ok(index)
            }
            Err(err) => {
                tracing::error!(error = %err, "Channel request rejected");
                Err(err)
            }
        }
    }

    /// Register an output channel by name
    ///
    /// A name of the form `<prefix>_<n>` requests index `n`. Any other name
    /// gets the next automatic index.
    pub async fn request_channel_named(&self, name: &str) -> Result<ChannelIndex> {
        let index = ChannelIndex::parse_name(name, &self.config.channel_prefix);
        if index.is_none() {
            tracing::debug!(name = name, "Name does not match template, assigning index");
        }
        self.request_channel(index).await
    }

    /// Remove an output channel
    ///
    /// Returns false if the channel was not registered. Must not be called for
    /// a channel that is part of a running distribution pass.
    pub async fn release_channel(&self, index: ChannelIndex) -> bool {
        let mut state = self.state.lock().await;
        let removed = state.registry.unregister(index);

        if removed {
            tracing::info!(
                channel = %index,
                channels = state.registry.len(),
                "Channel released"
            );
        }
        removed
    }

    /// Live channels in registration order
    pub async fn live_channels(&self) -> Vec<ChannelIndex> {
        self.state.lock().await.registry.live_channels()
    }

    /// Current statistics
    pub async fn stats(&self) -> SplitStats {
        let state = self.state.lock().await;
        SplitStats {
            live_channels: state.registry.len(),
            pending_gops: state.accumulator.closed_count(),
            open_units: state.accumulator.open_len(),
            units_ingested: state.counters.units_ingested,
            units_rejected: state.counters.units_rejected,
            units_pushed: state.counters.units_pushed,
            units_dropped: state.counters.units_dropped,
            sessions_distributed: state.counters.sessions_distributed,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;
    use crate::channel::PushError;
    use crate::error::SplitError;

    /// Sink that records every push as (channel, pts)
    #[derive(Default)]
    struct RecordingSink {
        pushes: std::sync::Mutex<Vec<(ChannelIndex, u64)>>,
        eos: std::sync::Mutex<Vec<ChannelIndex>>,
        reject: Option<ChannelIndex>,
    }

    impl RecordingSink {
        fn rejecting(channel: ChannelIndex) -> Self {
            Self {
                reject: Some(channel),
                ..Default::default()
            }
        }

        fn pushes(&self) -> Vec<(ChannelIndex, u64)> {
            self.pushes.lock().unwrap().clone()
        }

        fn per_channel(&self) -> HashMap<ChannelIndex, Vec<u64>> {
            let mut map: HashMap<ChannelIndex, Vec<u64>> = HashMap::new();
            for (channel, pts) in self.pushes() {
                map.entry(channel).or_default().push(pts);
            }
            map
        }

        fn eos(&self) -> Vec<ChannelIndex> {
            self.eos.lock().unwrap().clone()
        }
    }

    impl ChannelSink for RecordingSink {
        async fn push(
            &self,
            channel: ChannelIndex,
            unit: AccessUnit,
        ) -> std::result::Result<(), PushError> {
            if self.reject == Some(channel) {
                return Err(PushError::Rejected("test".into()));
            }
            self.pushes.lock().unwrap().push((channel, unit.pts));
            Ok(())
        }

        async fn end_of_stream(&self, channel: ChannelIndex) {
            self.eos.lock().unwrap().push(channel);
        }
    }

    /// Feed a K/P pattern; pts is the position in the pattern
    async fn feed<S: ChannelSink>(splitter: &GopSplitter<S>, pattern: &str) {
        for (i, c) in pattern.chars().enumerate() {
            let data = Bytes::from(vec![0u8; 4]);
            let unit = if c == 'K' {
                AccessUnit::keyframe(i as u64, data)
            } else {
                AccessUnit::delta(i as u64, data)
            };
            splitter.on_unit_arrived(unit).await.unwrap();
        }
    }

    async fn with_channels(sink: RecordingSink, n: usize) -> GopSplitter<RecordingSink> {
        let splitter = GopSplitter::new(sink);
        for _ in 0..n {
            splitter.request_channel(None).await.unwrap();
        }
        splitter
    }

    fn gop_starts(units: &[u64], pattern: &str) -> Vec<u64> {
        let bytes = pattern.as_bytes();
        units
            .iter()
            .copied()
            .filter(|&pts| bytes[pts as usize] == b'K')
            .collect()
    }

    #[tokio::test]
    async fn test_ten_gops_three_channels() {
        let splitter = with_channels(RecordingSink::default(), 3).await;
        // 10 GOPs of two units each: GOP g starts at pts 2g
        let pattern = "KP".repeat(10);
        feed(&splitter, &pattern).await;

        let report = splitter.on_stream_end().await.unwrap();
        let counts: Vec<usize> = report.assignments.iter().map(|a| a.gop_count).collect();
        assert_eq!(counts, vec![3, 3, 4]);
        assert_eq!(report.idle_channels, 0);

        let per_channel = splitter.sink().per_channel();
        assert_eq!(gop_starts(&per_channel[&ChannelIndex(0)], &pattern), vec![0, 2, 4]);
        assert_eq!(gop_starts(&per_channel[&ChannelIndex(1)], &pattern), vec![6, 8, 10]);
        assert_eq!(
            gop_starts(&per_channel[&ChannelIndex(2)], &pattern),
            vec![12, 14, 16, 18]
        );
    }

    #[tokio::test]
    async fn test_two_gops_five_channels() {
        let splitter = with_channels(RecordingSink::default(), 5).await;
        feed(&splitter, "KPPKP").await;

        let report = splitter.on_stream_end().await.unwrap();
        assert_eq!(report.idle_channels, 3);

        let per_channel = splitter.sink().per_channel();
        assert_eq!(per_channel[&ChannelIndex(0)], vec![0, 1, 2]);
        assert_eq!(per_channel[&ChannelIndex(1)], vec![3, 4]);
        assert_eq!(per_channel.len(), 2);

        // Every snapshot channel still gets end of stream
        assert_eq!(splitter.sink().eos().len(), 5);
    }

    #[tokio::test]
    async fn test_no_data_touches_no_channel() {
        let splitter = with_channels(RecordingSink::default(), 3).await;

        let result = splitter.on_stream_end().await;
        assert_eq!(result, Err(SplitError::NoData));
        assert!(splitter.sink().pushes().is_empty());
        assert!(splitter.sink().eos().is_empty());
    }

    #[tokio::test]
    async fn test_no_channels_discards_gops() {
        let splitter = GopSplitter::new(RecordingSink::default());
        feed(&splitter, "KPPKPK").await;

        let result = splitter.on_stream_end().await;
        assert_eq!(result, Err(SplitError::NoChannels { discarded_gops: 3 }));

        let stats = splitter.stats().await;
        assert_eq!(stats.pending_gops, 0);
        assert_eq!(stats.open_units, 0);
        assert_eq!(stats.units_dropped, 6);

        // Nothing is left for the next stream end
        assert_eq!(
            splitter.on_stream_end().await,
            Err(SplitError::NoChannels { discarded_gops: 0 })
        );
    }

    #[tokio::test]
    async fn test_keyframe_pattern_produces_three_gops() {
        let splitter = with_channels(RecordingSink::default(), 3).await;
        feed(&splitter, "KPPKPK").await;

        splitter.on_stream_end().await.unwrap();

        let per_channel = splitter.sink().per_channel();
        assert_eq!(per_channel[&ChannelIndex(0)], vec![0, 1, 2]);
        assert_eq!(per_channel[&ChannelIndex(1)], vec![3, 4]);
        assert_eq!(per_channel[&ChannelIndex(2)], vec![5]);
    }

    #[tokio::test]
    async fn test_pushes_interleave_across_channels() {
        let splitter = with_channels(RecordingSink::default(), 2).await;
        feed(&splitter, "KKKKK").await;

        splitter.on_stream_end().await.unwrap();

        // Round 0: ch0 gop0, ch1 gop2; round 1: ch0 gop1, ch1 gop3; round 2: ch1 gop4
        let order: Vec<(u32, u64)> = splitter
            .sink()
            .pushes()
            .into_iter()
            .map(|(c, pts)| (c.0, pts))
            .collect();
        assert_eq!(order, vec![(0, 0), (1, 2), (0, 1), (1, 3), (1, 4)]);
    }

    #[tokio::test]
    async fn test_push_failure_does_not_stop_other_channels() {
        let splitter = with_channels(RecordingSink::rejecting(ChannelIndex(1)), 3).await;
        feed(&splitter, "KPKPKPKP").await;

        let result = splitter.on_stream_end().await;
        assert_eq!(result, Err(SplitError::PushFailed(vec![ChannelIndex(1)])));

        // base = 1: ch0 gets GOP 0, ch1 GOP 1, ch2 GOPs 2 and 3
        let per_channel = splitter.sink().per_channel();
        assert_eq!(per_channel[&ChannelIndex(0)], vec![0, 1]);
        assert!(!per_channel.contains_key(&ChannelIndex(1)));
        assert_eq!(per_channel[&ChannelIndex(2)], vec![4, 5, 6, 7]);
        assert_eq!(splitter.sink().eos().len(), 3);

        let stats = splitter.stats().await;
        assert_eq!(stats.units_pushed, 6);
        assert_eq!(stats.units_dropped, 2);
        assert_eq!(stats.pending_gops, 0);
    }

    #[tokio::test]
    async fn test_sessions_start_clean() {
        let splitter = with_channels(RecordingSink::default(), 1).await;

        feed(&splitter, "KP").await;
        splitter.on_stream_end().await.unwrap();
        assert_eq!(splitter.on_stream_end().await, Err(SplitError::NoData));

        feed(&splitter, "KPP").await;
        let report = splitter.on_stream_end().await.unwrap();
        assert_eq!(report.units_pushed(), 3);

        let stats = splitter.stats().await;
        assert_eq!(stats.sessions_distributed, 2);
        assert_eq!(stats.units_in_flight(), 0);
    }

    #[tokio::test]
    async fn test_invalid_unit_is_reported_and_dropped() {
        let splitter = with_channels(RecordingSink::default(), 1).await;
        feed(&splitter, "KP").await;

        let result = splitter
            .on_unit_arrived(AccessUnit::delta(9, Bytes::new()))
            .await;
        assert!(matches!(result, Err(SplitError::InvalidUnit(_))));

        let stats = splitter.stats().await;
        assert_eq!(stats.units_ingested, 2);
        assert_eq!(stats.units_rejected, 1);
        assert_eq!(stats.open_units, 2);
    }

    #[tokio::test]
    async fn test_request_channel_by_name() {
        let splitter = GopSplitter::new(RecordingSink::default());

        assert_eq!(splitter.request_channel_named("src_4").await.unwrap(), ChannelIndex(4));
        assert_eq!(
            splitter.request_channel_named("src_4").await,
            Err(SplitError::DuplicateChannel(ChannelIndex(4)))
        );
        // Not a template match: automatic index above the watermark
        assert_eq!(splitter.request_channel_named("video").await.unwrap(), ChannelIndex(5));
        assert_eq!(
            splitter.live_channels().await,
            vec![ChannelIndex(4), ChannelIndex(5)]
        );
    }

    #[tokio::test]
    async fn test_distribution_follows_registration_order() {
        let splitter = GopSplitter::new(RecordingSink::default());
        splitter.request_channel(Some(ChannelIndex(9))).await.unwrap();
        splitter.request_channel(Some(ChannelIndex(3))).await.unwrap();
        feed(&splitter, "KPKP").await;

        splitter.on_stream_end().await.unwrap();

        let per_channel = splitter.sink().per_channel();
        assert_eq!(per_channel[&ChannelIndex(9)], vec![0, 1]);
        assert_eq!(per_channel[&ChannelIndex(3)], vec![2, 3]);
    }

    #[tokio::test]
    async fn test_released_channel_excluded_from_next_pass() {
        let splitter = with_channels(RecordingSink::default(), 3).await;
        assert!(splitter.release_channel(ChannelIndex(1)).await);
        assert!(!splitter.release_channel(ChannelIndex(1)).await);
        feed(&splitter, "KKKK").await;

        splitter.on_stream_end().await.unwrap();

        let per_channel = splitter.sink().per_channel();
        assert_eq!(per_channel[&ChannelIndex(0)], vec![0, 1]);
        assert_eq!(per_channel[&ChannelIndex(2)], vec![2, 3]);
        assert_eq!(splitter.sink().eos(), vec![ChannelIndex(0), ChannelIndex(2)]);
    }

    #[tokio::test]
    async fn test_auto_request_fails_when_index_space_exhausted() {
        let splitter = GopSplitter::new(RecordingSink::default());
        let top = splitter.request_channel_named("src_4294967295").await.unwrap();
        assert_eq!(top, ChannelIndex(u32::MAX));

        assert_eq!(
            splitter.request_channel(None).await,
            Err(SplitError::ChannelsExhausted)
        );
        assert_eq!(splitter.live_channels().await, vec![top]);
    }

    /// Sink that releases a channel on the splitter from inside a push
    struct ReleasingSink {
        splitter: std::sync::OnceLock<std::sync::Weak<GopSplitter<Arc<ReleasingSink>>>>,
        pushes: std::sync::Mutex<Vec<ChannelIndex>>,
    }

    impl ChannelSink for ReleasingSink {
        async fn push(
            &self,
            channel: ChannelIndex,
            _unit: AccessUnit,
        ) -> std::result::Result<(), PushError> {
            self.pushes.lock().unwrap().push(channel);
            // Channel 0's first push releases channel 1, which still has GOPs queued
            if channel == ChannelIndex(0) {
                if let Some(splitter) = self.splitter.get().and_then(|w| w.upgrade()) {
                    splitter.release_channel(ChannelIndex(1)).await;
                }
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_lock_released_during_push() {
        let sink = Arc::new(ReleasingSink {
            splitter: std::sync::OnceLock::new(),
            pushes: std::sync::Mutex::new(Vec::new()),
        });
        let splitter = Arc::new(GopSplitter::new(Arc::clone(&sink)));
        let _ = sink.splitter.set(Arc::downgrade(&splitter));

        splitter.request_channel(None).await.unwrap();
        splitter.request_channel(None).await.unwrap();
        feed(&*splitter, "KKKK").await;

        // Would deadlock if the lock were held across push. The release takes
        // effect at channel 1's next GOP boundary, which here is its first GOP.
        let result = splitter.on_stream_end().await;
        assert_eq!(result, Err(SplitError::PushFailed(vec![ChannelIndex(1)])));
        assert!(!sink.pushes.lock().unwrap().contains(&ChannelIndex(1)));

        let stats = splitter.stats().await;
        assert_eq!(stats.units_pushed, 2);
        assert_eq!(stats.units_dropped, 2);
    }
}
