//! GOP distribution pass
//!
//! Runs once per end of stream. The plan is computed up front, then units are
//! pushed in rounds: round `r` pushes the `r`-th GOP of every channel that has
//! one, in registration order. Per-channel order is always the ingest order.
//!
//! The splitter lock is taken only for bookkeeping. It is dropped before every
//! `push().await` so a blocked downstream channel cannot stall registration or
//! ingestion of the next session.
//!
//! # Host contract
//!
//! Channels in the snapshot are expected to stay registered for the whole
//! pass. A channel released mid-pass is detected before its next GOP; its
//! remaining units are dropped and it is reported as failed.

use std::collections::VecDeque;

use tokio::sync::Mutex;

use super::config::SplitterConfig;
use super::partition::{Block, PartitionPlan};
use super::splitter::SplitState;
use crate::channel::{ChannelIndex, ChannelSink, PushError};
use crate::error::{Result, SplitError};
use crate::media::Gop;

/// What one channel received during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelAssignment {
    /// Receiving channel
    pub channel: ChannelIndex,
    /// Index of the first assigned GOP in stream order
    pub first_gop: usize,
    /// Number of GOPs assigned
    pub gop_count: usize,
    /// Units actually pushed
    pub units_pushed: usize,
}

/// Outcome of a successful distribution pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionReport {
    /// One entry per snapshot channel, in registration order
    pub assignments: Vec<ChannelAssignment>,
    /// Channels that received nothing because GOPs ran out
    pub idle_channels: usize,
}

impl DistributionReport {
    /// Total GOPs distributed
    pub fn gop_count(&self) -> usize {
        self.assignments.iter().map(|a| a.gop_count).sum()
    }

    /// Total units pushed
    pub fn units_pushed(&self) -> usize {
        self.assignments.iter().map(|a| a.units_pushed).sum()
    }
}

/// Per-channel progress through its block
struct Lane {
    block: Block,
    gops: VecDeque<Gop>,
    units_pushed: usize,
    units_dropped: usize,
    failure: Option<PushError>,
    /// Channel was found unregistered at a GOP boundary
    ///
    /// Liveness is checked once per GOP, not per unit, so a release that lands
    /// mid-GOP lets the rest of that GOP through.
    released: bool,
}

impl Lane {
    fn failed(&self) -> bool {
        self.failure.is_some() || self.released
    }

    fn drop_remaining(&mut self) {
        self.units_dropped += self.gops.drain(..).map(|g| g.len()).sum::<usize>();
    }
}

/// Pushes a finalized GOP list to a channel snapshot
pub(crate) struct Distributor<'a, S> {
    state: &'a Mutex<SplitState>,
    sink: &'a S,
    config: &'a SplitterConfig,
}

impl<'a, S: ChannelSink> Distributor<'a, S> {
    pub(crate) fn new(
        state: &'a Mutex<SplitState>,
        sink: &'a S,
        config: &'a SplitterConfig,
    ) -> Self {
        Self {
            state,
            sink,
            config,
        }
    }

    /// Distribute `gops` over `channels`
    ///
    /// Consumes the GOP list whatever the outcome.
    pub(crate) async fn run(
        &self,
        gops: Vec<Gop>,
        channels: Vec<ChannelIndex>,
    ) -> Result<DistributionReport> {
        let plan = match PartitionPlan::compute(gops.len(), &channels) {
            Ok(plan) => plan,
            Err(err) => {
                let units: usize = gops.iter().map(Gop::len).sum();
                drop(gops);
                match &err {
                    SplitError::NoChannels { discarded_gops } => tracing::error!(
                        gops = discarded_gops,
                        units = units,
                        "No channels, discarding pending GOPs"
                    ),
                    _ => tracing::error!("No GOPs available to distribute"),
                }
                let mut state = self.state.lock().await;
                state.counters.units_dropped += units as u64;
                return Err(err);
            }
        };

        if plan.is_undersupplied() {
            tracing::warn!(
                gops = gops.len(),
                channels = channels.len(),
                idle = plan.idle_channels(),
                "Fewer GOPs than channels, some channels receive nothing"
            );
        }

        tracing::info!(
            gops = gops.len(),
            channels = channels.len(),
            "Distributing GOPs"
        );

        // Blocks are contiguous and ordered, so they can be cut off the front
        let mut remaining = gops.into_iter();
        let mut lanes: Vec<Lane> = plan
            .blocks()
            .iter()
            .map(|&block| Lane {
                block,
                gops: remaining.by_ref().take(block.len).collect(),
                units_pushed: 0,
                units_dropped: 0,
                failure: None,
                released: false,
            })
            .collect();

        for round in 0..plan.rounds() {
            for lane in lanes.iter_mut() {
                if lane.failed() {
                    lane.drop_remaining();
                    continue;
                }
                let Some(gop) = lane.gops.pop_front() else {
                    continue;
                };

                let live = self.state.lock().await.registry.contains(lane.block.channel);
                if !live {
                    tracing::warn!(
                        channel = %lane.block.channel,
                        "Channel released during distribution, dropping its GOPs"
                    );
                    lane.released = true;
                    lane.units_dropped += gop.len();
                    lane.drop_remaining();
                    continue;
                }

                tracing::debug!(
                    channel = %lane.block.channel,
                    gop = lane.block.start + round,
                    units = gop.len(),
                    "Pushing GOP"
                );
                self.push_gop(lane, gop).await;
            }
        }

        for &channel in &channels {
            self.sink.end_of_stream(channel).await;
        }

        let pushed: usize = lanes.iter().map(|l| l.units_pushed).sum();
        let dropped: usize = lanes.iter().map(|l| l.units_dropped).sum();
        {
            let mut state = self.state.lock().await;
            state.counters.units_pushed += pushed as u64;
            state.counters.units_dropped += dropped as u64;
            state.counters.sessions_distributed += 1;
        }

        let failed: Vec<ChannelIndex> = lanes
            .iter()
            .filter(|l| l.failed())
            .map(|l| l.block.channel)
            .collect();
        if !failed.is_empty() {
            tracing::error!(
                failed = failed.len(),
                dropped_units = dropped,
                "Distribution finished with push failures"
            );
            return Err(SplitError::PushFailed(failed));
        }

        tracing::info!(units = pushed, "Distribution finished");

        Ok(DistributionReport {
            assignments: lanes
                .iter()
                .map(|l| ChannelAssignment {
                    channel: l.block.channel,
                    first_gop: l.block.start,
                    gop_count: l.block.len,
                    units_pushed: l.units_pushed,
                })
                .collect(),
            idle_channels: plan.idle_channels(),
        })
    }

    /// Push one GOP, stopping the lane at the first failure
    async fn push_gop(&self, lane: &mut Lane, gop: Gop) {
        let mut units = gop.into_units().into_iter();
        while let Some(unit) = units.next() {
            if !self.config.silent {
                tracing::debug!(channel = %lane.block.channel, pts = unit.pts, "unit pushed");
            }
            match self.sink.push(lane.block.channel, unit).await {
                Ok(()) => lane.units_pushed += 1,
                Err(err) => {
                    tracing::warn!(
                        channel = %lane.block.channel,
                        error = %err,
                        "Push failed, dropping the rest of this channel's GOPs"
                    );
                    lane.units_dropped += 1 + units.len();
                    lane.failure = Some(err);
                    lane.drop_remaining();
                    return;
                }
            }
        }
    }
}
