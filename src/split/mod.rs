//! GOP splitting
//!
//! Accumulates GOPs for a whole stream and, at end of stream, distributes them
//! across the live channels in contiguous blocks.
//!
//! # Architecture
//!
//! ```text
//!                          GopSplitter
//!                 ┌──────────────────────────────┐
//!   on_unit ────► │ Mutex<SplitState> {          │
//!   arrived       │   accumulator: open + closed │
//!                 │   registry: live channels    │
//!                 │ }                            │
//!                 └──────────────┬───────────────┘
//!                                │ on_stream_end: finalize + snapshot
//!                                ▼
//!                     PartitionPlan (start, len) per channel
//!                                │
//!                                ▼ lock dropped around each push
//!                  Distributor ──► ChannelSink::push(channel, unit)
//! ```

pub mod config;
pub mod distributor;
pub mod partition;
pub mod splitter;
pub mod stats;

pub use config::SplitterConfig;
pub use distributor::{ChannelAssignment, DistributionReport};
pub use partition::{Block, PartitionPlan};
pub use splitter::GopSplitter;
pub use stats::SplitStats;
