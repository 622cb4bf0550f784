//! GOP partitioning engine
//!
//! Groups a compressed video stream into GOPs (Group of Pictures) on keyframe
//! boundaries and, at end of stream, spreads them across a dynamic set of
//! output channels as contiguously as possible.
//!
//! The host owns the actual outputs. It registers channels with
//! [`GopSplitter::request_channel`], feeds units with
//! [`GopSplitter::on_unit_arrived`], and receives data through its
//! [`ChannelSink`] implementation when [`GopSplitter::on_stream_end`] runs.
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use gopsplit::{AccessUnit, ChannelEvent, GopSplitter, MpscSink};
//!
//! # async fn run() -> gopsplit::Result<()> {
//! let splitter = GopSplitter::new(MpscSink::new(64));
//!
//! let ch = splitter.request_channel(None).await?;
//! let mut rx = splitter.sink().attach(ch).await;
//!
//! splitter
//!     .on_unit_arrived(AccessUnit::keyframe(0, Bytes::from_static(&[0x65])))
//!     .await?;
//!
//! let consumer = tokio::spawn(async move {
//!     while let Some(ChannelEvent::Unit(unit)) = rx.recv().await {
//!         println!("pts {}", unit.pts);
//!     }
//! });
//!
//! splitter.on_stream_end().await?;
//! consumer.await.ok();
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod error;
pub mod media;
pub mod split;

pub use channel::{ChannelEvent, ChannelIndex, ChannelSink, MpscSink, PushError};
pub use error::{Result, SplitError};
pub use media::{AccessUnit, Gop, GopAccumulator};
pub use split::{DistributionReport, GopSplitter, SplitStats, SplitterConfig};
