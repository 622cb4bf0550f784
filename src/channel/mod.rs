//! Output channels
//!
//! Channels are identified by a [`ChannelIndex`] owned by the splitter's
//! registry. The host keeps its own mapping from index to output and exposes
//! it through [`ChannelSink`].
//!
//! ```text
//!   request_channel()          push(index, unit)
//!   ─────────────────►  ┌──────────────────────────┐
//!                       │ ChannelRegistry          │
//!                       │   order: [0, 1, 2]       │──► ChannelSink ──► host outputs
//!   release_channel()   │   next_index: 3          │
//!   ─────────────────►  └──────────────────────────┘
//! ```

pub mod index;
pub mod mpsc;
pub mod registry;
pub mod sink;

pub use index::ChannelIndex;
pub use mpsc::{ChannelEvent, MpscSink};
pub use registry::ChannelRegistry;
pub use sink::{ChannelSink, PushError};
