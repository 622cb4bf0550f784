//! Media handling for the splitter
//!
//! This module provides:
//! - Access unit representation
//! - GOP accumulation from a keyframe-flagged unit stream

pub mod gop;
pub mod unit;

pub use gop::{Gop, GopAccumulator};
pub use unit::AccessUnit;
