//! Dual protocol frame extraction.
//!
//! A single [StreamBuffer] receives all bytes read from a receiver. Each pass first
//! removes newline terminated text lines ([LineExtractor]) and then length-framed
//! binary frames ([FrameExtractor]) from whatever remains.
mod buffer;
mod frames;
mod lines;

pub use buffer::*;
pub use frames::*;
pub use lines::*;
