#![doc = include_str!("../README.md")]

mod error;
mod stream;
mod summary;

pub mod dispatch;
pub mod framing;
pub mod nmea;
pub mod ubx;

pub use error::{Error, Result};
pub use stream::{decode_stream, DecodedStream, DecoderOpts, ReadOpts, StreamDecoder, Unit};
pub use summary::Summary;
