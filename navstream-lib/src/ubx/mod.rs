//! Binary message decoding.
//!
//! Frames are decoded into a [Message] by looking up their class and id in a fixed
//! table of known payload layouts ([LAYOUTS]). Supporting a new message requires a
//! new [Layout] entry and [Message] variant only.
mod nav;

pub use nav::*;

use serde::{Deserialize, Serialize};

use crate::framing::Frame;
use crate::{Error, Result};

pub const CLASS_NAV: u8 = 0x01;

pub const ID_NAV_POSLLH: u8 = 0x02;
pub const ID_NAV_STATUS: u8 = 0x03;
pub const ID_NAV_PVT: u8 = 0x07;

pub(crate) fn le_u16(dat: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([dat[offset], dat[offset + 1]])
}

pub(crate) fn le_u32(dat: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        dat[offset],
        dat[offset + 1],
        dat[offset + 2],
        dat[offset + 3],
    ])
}

pub(crate) fn le_i32(dat: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        dat[offset],
        dat[offset + 1],
        dat[offset + 2],
        dat[offset + 3],
    ])
}

/// A decoded binary message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Message {
    NavPvt(NavPvt),
    NavStatus(NavStatus),
    NavPosllh(NavPosllh),
    /// A message with no known layout, kept as received.
    Unknown {
        class: u8,
        id: u8,
        #[serde(with = "serde_bytes")]
        payload: Vec<u8>,
    },
}

impl Message {
    /// Conventional message name, e.g., `NAV-PVT`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Message::NavPvt(_) => "NAV-PVT",
            Message::NavStatus(_) => "NAV-STATUS",
            Message::NavPosllh(_) => "NAV-POSLLH",
            Message::Unknown { .. } => "UNKNOWN",
        }
    }

    #[must_use]
    pub fn class_id(&self) -> (u8, u8) {
        match self {
            Message::NavPvt(_) => (CLASS_NAV, ID_NAV_PVT),
            Message::NavStatus(_) => (CLASS_NAV, ID_NAV_STATUS),
            Message::NavPosllh(_) => (CLASS_NAV, ID_NAV_POSLLH),
            Message::Unknown { class, id, .. } => (*class, *id),
        }
    }
}

/// Payload layout of a recognized message.
pub struct Layout {
    pub class: u8,
    pub id: u8,
    pub name: &'static str,
    /// Minimum payload length required to decode.
    pub min_len: usize,
    decode: fn(&[u8]) -> Option<Message>,
}

fn decode_nav_pvt(dat: &[u8]) -> Option<Message> {
    NavPvt::decode(dat).map(Message::NavPvt)
}

fn decode_nav_status(dat: &[u8]) -> Option<Message> {
    NavStatus::decode(dat).map(Message::NavStatus)
}

fn decode_nav_posllh(dat: &[u8]) -> Option<Message> {
    NavPosllh::decode(dat).map(Message::NavPosllh)
}

/// All known message layouts.
pub const LAYOUTS: &[Layout] = &[
    Layout {
        class: CLASS_NAV,
        id: ID_NAV_PVT,
        name: "NAV-PVT",
        min_len: NavPvt::LEN,
        decode: decode_nav_pvt,
    },
    Layout {
        class: CLASS_NAV,
        id: ID_NAV_STATUS,
        name: "NAV-STATUS",
        min_len: NavStatus::LEN,
        decode: decode_nav_status,
    },
    Layout {
        class: CLASS_NAV,
        id: ID_NAV_POSLLH,
        name: "NAV-POSLLH",
        min_len: NavPosllh::LEN,
        decode: decode_nav_posllh,
    },
];

/// Find the layout for `class` and `id`.
#[must_use]
pub fn lookup(class: u8, id: u8) -> Option<&'static Layout> {
    LAYOUTS.iter().find(|l| l.class == class && l.id == id)
}

/// Decode a message payload.
///
/// Unrecognized class/id pairs produce [Message::Unknown].
///
/// # Errors
/// [Error::PayloadTooShort] if the pair is recognized but `payload` is smaller than its
/// layout.
pub fn decode(class: u8, id: u8, payload: &[u8]) -> Result<Message> {
    let Some(layout) = lookup(class, id) else {
        return Ok(Message::Unknown {
            class,
            id,
            payload: payload.to_vec(),
        });
    };
    let too_short = || Error::PayloadTooShort {
        kind: layout.name,
        got: payload.len(),
        want: layout.min_len,
    };
    if payload.len() < layout.min_len {
        return Err(too_short());
    }
    (layout.decode)(payload).ok_or_else(too_short)
}

/// Decode the payload of `frame`.
///
/// # Errors
/// See [decode].
pub fn decode_frame(frame: &Frame) -> Result<Message> {
    decode(frame.header.class, frame.header.id, frame.payload())
}
