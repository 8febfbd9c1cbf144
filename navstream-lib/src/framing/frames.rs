use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::StreamBuffer;

/// Binary frame synchronization marker.
pub const SYNC: [u8; 2] = [0xB5, 0x62];

/// Offset of the first sync marker in `dat`, if any.
#[must_use]
pub fn find_sync(dat: &[u8]) -> Option<usize> {
    dat.windows(SYNC.len()).position(|w| w == SYNC)
}

/// 8-bit Fletcher checksum as carried in the last two bytes of a binary frame.
#[must_use]
pub fn fletcher8(dat: &[u8]) -> [u8; 2] {
    let (mut a, mut b) = (0u8, 0u8);
    for x in dat {
        a = a.wrapping_add(*x);
        b = b.wrapping_add(a);
    }
    [a, b]
}

/// Binary frame header: sync, class, id and little-endian payload length.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub class: u8,
    pub id: u8,
    /// Payload length in bytes, excluding header and checksum.
    pub len: u16,
}

impl FrameHeader {
    /// Size of a ``FrameHeader`` including the sync marker.
    pub const LEN: usize = 6;

    /// Decode from bytes starting at the sync marker. Returns `None` if there are not
    /// enough bytes to construct the header.
    ///
    /// The sync bytes themselves are not checked.
    #[must_use]
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::LEN {
            return None;
        }
        Some(FrameHeader {
            class: buf[2],
            id: buf[3],
            len: u16::from_le_bytes([buf[4], buf[5]]),
        })
    }

    /// Total size of the frame described by this header.
    #[must_use]
    pub fn frame_len(&self) -> usize {
        Self::LEN + self.len as usize + Frame::CHECKSUM_LEN
    }
}

/// A complete binary frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub header: FrameHeader,
    /// All frame bytes, including sync, header and checksum.
    pub data: Bytes,
}

impl Frame {
    pub const CHECKSUM_LEN: usize = 2;

    /// Construct from bytes beginning with a sync marker. Returns `None` if `dat` does
    /// not start with [SYNC] or is not exactly as long as the header declares.
    #[must_use]
    pub fn decode(dat: Bytes) -> Option<Frame> {
        if !dat.starts_with(&SYNC) {
            return None;
        }
        let header = FrameHeader::decode(&dat)?;
        if dat.len() != header.frame_len() {
            return None;
        }
        Some(Frame { header, data: dat })
    }

    /// Encode a complete frame, including a valid checksum, for `payload`.
    ///
    /// # Panics
    /// If `payload` is longer than `u16::MAX` bytes.
    #[must_use]
    pub fn encode(class: u8, id: u8, payload: &[u8]) -> Vec<u8> {
        let len = u16::try_from(payload.len()).expect("payload length must fit in u16");
        let mut dat = Vec::with_capacity(FrameHeader::LEN + payload.len() + Self::CHECKSUM_LEN);
        dat.extend_from_slice(&SYNC);
        dat.extend_from_slice(&[class, id]);
        dat.extend_from_slice(&len.to_le_bytes());
        dat.extend_from_slice(payload);
        let ck = fletcher8(&dat[SYNC.len()..]);
        dat.extend_from_slice(&ck);
        dat
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.data[FrameHeader::LEN..FrameHeader::LEN + self.header.len as usize]
    }

    /// Checksum bytes as received.
    #[must_use]
    pub fn checksum(&self) -> [u8; 2] {
        let n = self.data.len();
        [self.data[n - 2], self.data[n - 1]]
    }

    /// Checksum computed over class, id, length and payload.
    #[must_use]
    pub fn computed_checksum(&self) -> [u8; 2] {
        fletcher8(&self.data[SYNC.len()..self.data.len() - Self::CHECKSUM_LEN])
    }

    #[must_use]
    pub fn checksum_valid(&self) -> bool {
        self.checksum() == self.computed_checksum()
    }
}

/// Extracts length-framed binary frames from a [StreamBuffer].
///
/// Bytes before a discovered sync marker are dropped. A frame is only removed from the
/// buffer once all of its bytes are present; partial frames are left untouched.
#[derive(Debug, Default)]
pub struct FrameExtractor {
    /// Count of frames extracted.
    pub frames: usize,
    /// Count of bytes dropped while searching for a sync marker.
    pub dropped: usize,
}

impl FrameExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the next complete frame, or `None` if more bytes are needed.
    pub fn next_frame(&mut self, buf: &mut StreamBuffer) -> Option<Frame> {
        if buf.len() < FrameHeader::LEN {
            return None;
        }
        let idx = find_sync(buf.as_slice())?;
        if idx > 0 {
            debug!(bytes = idx, "dropping bytes before sync");
            buf.consume(idx);
            self.dropped += idx;
        }

        let header = FrameHeader::decode(buf.as_slice())?;
        let need = header.frame_len();
        if buf.len() < need {
            trace!(have = buf.len(), need, "partial frame");
            return None;
        }

        let data = buf.take(need);
        self.frames += 1;
        trace!(class = header.class, id = header.id, len = header.len, "frame");
        Some(Frame { header, data })
    }
}
