use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::stream::Unit;
use crate::ubx::Message;
use crate::{Error, Result};

/// Tracks stats on stream decoding.
///
/// # Example
/// ```
/// use navstream::StreamDecoder;
///
/// let mut decoder = StreamDecoder::default();
/// decoder.push(b"garbage\n$GPGGA,,,,,,0,00,99.99,,,,,,*48\n");
///
/// let summary = decoder.summary();
/// assert_eq!(summary.lines, 1);
/// assert_eq!(summary.discarded_lines, 1);
/// assert_eq!(summary.sentences["GGA"], 1);
/// ```
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    /// Sentence lines handed to the parser.
    pub lines: usize,
    /// Complete lines dropped for lacking the sentence marker.
    pub discarded_lines: usize,
    /// Parsed sentences by kind.
    pub sentences: BTreeMap<String, usize>,
    pub sentence_errors: usize,
    /// Binary frames extracted.
    pub frames: usize,
    /// Decoded messages by name, including unknown messages.
    pub messages: BTreeMap<String, usize>,
    /// Unknown messages by `class-id`.
    pub unknown: BTreeMap<String, usize>,
    pub short_payloads: usize,
    pub checksum_errors: usize,
    /// Bytes dropped ahead of a sync marker.
    pub sync_dropped: usize,
    /// Bytes dropped because the buffer limit was exceeded.
    pub overflow_dropped: usize,
}

impl Summary {
    pub fn add(&mut self, zult: &Result<Unit>) {
        match zult {
            Ok(Unit::Sentence(sentence)) => {
                *self.sentences.entry(sentence.kind().to_string()).or_default() += 1;
            }
            Ok(Unit::Message(msg)) => {
                *self.messages.entry(msg.name().to_string()).or_default() += 1;
                if let Message::Unknown { class, id, .. } = msg {
                    *self
                        .unknown
                        .entry(format!("0x{class:02X}-0x{id:02X}"))
                        .or_default() += 1;
                }
            }
            Err(Error::Sentence(_)) => self.sentence_errors += 1,
            Err(Error::PayloadTooShort { .. }) => self.short_payloads += 1,
            Err(Error::ChecksumMismatch { .. }) => self.checksum_errors += 1,
            Err(_) => {}
        }
    }

    /// Total decoded units.
    #[must_use]
    pub fn units(&self) -> usize {
        self.sentences.values().sum::<usize>() + self.messages.values().sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::SentenceError;

    #[test]
    fn summary() {
        let mut summary = Summary::default();
        summary.add(&Ok(Unit::Message(Message::Unknown {
            class: 0x0a,
            id: 0x04,
            payload: vec![],
        })));
        summary.add(&Ok(Unit::Message(Message::Unknown {
            class: 0x0a,
            id: 0x04,
            payload: vec![1],
        })));
        summary.add(&Err(Error::Sentence(SentenceError::Empty)));
        summary.add(&Err(Error::PayloadTooShort {
            kind: "NAV-PVT",
            got: 1,
            want: 84,
        }));

        assert_eq!(summary.messages["UNKNOWN"], 2);
        assert_eq!(summary.unknown["0x0A-0x04"], 2);
        assert_eq!(summary.sentence_errors, 1);
        assert_eq!(summary.short_payloads, 1);
        assert_eq!(summary.units(), 2);
    }
}
