use tracing::{debug, trace};

use super::{find_sync, StreamBuffer};

/// Removes newline terminated lines from the head of a [StreamBuffer].
///
/// Only lines beginning with the sentence marker ([LineExtractor::MARKER]) are
/// returned. Other complete lines are consumed and dropped; partial lines are left
/// in the buffer until their newline arrives.
///
/// Extraction stops at a binary sync marker that comes before the next newline, so
/// newline bytes inside a binary frame never end a line. The frame must be removed
/// with a [super::FrameExtractor] before further lines are returned.
#[derive(Debug, Default)]
pub struct LineExtractor {
    /// Count of sentence lines returned.
    pub lines: usize,
    /// Count of complete lines dropped because they lacked the marker.
    pub discarded: usize,
}

impl LineExtractor {
    pub const MARKER: u8 = b'$';
    pub const DELIMITER: u8 = b'\n';

    pub fn new() -> Self {
        Self::default()
    }

    /// Return the next trimmed sentence line, or `None` once no complete line is
    /// buffered ahead of a binary frame.
    pub fn next_line(&mut self, buf: &mut StreamBuffer) -> Option<String> {
        while let Some(idx) = buf.position(Self::DELIMITER) {
            if find_sync(&buf.as_slice()[..idx]).is_some() {
                trace!(newline = idx, "sync marker ahead of newline");
                return None;
            }
            let raw = buf.take(idx + 1);
            let line = raw[..idx].trim_ascii();

            if line.first() == Some(&Self::MARKER) {
                self.lines += 1;
                let line = String::from_utf8_lossy(line).into_owned();
                trace!(%line, "line");
                return Some(line);
            }
            if !line.is_empty() {
                debug!(len = line.len(), "dropping non-sentence line");
            }
            self.discarded += 1;
        }
        None
    }
}
