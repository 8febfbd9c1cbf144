use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::thread;
use std::time::Duration;

use derive_more::From;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use typed_builder::TypedBuilder;

use crate::framing::{Frame, FrameExtractor, FrameHeader, LineExtractor, StreamBuffer};
use crate::nmea::{NmeaParser, Sentence, SentenceParser};
use crate::summary::Summary;
use crate::ubx::{self, Message};
use crate::{Error, Result};

/// A decoded unit from either protocol.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, From)]
pub enum Unit {
    Sentence(Sentence),
    Message(Message),
}

impl Unit {
    /// Sentence kind or message name.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Unit::Sentence(s) => s.kind(),
            Unit::Message(m) => m.name(),
        }
    }
}

/// Options for a [StreamDecoder].
#[derive(TypedBuilder, Debug, Clone)]
pub struct DecoderOpts {
    /// Maximum number of bytes kept buffered between passes. When exceeded the oldest
    /// bytes are dropped. Values smaller than the largest possible frame are raised to
    /// [DecoderOpts::MIN_BUFFER].
    #[builder(default = DecoderOpts::DEFAULT_MAX_BUFFER)]
    pub max_buffer: usize,
    /// Drop binary frames whose checksum does not match.
    #[builder(default)]
    pub verify_checksum: bool,
}

impl DecoderOpts {
    pub const DEFAULT_MAX_BUFFER: usize = 128 * 1024;
    /// Size of the largest possible binary frame.
    pub const MIN_BUFFER: usize = FrameHeader::LEN + u16::MAX as usize + Frame::CHECKSUM_LEN;
}

impl Default for DecoderOpts {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Decodes an interleaved text/binary byte stream delivered in arbitrary chunks.
///
/// Every call to [StreamDecoder::push] appends the chunk to the internal buffer,
/// removes the complete text lines ahead of any binary frame, then the next complete
/// binary frame, and repeats until nothing more can be removed. Results are returned
/// in stream order.
///
/// # Example
/// ```
/// use navstream::framing::Frame;
/// use navstream::{StreamDecoder, Unit};
///
/// let mut decoder = StreamDecoder::default();
/// let frame = Frame::encode(0x01, 0x03, &[0u8; 16]);
///
/// assert!(decoder.push(&frame[..10]).is_empty());
/// let units = decoder.push(&frame[10..]);
/// assert_eq!(units.len(), 1);
/// assert!(matches!(units[0], Ok(Unit::Message(_))));
/// ```
pub struct StreamDecoder<P = NmeaParser> {
    buffer: StreamBuffer,
    lines: LineExtractor,
    frames: FrameExtractor,
    parser: P,
    opts: DecoderOpts,
    summary: Summary,
}

impl Default for StreamDecoder<NmeaParser> {
    fn default() -> Self {
        Self::new(DecoderOpts::default())
    }
}

impl StreamDecoder<NmeaParser> {
    #[must_use]
    pub fn new(opts: DecoderOpts) -> Self {
        Self::with_parser(NmeaParser, opts)
    }
}

impl<P> StreamDecoder<P>
where
    P: SentenceParser,
{
    pub fn with_parser(parser: P, mut opts: DecoderOpts) -> Self {
        opts.max_buffer = opts.max_buffer.max(DecoderOpts::MIN_BUFFER);
        StreamDecoder {
            buffer: StreamBuffer::with_capacity(4096),
            lines: LineExtractor::new(),
            frames: FrameExtractor::new(),
            parser,
            opts,
            summary: Summary::default(),
        }
    }

    /// Add `chunk` to the stream and return everything that can now be decoded, in
    /// stream order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<Unit>> {
        self.buffer.append(chunk);
        let mut ready = Vec::new();

        // Line extraction stops at a buffered frame and frame extraction drops
        // everything ahead of the next sync marker, so take one frame at a time and
        // look for lines again after each.
        loop {
            while let Some(line) = self.lines.next_line(&mut self.buffer) {
                let zult = match self.parser.parse(&line) {
                    Ok(sentence) => Ok(Unit::Sentence(sentence)),
                    Err(err) => {
                        warn!(%err, %line, "failed to parse sentence");
                        Err(Error::from(err))
                    }
                };
                self.summary.add(&zult);
                ready.push(zult);
            }

            let Some(frame) = self.frames.next_frame(&mut self.buffer) else {
                break;
            };
            let zult = self.decode_frame(&frame).map(Unit::Message);
            self.summary.add(&zult);
            ready.push(zult);
        }

        self.enforce_limit();
        self.summary.lines = self.lines.lines;
        self.summary.discarded_lines = self.lines.discarded;
        self.summary.frames = self.frames.frames;
        self.summary.sync_dropped = self.frames.dropped;

        ready
    }

    fn decode_frame(&self, frame: &Frame) -> Result<Message> {
        let FrameHeader { class, id, .. } = frame.header;
        if self.opts.verify_checksum && !frame.checksum_valid() {
            let err = Error::ChecksumMismatch {
                class,
                id,
                expected: frame.computed_checksum(),
                actual: frame.checksum(),
            };
            warn!(%err, "dropping frame");
            return Err(err);
        }
        match ubx::decode_frame(frame) {
            Ok(Message::Unknown { class, id, payload }) => {
                debug!(
                    "unhandled message class=0x{class:02X} id=0x{id:02X} len={}",
                    payload.len()
                );
                Ok(Message::Unknown { class, id, payload })
            }
            Ok(msg) => Ok(msg),
            Err(err) => {
                warn!(%err, "dropping frame");
                Err(err)
            }
        }
    }

    fn enforce_limit(&mut self) {
        let len = self.buffer.len();
        if len <= self.opts.max_buffer {
            return;
        }
        let excess = len - self.opts.max_buffer;
        warn!(
            excess,
            max = self.opts.max_buffer,
            "buffer limit exceeded; dropping oldest bytes"
        );
        self.buffer.consume(excess);
        self.summary.overflow_dropped += excess;
    }

    /// Number of bytes buffered but not yet extracted.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn summary(&self) -> &Summary {
        &self.summary
    }
}

/// Options controlling how bytes are read from a source.
#[derive(TypedBuilder, Debug, Clone)]
pub struct ReadOpts {
    /// Maximum bytes requested per read.
    #[builder(default = 1024)]
    pub chunk_size: usize,
    /// Treat a zero byte read as "no data yet" rather than end of stream.
    #[builder(default)]
    pub follow: bool,
    /// Pause after a zero byte read when following.
    #[builder(default = Duration::from_millis(10))]
    pub idle_backoff: Duration,
    /// Pause after a read error before retrying.
    #[builder(default = Duration::from_millis(100))]
    pub error_backoff: Duration,
}

impl Default for ReadOpts {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Iterator over the units decoded from a byte source. See [decode_stream].
pub struct DecodedStream<R, P = NmeaParser> {
    reader: R,
    decoder: StreamDecoder<P>,
    opts: ReadOpts,
    buf: Vec<u8>,
    ready: VecDeque<Result<Unit>>,
    done: bool,
}

impl<R, P> DecodedStream<R, P>
where
    R: Read,
    P: SentenceParser,
{
    pub fn new(reader: R, decoder: StreamDecoder<P>, opts: ReadOpts) -> Self {
        let buf = vec![0u8; opts.chunk_size.max(1)];
        DecodedStream {
            reader,
            decoder,
            opts,
            buf,
            ready: VecDeque::new(),
            done: false,
        }
    }

    /// Perform a single successful read and return the units it completed, which may
    /// be none. Returns `None` once the source is exhausted.
    ///
    /// Read errors never discard buffered bytes; the read is retried after
    /// [ReadOpts::error_backoff].
    pub fn next_chunk(&mut self) -> Option<Vec<Result<Unit>>> {
        loop {
            if self.done {
                return None;
            }
            match self.reader.read(&mut self.buf) {
                Ok(0) if self.opts.follow => thread::sleep(self.opts.idle_backoff),
                Ok(0) => {
                    if self.decoder.buffered() > 0 {
                        debug!(
                            bytes = self.decoder.buffered(),
                            "end of stream with unconsumed bytes"
                        );
                    }
                    self.done = true;
                }
                Ok(n) => return Some(self.decoder.push(&self.buf[..n])),
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => {
                    warn!(%err, "read error; retrying");
                    thread::sleep(self.opts.error_backoff);
                }
            }
        }
    }

    #[must_use]
    pub fn decoder(&self) -> &StreamDecoder<P> {
        &self.decoder
    }
}

impl<R, P> Iterator for DecodedStream<R, P>
where
    R: Read,
    P: SentenceParser,
{
    type Item = Result<Unit>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(zult) = self.ready.pop_front() {
                return Some(zult);
            }
            let chunk = self.next_chunk()?;
            self.ready.extend(chunk);
        }
    }
}

/// Return an iterator providing [Unit]s decoded from `reader`.
///
/// # Examples
/// ```
/// use navstream::{decode_stream, DecoderOpts, ReadOpts, Unit};
///
/// let dat: &[u8] = b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";
/// let units: Vec<Unit> = decode_stream(dat, DecoderOpts::default(), ReadOpts::default())
///     .filter_map(Result::ok)
///     .collect();
/// assert_eq!(units.len(), 1);
/// assert_eq!(units[0].kind(), "GGA");
/// ```
pub fn decode_stream<R>(reader: R, opts: DecoderOpts, read_opts: ReadOpts) -> DecodedStream<R>
where
    R: Read,
{
    DecodedStream::new(reader, StreamDecoder::new(opts), read_opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::SentenceError;
    use crate::ubx::{NavPosllh, CLASS_NAV, ID_NAV_POSLLH, ID_NAV_PVT, ID_NAV_STATUS};
    use std::io;

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

    fn posllh_frame(lat: i32) -> Vec<u8> {
        let llh = NavPosllh {
            itow: 0,
            lon: 85_571_250,
            lat,
            height: 450_000,
            h_msl: 0,
            h_acc: 0,
            v_acc: 0,
        };
        Frame::encode(CLASS_NAV, ID_NAV_POSLLH, &llh.encode())
    }

    #[test]
    fn line_then_frame_in_one_chunk() {
        let mut dat = format!("{GGA}\r\n").into_bytes();
        dat.extend(posllh_frame(1));
        let mut decoder = StreamDecoder::default();

        let units: Vec<Unit> = decoder.push(&dat).into_iter().map(Result::unwrap).collect();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].kind(), "GGA");
        assert_eq!(units[1].kind(), "NAV-POSLLH");
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn newline_checksum_byte_in_frame() {
        let mut payload = [0u8; 84];
        payload[24..28].copy_from_slice(&85_571_250i32.to_le_bytes());
        payload[28..32].copy_from_slice(&473_977_418i32.to_le_bytes());
        let mut dat = Frame::encode(CLASS_NAV, ID_NAV_PVT, &payload);
        let n = dat.len();
        dat[n - 2..].copy_from_slice(&[0x0a, 0x00]);
        let mut decoder = StreamDecoder::default();

        let units: Vec<Unit> = decoder.push(&dat).into_iter().map(Result::unwrap).collect();
        assert_eq!(units.len(), 1);
        let Unit::Message(Message::NavPvt(pvt)) = &units[0] else {
            panic!("expected NAV-PVT, got {:?}", units[0]);
        };
        assert_eq!(pvt.latitude(), 47.397_741_8);
        assert_eq!(pvt.longitude(), 8.557_125);
        assert_eq!(decoder.buffered(), 0);
        assert_eq!(decoder.summary().discarded_lines, 0);
    }

    #[test]
    fn newline_time_of_week_in_frame() {
        let mut payload = [0u8; 16];
        payload[0] = 0x0a;
        let dat = Frame::encode(CLASS_NAV, ID_NAV_STATUS, &payload);
        let mut decoder = StreamDecoder::default();

        let zults = decoder.push(&dat);
        assert_eq!(zults.len(), 1);
        assert!(matches!(zults[0], Ok(Unit::Message(Message::NavStatus(ref st))) if st.itow == 10));
    }

    #[test]
    fn frame_then_line_in_one_chunk() {
        let mut dat = posllh_frame(1);
        dat.extend(format!("{GGA}\r\n").into_bytes());
        dat.extend(posllh_frame(2));
        let mut decoder = StreamDecoder::default();

        let kinds: Vec<String> = decoder
            .push(&dat)
            .into_iter()
            .map(|zult| zult.unwrap().kind().to_string())
            .collect();
        assert_eq!(kinds, vec!["NAV-POSLLH", "GGA", "NAV-POSLLH"]);
        assert_eq!(decoder.summary().discarded_lines, 0);
    }

    #[test]
    fn short_payload_does_not_block_next_frame() {
        let mut dat = Frame::encode(CLASS_NAV, ID_NAV_PVT, &[0u8; 74]);
        dat.extend(posllh_frame(7));
        let mut decoder = StreamDecoder::default();

        let zults = decoder.push(&dat);
        assert_eq!(zults.len(), 2);
        assert!(matches!(
            zults[0],
            Err(Error::PayloadTooShort {
                got: 74,
                want: 84,
                ..
            })
        ));
        assert!(matches!(zults[1], Ok(Unit::Message(Message::NavPosllh(ref m))) if m.lat == 7));
        assert_eq!(decoder.summary().short_payloads, 1);
    }

    #[test]
    fn checksum_verification() {
        let mut bad = posllh_frame(1);
        let n = bad.len();
        bad[n - 2] ^= 0x55;

        let mut lenient = StreamDecoder::default();
        assert!(lenient.push(&bad)[0].is_ok());

        let mut strict = StreamDecoder::new(DecoderOpts::builder().verify_checksum(true).build());
        let zults = strict.push(&bad);
        assert!(matches!(
            zults[0],
            Err(Error::ChecksumMismatch {
                class: CLASS_NAV,
                id: ID_NAV_POSLLH,
                ..
            })
        ));
        assert!(strict.push(&posllh_frame(2))[0].is_ok());
        assert_eq!(strict.summary().checksum_errors, 1);
    }

    #[test]
    fn buffer_limit_drops_oldest() {
        let opts = DecoderOpts::builder().max_buffer(0).build();
        let mut decoder = StreamDecoder::new(opts);
        let junk = vec![0x11u8; DecoderOpts::MIN_BUFFER + 10];

        assert!(decoder.push(&junk).is_empty());
        assert_eq!(decoder.buffered(), DecoderOpts::MIN_BUFFER);
        assert_eq!(decoder.summary().overflow_dropped, 10);

        // still in sync after overflow
        let zults = decoder.push(&posllh_frame(3));
        assert_eq!(zults.len(), 1);
        assert!(zults[0].is_ok());
    }

    #[test]
    fn custom_parser() {
        let parser = |line: &str| -> std::result::Result<Sentence, SentenceError> {
            Ok(Sentence::Other {
                talker: String::new(),
                kind: line.to_string(),
                fields: vec![],
            })
        };
        let mut decoder = StreamDecoder::with_parser(parser, DecoderOpts::default());
        let zults = decoder.push(b"$ABC\n");
        assert_eq!(zults[0].as_ref().unwrap().kind(), "$ABC");
    }

    #[test]
    fn sentence_errors_are_reported() {
        let mut decoder = StreamDecoder::default();
        let zults = decoder.push(b"$GPGGA,1*00\n$GPGGA,,,,,,0,00,99.99,,,,,,*48\n");
        assert!(matches!(zults[0], Err(Error::Sentence(_))));
        assert!(zults[1].is_ok());
        assert_eq!(decoder.summary().sentence_errors, 1);
    }

    /// Fails every other read with a transient error.
    struct Flaky<'a> {
        dat: &'a [u8],
        fail: bool,
    }

    impl io::Read for Flaky<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.fail = !self.fail;
            if self.fail {
                return Err(io::Error::new(ErrorKind::Other, "flaky"));
            }
            let n = buf.len().min(3).min(self.dat.len());
            buf[..n].copy_from_slice(&self.dat[..n]);
            self.dat = &self.dat[n..];
            Ok(n)
        }
    }

    #[test]
    fn read_errors_do_not_lose_bytes() {
        let mut dat = posllh_frame(11);
        dat.extend(format!("{GGA}\n").into_bytes());
        let reader = Flaky {
            dat: &dat,
            fail: false,
        };
        let read_opts = ReadOpts::builder().error_backoff(Duration::ZERO).build();

        let units: Vec<Unit> = decode_stream(reader, DecoderOpts::default(), read_opts)
            .map(Result::unwrap)
            .collect();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].kind(), "NAV-POSLLH");
        assert_eq!(units[1].kind(), "GGA");
    }
}
