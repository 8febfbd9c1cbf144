use bytes::{Buf, Bytes, BytesMut};

/// Byte accumulator holding the unconsumed suffix of a byte stream.
///
/// Bytes are appended at the tail and consumed from the head; they are never
/// reordered or duplicated.
#[derive(Debug, Default)]
pub struct StreamBuffer {
    buf: BytesMut,
}

impl StreamBuffer {
    pub fn new() -> Self {
        StreamBuffer {
            buf: BytesMut::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        StreamBuffer {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Append `dat` to the tail of the buffer.
    pub fn append(&mut self, dat: &[u8]) {
        self.buf.extend_from_slice(dat);
    }

    /// Remove and discard the first `n` bytes.
    ///
    /// # Panics
    /// If `n` is greater than the number of buffered bytes.
    pub fn consume(&mut self, n: usize) {
        assert!(
            n <= self.buf.len(),
            "cannot consume {n} bytes from a buffer of {}",
            self.buf.len()
        );
        self.buf.advance(n);
    }

    /// Remove the first `n` bytes and return them.
    ///
    /// # Panics
    /// If `n` is greater than the number of buffered bytes.
    pub fn take(&mut self, n: usize) -> Bytes {
        assert!(
            n <= self.buf.len(),
            "cannot take {n} bytes from a buffer of {}",
            self.buf.len()
        );
        self.buf.split_to(n).freeze()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Offset of the first occurrence of `b`, if any.
    #[must_use]
    pub fn position(&self, b: u8) -> Option<usize> {
        self.buf.iter().position(|x| *x == b)
    }
}
