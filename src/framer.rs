//! Line Framer: demultiplexes a raw byte stream into LF-delimited text lines,
//! or — while in binary mode — a single time-bounded blob.

use bytes::{Buf, BytesMut};
use tracing::{trace, warn};

/// Hard ceiling on how much unterminated input the text-mode buffer will
/// hold before truncating. A modem that never sends LF should not be able
/// to grow this buffer without bound.
const MAX_FRAME_SIZE: usize = 8192;

/// One unit of output from the framer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Frame {
    Line(String),
    Binary(Vec<u8>),
}

#[derive(Debug)]
struct BinaryContext {
    buffer: Vec<u8>,
}

/// Splits inbound bytes into lines (text mode) or accumulates a blob
/// (binary mode). Mode switches are driven externally by the session state
/// machine, which is the only component that knows a binary read is about
/// to happen.
#[derive(Debug)]
pub(crate) struct LineFramer {
    text_buf: BytesMut,
    binary: Option<BinaryContext>,
}

impl LineFramer {
    pub(crate) fn new() -> Self {
        Self {
            text_buf: BytesMut::with_capacity(1024),
            binary: None,
        }
    }

    pub(crate) fn in_binary_mode(&self) -> bool {
        self.binary.is_some()
    }

    /// Arms binary mode. Any bytes fed after this call accumulate into the
    /// blob instead of being split into lines. The caller races a flush
    /// timer (§4.5.1) and calls [`flush_binary`](Self::flush_binary) on
    /// expiry.
    pub(crate) fn enter_binary_mode(&mut self) {
        self.binary = Some(BinaryContext { buffer: Vec::with_capacity(1024) });
    }

    /// Feeds raw bytes into the framer, returning any complete frames they
    /// produced. In binary mode this never returns a `Frame::Binary` itself
    /// — that only happens on [`flush_binary`](Self::flush_binary) — it
    /// just accumulates.
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> Vec<Frame> {
        if let Some(ctx) = self.binary.as_mut() {
            ctx.buffer.extend_from_slice(bytes);
            return Vec::new();
        }

        self.text_buf.extend_from_slice(bytes);
        if self.text_buf.len() > MAX_FRAME_SIZE {
            warn!(
                len = self.text_buf.len(),
                "line framer buffer exceeded {MAX_FRAME_SIZE} bytes without a terminator, truncating"
            );
            self.text_buf.clear();
        }

        let mut frames = Vec::new();
        while let Some(nl) = self.text_buf.iter().position(|&b| b == b'\n') {
            let mut line = self.text_buf.split_to(nl + 1);
            line.truncate(line.len() - 1); // drop the LF; CR (if any) stays
            match std::str::from_utf8(&line) {
                Ok(s) => {
                    trace!(line = s, "framed line");
                    frames.push(Frame::Line(s.to_string()));
                }
                Err(_) => {
                    warn!("discarding non-UTF8 line from modem");
                }
            }
        }
        frames
    }

    /// Flushes the accumulated binary blob (if any) and returns to text
    /// mode. Called when the externally-owned flush timer expires.
    pub(crate) fn flush_binary(&mut self) -> Option<Vec<u8>> {
        self.binary.take().map(|ctx| ctx.buffer)
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}
