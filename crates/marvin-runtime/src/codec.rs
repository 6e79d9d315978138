//! Line codec for the read loop.
//!
//! Lines end at `\n`; a trailing `\r` is trimmed and invalid UTF-8 is
//! replaced. A line longer than the limit is dropped up to its terminator
//! and reading carries on with the next one, so an oversized line never
//! ends the connection.

use std::io;

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::warn;

/// Longest line accepted from the server, terminator included.
pub const MAX_LINE_LENGTH: usize = 8192;

/// Newline-delimited, length-limited, lossy UTF-8 line decoder.
#[derive(Debug)]
pub struct LineCodec {
    /// Index of the next byte to check for a newline.
    next_index: usize,
    max_len: usize,
    /// Skipping the rest of an overlong line.
    discarding: bool,
}

impl LineCodec {
    /// Creates a codec with the default limit.
    pub fn new() -> Self {
        Self::with_max_len(MAX_LINE_LENGTH)
    }

    /// Creates a codec with a custom limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: false,
        }
    }

    fn to_line(bytes: &[u8]) -> String {
        let line = String::from_utf8_lossy(bytes);
        line.trim_end_matches(['\n', '\r']).to_string()
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<String>> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                if self.discarding {
                    src.clear();
                    self.next_index = 0;
                } else if src.len() > self.max_len {
                    warn!(length = src.len(), limit = self.max_len, "Dropping overlong line");
                    src.clear();
                    self.next_index = 0;
                    self.discarding = true;
                } else {
                    self.next_index = src.len();
                }
                return Ok(None);
            };

            let end = self.next_index + offset + 1;
            self.next_index = 0;

            if self.discarding {
                src.advance(end);
                self.discarding = false;
                continue;
            }

            let line = src.split_to(end);
            if line.len() > self.max_len {
                warn!(length = line.len(), limit = self.max_len, "Dropping overlong line");
                continue;
            }
            return Ok(Some(Self::to_line(&line)));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> io::Result<Option<String>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if self.discarding || src.is_empty() {
            self.discarding = false;
            src.clear();
            return Ok(None);
        }
        let rest = src.split();
        Ok(Some(Self::to_line(&rest)))
    }
}
