//! Newline-delimited framing for tokio.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};

/// Splits the byte stream at `\n` and enforces a maximum line length.
pub struct LineCodec {
    /// Index of the next byte to scan for a newline.
    next_index: usize,
    max_len: usize,
}

impl LineCodec {
    /// Codec with the standard 512 byte limit.
    pub fn new() -> Self {
        Self::with_max_len(crate::MAX_LINE_LEN)
    }

    /// Codec with a custom limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(ProtocolError::MessageTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            // Channels carry whatever encoding their users type in.
            Ok(Some(String::from_utf8_lossy(&line).into_owned()))
        } else {
            self.next_index = src.len();

            if src.len() > self.max_len {
                return Err(ProtocolError::MessageTooLong {
                    actual: src.len(),
                    limit: self.max_len,
                });
            }
            Ok(None)
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> error::Result<()> {
        dst.extend_from_slice(line.as_bytes());
        Ok(())
    }
}
