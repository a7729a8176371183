//! Tokio codec turning a byte stream into [`Message`]s and back.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};
use crate::line::LineCodec;
use crate::message::Message;

/// Wraps [`LineCodec`] and parses each line.
///
/// Servers commonly send lines longer than 512 bytes once IRCv3 tags are in
/// play, so decoding uses a relaxed limit. Encoding is checked by
/// [`IrcCodec::sanitize`].
pub struct IrcCodec {
    inner: LineCodec,
}

/// Inbound limit: 512 bytes of message plus 8191 bytes of tags.
const INBOUND_MAX_LEN: usize = 512 + 8191;

impl IrcCodec {
    /// Create a codec.
    pub fn new() -> Self {
        Self {
            inner: LineCodec::with_max_len(INBOUND_MAX_LEN),
        }
    }

    /// Cut outgoing data at the first line break and reject NUL, so a
    /// caller-supplied string can never smuggle a second command.
    pub fn sanitize(mut data: String) -> error::Result<String> {
        if let Some((pos, len)) = ["\r\n", "\r", "\n"]
            .iter()
            .flat_map(|needle| data.find(needle).map(|pos| (pos, needle.len())))
            .min_by_key(|&(pos, _)| pos)
        {
            data.truncate(pos + len);
        }

        if let Some(ch) = data.chars().find(|c| *c == '\0') {
            return Err(ProtocolError::IllegalControlChar(ch));
        }
        Ok(data)
    }
}

impl Default for IrcCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for IrcCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<Message>> {
        loop {
            match self.inner.decode(src)? {
                // Blank keep-alive lines carry nothing; skip them.
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => match line.parse::<Message>() {
                    Ok(msg) => return Ok(Some(msg)),
                    // A framed stream ends after its first error, so one
                    // malformed line is dropped instead of reported.
                    Err(ProtocolError::InvalidMessage { .. }) => continue,
                    Err(e) => return Err(e),
                },
                None => return Ok(None),
            }
        }
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> error::Result<()> {
        let sanitized = Self::sanitize(msg.to_string())?;
        self.inner.encode(sanitized, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Command;

    #[test]
    fn sanitize_truncates_at_newline() {
        let result = IrcCodec::sanitize("PRIVMSG #test :hello\r\nQUIT\r\n".to_string());
        assert_eq!(result.unwrap(), "PRIVMSG #test :hello\r\n");
    }

    #[test]
    fn sanitize_rejects_nul() {
        assert!(IrcCodec::sanitize("PRIVMSG #test :hel\0lo".to_string()).is_err());
    }

    #[test]
    fn decode_skips_blank_lines() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::from("\r\nPING :x\r\n");
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg.command, Command::PING("x".into(), None));
    }

    #[test]
    fn decode_skips_malformed_lines() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::from("JOIN\r\nPING :y\r\n");
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg.command, Command::PING("y".into(), None));
    }

    #[test]
    fn encode_writes_crlf_terminated_line() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(Message::join("#a"), &mut buf).unwrap();
        assert_eq!(&buf[..], b"JOIN #a\r\n");
    }
}
