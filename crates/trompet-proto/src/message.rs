//! Owned IRC message: optional source plus a [`Command`].

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::command::Command;
use crate::error::{MessageParseError, ProtocolError};
use crate::parser::ParsedLine;
use crate::prefix::Prefix;

/// An owned IRC message.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Message {
    /// Message source, present on everything a server relays.
    pub prefix: Option<Prefix>,
    /// The command and its parameters.
    pub command: Command,
}

impl Message {
    /// `PRIVMSG target :text`
    #[must_use]
    pub fn privmsg<T, M>(target: T, text: M) -> Self
    where
        T: Into<String>,
        M: Into<String>,
    {
        Command::PRIVMSG(target.into(), text.into()).into()
    }

    /// `JOIN channel`
    #[must_use]
    pub fn join<C: Into<String>>(channel: C) -> Self {
        Command::JOIN(channel.into(), None).into()
    }

    /// `PART channel`
    #[must_use]
    pub fn part<C: Into<String>>(channel: C) -> Self {
        Command::PART(channel.into(), None).into()
    }

    /// `NICK nickname`
    #[must_use]
    pub fn nick<N: Into<String>>(nick: N) -> Self {
        Command::NICK(nick.into()).into()
    }

    /// `PONG token`, the answer to a server `PING`.
    #[must_use]
    pub fn pong<T: Into<String>>(token: T) -> Self {
        Command::PONG(token.into(), None).into()
    }

    /// Nickname of the sender, if the source is a user.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nickname)
    }
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Message {
            prefix: None,
            command,
        }
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        let invalid = |cause| ProtocolError::InvalidMessage {
            string: s.to_owned(),
            cause,
        };

        if s.trim().is_empty() {
            return Err(invalid(MessageParseError::EmptyMessage));
        }

        let parsed = ParsedLine::parse(s)
            .map_err(|position| invalid(MessageParseError::Syntax { position }))?;
        let command =
            Command::new(parsed.command, parsed.params.into_vec()).map_err(invalid)?;

        Ok(Message {
            prefix: parsed.prefix.map(Prefix::new_from_str),
            command,
        })
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(ref prefix) = self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        write!(f, "{}\r\n", self.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_privmsg_with_source() {
        let msg: Message = ":alice!a@host PRIVMSG #dev :hi all\r\n".parse().unwrap();
        assert_eq!(msg.source_nickname(), Some("alice"));
        assert_eq!(msg.command, Command::PRIVMSG("#dev".into(), "hi all".into()));
    }

    #[test]
    fn parse_ping_without_source() {
        let msg: Message = "PING :irc.example.org\r\n".parse().unwrap();
        assert_eq!(msg.prefix, None);
        assert_eq!(msg.command, Command::PING("irc.example.org".into(), None));
    }

    #[test]
    fn parse_welcome() {
        let msg: Message = ":irc.example.org 001 trompet :Welcome to the network"
            .parse()
            .unwrap();
        assert!(matches!(msg.command, Command::Response(1, ref args) if args[0] == "trompet"));
    }

    #[test]
    fn empty_line_is_rejected() {
        let err = "\r\n".parse::<Message>().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidMessage {
                cause: MessageParseError::EmptyMessage,
                ..
            }
        ));
    }

    #[test]
    fn serialize_with_crlf() {
        assert_eq!(Message::join("#trompet").to_string(), "JOIN #trompet\r\n");
        assert_eq!(Message::pong("abc").to_string(), "PONG abc\r\n");
        assert_eq!(
            Message::privmsg("#a", "x: y").to_string(),
            "PRIVMSG #a :x: y\r\n"
        );
    }
}
