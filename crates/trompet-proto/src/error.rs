//! Error types for the IRC protocol crate.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Errors raised while reading or writing the IRC wire format.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Underlying socket error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line could not be parsed into a [`Message`](crate::Message).
    #[error("invalid message {string:?}: {cause}")]
    InvalidMessage {
        /// The offending line.
        string: String,
        /// Why it was rejected.
        #[source]
        cause: MessageParseError,
    },

    /// A line exceeded the configured limit.
    #[error("message too long: {actual} bytes (limit {limit})")]
    MessageTooLong {
        /// Observed length.
        actual: usize,
        /// Allowed length.
        limit: usize,
    },

    /// Outgoing data contained a character that cannot appear in an IRC line.
    #[error("illegal control character {0:?}")]
    IllegalControlChar(char),
}

/// Reasons a single line failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageParseError {
    /// Nothing but whitespace.
    #[error("empty message")]
    EmptyMessage,

    /// The command token was missing or malformed.
    #[error("invalid command")]
    InvalidCommand,

    /// A known command arrived without its mandatory parameters.
    #[error("{cmd} needs at least {needed} parameter(s)")]
    NotEnoughArguments {
        /// Command name.
        cmd: &'static str,
        /// Required parameter count.
        needed: usize,
    },

    /// The parser failed at the given offset.
    #[error("parse error at position {position}")]
    Syntax {
        /// Byte offset of the failure.
        position: usize,
    },
}
