//! # trompet-proto
//!
//! The IRC client side of trompet: just enough of the protocol to register
//! with a server, join and part channels, keep the session alive and post
//! messages.
//!
//! ```rust
//! use trompet_proto::{Command, Message};
//!
//! let msg: Message = ":irc.example.org 001 trompet :Welcome".parse().unwrap();
//! assert!(matches!(msg.command, Command::Response(1, _)));
//!
//! let out = Message::privmsg("#dev", "alice pushed 3 commits");
//! assert_eq!(out.to_string(), "PRIVMSG #dev :alice pushed 3 commits\r\n");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod message;
mod parser;
pub mod prefix;
pub mod registration;

#[cfg(feature = "tokio")]
pub mod codec;
#[cfg(feature = "tokio")]
pub mod line;

pub use self::command::Command;
pub use self::error::{MessageParseError, ProtocolError};
pub use self::message::Message;
pub use self::prefix::Prefix;
pub use self::registration::{
    ConnectionState, Registration, RegistrationAction, RegistrationConfig, RegistrationError,
};

#[cfg(feature = "tokio")]
pub use self::codec::IrcCodec;
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;

/// Maximum length of an IRC line in bytes, including the trailing CRLF.
pub const MAX_LINE_LEN: usize = 512;

/// Numeric replies trompet reacts to.
pub mod numeric {
    /// `RPL_WELCOME`: registration finished.
    pub const RPL_WELCOME: u16 = 1;
    /// `ERR_ERRONEUSNICKNAME`
    pub const ERR_ERRONEUSNICKNAME: u16 = 432;
    /// `ERR_NICKNAMEINUSE`
    pub const ERR_NICKNAMEINUSE: u16 = 433;
    /// `ERR_NICKCOLLISION`
    pub const ERR_NICKCOLLISION: u16 = 436;
    /// `ERR_PASSWDMISMATCH`
    pub const ERR_PASSWDMISMATCH: u16 = 464;
}
