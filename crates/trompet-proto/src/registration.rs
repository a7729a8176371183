//! Sans-IO client registration.
//!
//! The machine consumes parsed messages and produces actions; it never
//! touches a socket, so the connection task stays a thin loop around it.
//!
//! ```
//! use trompet_proto::{Message, Registration, RegistrationAction, RegistrationConfig};
//!
//! let mut reg = Registration::new(RegistrationConfig {
//!     nickname: "trompet".to_string(),
//!     username: "trompet".to_string(),
//!     realname: "commit announcer".to_string(),
//!     password: None,
//! });
//! let greeting = reg.start();
//! assert_eq!(greeting.len(), 2); // NICK + USER
//!
//! let welcome: Message = ":irc.example.org 001 trompet :Welcome".parse().unwrap();
//! let actions = reg.feed(&welcome);
//! assert!(matches!(actions[0], RegistrationAction::Complete { .. }));
//! ```

use thiserror::Error;

use crate::command::Command;
use crate::message::Message;
use crate::numeric::{
    ERR_ERRONEUSNICKNAME, ERR_NICKCOLLISION, ERR_NICKNAMEINUSE, ERR_PASSWDMISMATCH, RPL_WELCOME,
};

/// Nicknames longer than this are not extended further on collision.
const MAX_NICK_LEN: usize = 30;

/// Where the session is in its lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No handshake started.
    #[default]
    Disconnected,
    /// NICK/USER sent, waiting for `RPL_WELCOME`.
    Registering,
    /// Welcome received; channels may be joined.
    Connected,
    /// The server sent `ERROR` or refused the registration.
    Terminated,
}

/// Identity sent during registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationConfig {
    /// Desired nickname.
    pub nickname: String,
    /// Username (ident).
    pub username: String,
    /// Real name / GECOS.
    pub realname: String,
    /// Server password (`PASS`), if required.
    pub password: Option<String>,
}

/// What the caller should do after feeding a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationAction {
    /// Write this message to the server.
    Send(Box<Message>),
    /// Registration finished under the given nickname.
    Complete {
        /// Nickname the server confirmed.
        nickname: String,
    },
    /// The server confirmed a nickname change.
    NickChanged {
        /// New nickname.
        nickname: String,
    },
    /// The session cannot continue.
    Error(RegistrationError),
}

/// Fatal registration outcomes.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The server refused the nickname outright.
    #[error("nickname rejected: {0}")]
    NicknameRejected(String),
    /// Wrong or missing server password.
    #[error("server password rejected")]
    PasswordMismatch,
    /// The server closed the link with `ERROR`.
    #[error("server error: {0}")]
    ServerError(String),
}

/// Client registration state machine.
#[derive(Clone, Debug)]
pub struct Registration {
    config: RegistrationConfig,
    state: ConnectionState,
    nickname: String,
}

impl Registration {
    /// New machine in [`ConnectionState::Disconnected`].
    #[must_use]
    pub fn new(config: RegistrationConfig) -> Self {
        let nickname = config.nickname.clone();
        Self {
            config,
            state: ConnectionState::Disconnected,
            nickname,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Nickname in use (or being attempted while registering).
    #[must_use]
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Begin registration; returns `PASS` (if configured), `NICK` and `USER`.
    #[must_use]
    pub fn start(&mut self) -> Vec<Message> {
        self.state = ConnectionState::Registering;
        self.nickname = self.config.nickname.clone();

        let mut out = Vec::with_capacity(3);
        if let Some(ref pass) = self.config.password {
            out.push(Command::PASS(pass.clone()).into());
        }
        out.push(Message::nick(self.nickname.clone()));
        out.push(
            Command::USER(
                self.config.username.clone(),
                "0".to_string(),
                self.config.realname.clone(),
            )
            .into(),
        );
        out
    }

    /// Feed one inbound message.
    #[must_use]
    pub fn feed(&mut self, msg: &Message) -> Vec<RegistrationAction> {
        if self.state == ConnectionState::Disconnected || self.state == ConnectionState::Terminated
        {
            return vec![];
        }

        match &msg.command {
            Command::PING(token, _) => {
                return vec![RegistrationAction::Send(Box::new(Message::pong(
                    token.clone(),
                )))];
            }
            Command::ERROR(reason) => {
                self.state = ConnectionState::Terminated;
                return vec![RegistrationAction::Error(RegistrationError::ServerError(
                    reason.clone(),
                ))];
            }
            _ => {}
        }

        match self.state {
            ConnectionState::Registering => self.handle_registering(msg),
            ConnectionState::Connected => self.handle_connected(msg),
            ConnectionState::Disconnected | ConnectionState::Terminated => vec![],
        }
    }

    fn handle_registering(&mut self, msg: &Message) -> Vec<RegistrationAction> {
        match &msg.command {
            Command::Response(RPL_WELCOME, args) => {
                if let Some(confirmed) = args.first() {
                    self.nickname = confirmed.clone();
                }
                self.state = ConnectionState::Connected;
                vec![RegistrationAction::Complete {
                    nickname: self.nickname.clone(),
                }]
            }
            Command::Response(ERR_NICKNAMEINUSE | ERR_NICKCOLLISION, _) => {
                if self.nickname.len() >= MAX_NICK_LEN {
                    self.state = ConnectionState::Terminated;
                    return vec![RegistrationAction::Error(
                        RegistrationError::NicknameRejected(self.nickname.clone()),
                    )];
                }
                self.nickname.push('_');
                vec![RegistrationAction::Send(Box::new(Message::nick(
                    self.nickname.clone(),
                )))]
            }
            Command::Response(ERR_ERRONEUSNICKNAME, _) => {
                self.state = ConnectionState::Terminated;
                vec![RegistrationAction::Error(
                    RegistrationError::NicknameRejected(self.nickname.clone()),
                )]
            }
            Command::Response(ERR_PASSWDMISMATCH, _) => {
                self.state = ConnectionState::Terminated;
                vec![RegistrationAction::Error(RegistrationError::PasswordMismatch)]
            }
            _ => vec![],
        }
    }

    fn handle_connected(&mut self, msg: &Message) -> Vec<RegistrationAction> {
        match &msg.command {
            Command::NICK(new_nick) if msg.source_nickname() == Some(self.nickname.as_str()) => {
                self.nickname = new_nick.clone();
                vec![RegistrationAction::NickChanged {
                    nickname: new_nick.clone(),
                }]
            }
            _ => vec![],
        }
    }
}
