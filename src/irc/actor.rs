//! The task that owns one network connection.
//!
//! # Architecture
//!
//! - **State ownership**: nickname, joined channels and connection state are
//!   only touched by the actor task.
//! - **Mailbox**: posts, reconfigurations and shutdown arrive as
//!   [`NetworkEvent`]s.
//! - **Published state**: after every change the actor writes a
//!   [`LinkSnapshot`] others may read.
//!
//! The protocol-level decisions live in [`LinkCore`], which never touches a
//! socket; [`NetworkActor`] is the I/O loop around it.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};
use trompet_proto::{
    Command, IrcCodec, Message, ProtocolError, Registration, RegistrationAction,
    RegistrationConfig,
};

use super::backoff::Backoff;
use super::outbound::privmsg_lines;
use super::reconcile::ChannelDelta;
use super::stream::{self, IrcStream};
use super::{LinkSnapshot, LinkState, NetworkHandle, NetworkSettings};
use crate::config::ServerAddr;

/// Mailbox capacity; posts beyond it are dropped.
const MAILBOX_SIZE: usize = 256;
/// How often the idle timer is checked.
const KEEPALIVE_TICK: Duration = Duration::from_secs(30);
/// Silence after which the actor pings the server.
const PING_AFTER: Duration = Duration::from_secs(180);
/// Silence after which the connection is considered dead.
const DEAD_AFTER: Duration = Duration::from_secs(300);

/// Longest a single write may stall before the connection is dropped.
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

const QUIT_MESSAGE: &str = "trompet shutting down";

#[derive(Debug, Error)]
enum WriteError {
    #[error("write stalled for {0:?}")]
    TimedOut(Duration),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Send `messages` in order, giving each at most `limit`.
async fn write_all<S, I>(sink: &mut S, messages: I, limit: Duration) -> Result<(), WriteError>
where
    S: Sink<Message, Error = ProtocolError> + Unpin,
    I: IntoIterator<Item = Message>,
{
    for msg in messages {
        tokio::time::timeout(limit, sink.send(msg))
            .await
            .map_err(|_| WriteError::TimedOut(limit))??;
    }
    Ok(())
}

/// Messages accepted by a network actor.
#[derive(Debug)]
pub enum NetworkEvent {
    /// Announce `text` in `channel`.
    Post { channel: String, text: String },
    /// Adopt new settings without dropping the connection.
    Reconfigure(Box<NetworkSettings>),
    /// Say goodbye and stop.
    Shutdown,
}

/// Connection-independent state of one network.
#[derive(Debug)]
pub(crate) struct LinkCore {
    settings: NetworkSettings,
    /// Nickname currently in use (or last requested).
    nickname: String,
    /// Nickname the last handshake asked for.
    registered_as: String,
    /// Channels actually joined.
    joined: BTreeSet<String>,
    signed_on: bool,
}

impl LinkCore {
    pub(crate) fn new(settings: NetworkSettings) -> Self {
        Self {
            nickname: settings.nickname.clone(),
            registered_as: settings.nickname.clone(),
            settings,
            joined: BTreeSet::new(),
            signed_on: false,
        }
    }

    pub(crate) fn settings(&self) -> &NetworkSettings {
        &self.settings
    }

    pub(crate) fn joined(&self) -> &BTreeSet<String> {
        &self.joined
    }

    pub(crate) fn nickname(&self) -> &str {
        &self.nickname
    }

    pub(crate) fn registration_config(&mut self) -> RegistrationConfig {
        self.registered_as = self.settings.nickname.clone();
        RegistrationConfig {
            nickname: self.settings.nickname.clone(),
            username: self.settings.username.clone(),
            realname: self.settings.realname.clone(),
            password: self.settings.server_password.clone(),
        }
    }

    /// Registration finished: catch up on a nickname configured during the
    /// handshake, identify, then join every desired channel.
    pub(crate) fn on_signed_on(&mut self, nickname: String) -> Vec<Message> {
        self.signed_on = true;
        self.nickname = nickname;

        let mut out = Vec::new();
        // A suffix added by the server on collision is not a change.
        if self.settings.nickname != self.registered_as {
            out.push(Message::nick(self.settings.nickname.clone()));
            self.nickname = self.settings.nickname.clone();
            self.registered_as = self.settings.nickname.clone();
        }
        if let Some(password) = &self.settings.nickserv_password {
            out.push(Message::privmsg("NickServ", format!("IDENTIFY {password}")));
        }
        let delta = ChannelDelta::compute(&self.joined, &self.settings.channels);
        out.extend(delta.commands());
        self.joined = self.settings.channels.clone();
        out
    }

    /// The server confirmed a nickname change.
    pub(crate) fn on_nick_changed(&mut self, nickname: String) {
        self.nickname = nickname;
    }

    pub(crate) fn on_disconnected(&mut self) {
        self.signed_on = false;
        self.joined.clear();
    }

    /// Adopt new settings. While signed on this changes the nickname and
    /// reconciles channels right away; passwords apply at the next sign-on.
    pub(crate) fn apply(&mut self, settings: NetworkSettings) -> Vec<Message> {
        let mut out = Vec::new();
        if self.signed_on {
            if settings.nickname != self.settings.nickname && settings.nickname != self.nickname {
                out.push(Message::nick(settings.nickname.clone()));
                self.nickname = settings.nickname.clone();
            }
            let delta = ChannelDelta::compute(&self.joined, &settings.channels);
            out.extend(delta.commands());
            self.joined = settings.channels.clone();
        } else {
            self.nickname = settings.nickname.clone();
        }
        self.settings = settings;
        out
    }

    /// Lines to send for an announcement; nothing unless signed on.
    pub(crate) fn post(&self, channel: &str, text: &str) -> Vec<Message> {
        if !self.signed_on {
            return Vec::new();
        }
        privmsg_lines(channel, text)
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Dropped,
    Shutdown,
}

/// Owns the connection of one network.
pub struct NetworkActor {
    network: String,
    core: LinkCore,
    rx: mpsc::Receiver<NetworkEvent>,
    status: Arc<RwLock<LinkSnapshot>>,
    backoff: Backoff,
    state: LinkState,
    server: Option<ServerAddr>,
}

impl NetworkActor {
    /// Start the actor; it connects immediately and retries forever.
    pub fn spawn(network: String, settings: NetworkSettings) -> NetworkHandle {
        let (tx, rx) = mpsc::channel(MAILBOX_SIZE);
        let status = Arc::new(RwLock::new(LinkSnapshot {
            nickname: settings.nickname.clone(),
            ..LinkSnapshot::default()
        }));

        let actor = Self {
            network,
            backoff: Backoff::new(settings.backoff),
            core: LinkCore::new(settings),
            rx,
            status: Arc::clone(&status),
            state: LinkState::Disconnected,
            server: None,
        };
        let task = tokio::spawn(actor.run());
        NetworkHandle::new(tx, status, task)
    }

    async fn run(mut self) {
        loop {
            let servers = &self.core.settings().servers;
            let Some(server) = servers.choose(&mut rand::thread_rng()).cloned() else {
                warn!(network = %self.network, "no servers configured");
                return;
            };

            self.server = Some(server.clone());
            self.set_state(LinkState::Connecting);
            info!(network = %self.network, server = %server, "connecting");

            let settings = self.core.settings();
            match stream::connect(&server, settings.tls, settings.verify_cert).await {
                Ok(stream) => {
                    let end = self.session(stream).await;
                    self.core.on_disconnected();
                    self.set_state(LinkState::Disconnected);
                    if end == SessionEnd::Shutdown {
                        info!(network = %self.network, "network stopped");
                        return;
                    }
                    info!(network = %self.network, server = %server, "disconnected");
                }
                Err(e) => {
                    self.set_state(LinkState::Disconnected);
                    warn!(network = %self.network, server = %server, error = %e, "connection failed");
                }
            }

            let delay = self.backoff.next_delay();
            info!(
                network = %self.network,
                delay_ms = delay.as_millis() as u64,
                "reconnecting after delay"
            );
            if !self.wait(delay).await {
                info!(network = %self.network, "network stopped");
                return;
            }
        }
    }

    /// Sleep between attempts while still serving the mailbox. Returns
    /// `false` on shutdown.
    async fn wait(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                event = self.rx.recv() => match event {
                    None | Some(NetworkEvent::Shutdown) => return false,
                    Some(NetworkEvent::Reconfigure(settings)) => {
                        self.reconfigure(*settings);
                    }
                    Some(NetworkEvent::Post { channel, .. }) => {
                        debug!(
                            network = %self.network,
                            channel = %channel,
                            "dropped message, not connected"
                        );
                    }
                },
            }
        }
    }

    async fn session(&mut self, stream: IrcStream) -> SessionEnd {
        let mut framed = Framed::new(stream, IrcCodec::new());
        let mut registration = Registration::new(self.core.registration_config());

        if let Err(e) = write_all(&mut framed, registration.start(), WRITE_TIMEOUT).await {
            warn!(network = %self.network, error = %e, "write failed");
            return SessionEnd::Dropped;
        }

        let mut keepalive =
            tokio::time::interval_at(Instant::now() + KEEPALIVE_TICK, KEEPALIVE_TICK);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_seen = Instant::now();
        let mut ping_sent = false;

        loop {
            let outgoing = tokio::select! {
                event = self.rx.recv() => match event {
                    None | Some(NetworkEvent::Shutdown) => {
                        let quit = Message::from(Command::QUIT(Some(QUIT_MESSAGE.to_string())));
                        let _ = write_all(&mut framed, [quit], WRITE_TIMEOUT).await;
                        return SessionEnd::Shutdown;
                    }
                    Some(NetworkEvent::Post { channel, text }) => self.core.post(&channel, &text),
                    Some(NetworkEvent::Reconfigure(settings)) => self.reconfigure(*settings),
                },
                frame = framed.next() => match frame {
                    Some(Ok(msg)) => {
                        last_seen = Instant::now();
                        ping_sent = false;
                        match self.handle_message(&mut registration, &msg) {
                            Some(out) => out,
                            None => return SessionEnd::Dropped,
                        }
                    }
                    Some(Err(e)) => {
                        warn!(network = %self.network, error = %e, "read failed");
                        return SessionEnd::Dropped;
                    }
                    None => return SessionEnd::Dropped,
                },
                _ = keepalive.tick() => {
                    let idle = last_seen.elapsed();
                    if idle >= DEAD_AFTER {
                        warn!(network = %self.network, idle_secs = idle.as_secs(), "server stopped responding");
                        return SessionEnd::Dropped;
                    }
                    if idle >= PING_AFTER && !ping_sent {
                        ping_sent = true;
                        let token = self.server.as_ref().map_or_else(String::new, |s| s.host.clone());
                        vec![Message::from(Command::PING(token, None))]
                    } else {
                        Vec::new()
                    }
                }
            };

            if let Err(e) = write_all(&mut framed, outgoing, WRITE_TIMEOUT).await {
                warn!(network = %self.network, error = %e, "write failed");
                return SessionEnd::Dropped;
            }
        }
    }

    /// React to one inbound message. `None` ends the session.
    fn handle_message(
        &mut self,
        registration: &mut Registration,
        msg: &Message,
    ) -> Option<Vec<Message>> {
        let mut out = Vec::new();
        for action in registration.feed(msg) {
            match action {
                RegistrationAction::Send(reply) => out.push(*reply),
                RegistrationAction::Complete { nickname } => {
                    info!(network = %self.network, nick = %nickname, "signed on");
                    self.backoff.reset();
                    out.extend(self.core.on_signed_on(nickname));
                    self.set_state(LinkState::Connected);
                }
                RegistrationAction::NickChanged { nickname } => {
                    info!(network = %self.network, nick = %nickname, "nickname changed");
                    self.core.on_nick_changed(nickname);
                    self.publish();
                }
                RegistrationAction::Error(e) => {
                    warn!(network = %self.network, error = %e, "session ended by server");
                    return None;
                }
            }
        }
        Some(out)
    }

    fn reconfigure(&mut self, settings: NetworkSettings) -> Vec<Message> {
        if settings.backoff != *self.backoff.policy() {
            self.backoff.set_policy(settings.backoff);
        }
        let out = self.core.apply(settings);
        if !out.is_empty() {
            info!(network = %self.network, commands = out.len(), "reconciled network");
        }
        self.publish();
        out
    }

    fn set_state(&mut self, state: LinkState) {
        if self.state != state {
            info!(network = %self.network, from = %self.state, to = %state, "link state");
        }
        self.state = state;
        self.publish();
    }

    fn publish(&self) {
        let mut status = self.status.write();
        status.state = self.state;
        status.server = self.server.as_ref().map(ToString::to_string);
        status.nickname = self.core.nickname().to_string();
        status.channels = self.core.joined().clone();
    }
}
