//! IRC connection manager.
//!
//! One [`actor::NetworkActor`] task per configured network owns that
//! network's connection, nickname and joined channels. Everything else talks
//! to it through its mailbox and reads the [`LinkSnapshot`] it publishes.

pub mod actor;
pub mod backoff;
pub mod outbound;
pub mod reconcile;
pub mod stream;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{NetworkConfig, ServerAddr};
use actor::{NetworkActor, NetworkEvent};
use backoff::BackoffPolicy;

/// Everything a network connection should look like.
#[derive(Clone, PartialEq)]
pub struct NetworkSettings {
    pub servers: Vec<ServerAddr>,
    pub nickname: String,
    pub username: String,
    pub realname: String,
    pub nickserv_password: Option<String>,
    pub server_password: Option<String>,
    pub tls: bool,
    pub verify_cert: bool,
    /// Union of the channels every project wants on this network.
    pub channels: BTreeSet<String>,
    pub backoff: BackoffPolicy,
}

impl NetworkSettings {
    pub fn from_config(
        config: &NetworkConfig,
        channels: BTreeSet<String>,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            servers: config.servers.clone(),
            nickname: config.nick.clone(),
            username: config.username.clone(),
            realname: config.realname.clone(),
            nickserv_password: config.nickserv_password.clone(),
            server_password: config.password.clone(),
            tls: config.tls,
            verify_cert: config.verify_cert,
            channels,
            backoff,
        }
    }
}

impl fmt::Debug for NetworkSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkSettings")
            .field("servers", &self.servers)
            .field("nickname", &self.nickname)
            .field("tls", &self.tls)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

/// Connection state machine of one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LinkState::Disconnected => "disconnected",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
        })
    }
}

/// What a network actor last published about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub state: LinkState,
    pub server: Option<String>,
    pub nickname: String,
    /// Channels actually joined (empty while disconnected).
    pub channels: BTreeSet<String>,
}

/// Mailbox and published state of a running actor.
pub struct NetworkHandle {
    tx: mpsc::Sender<NetworkEvent>,
    status: Arc<RwLock<LinkSnapshot>>,
    task: JoinHandle<()>,
}

impl NetworkHandle {
    pub(crate) fn new(
        tx: mpsc::Sender<NetworkEvent>,
        status: Arc<RwLock<LinkSnapshot>>,
        task: JoinHandle<()>,
    ) -> Self {
        Self { tx, status, task }
    }
}

/// Result of [`NetworkManager::ensure_connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// A new actor was started and is connecting.
    Created,
    /// The running actor was handed the new settings.
    Reconfigured,
}

/// All network connections, by network name.
#[derive(Default)]
pub struct NetworkManager {
    links: DashMap<String, NetworkHandle>,
}

impl NetworkManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a connection for `network`, or reconcile the running one in place.
    pub async fn ensure_connection(
        &self,
        network: &str,
        settings: NetworkSettings,
    ) -> EnsureOutcome {
        // Clone the sender out so no map guard is held across the await.
        let existing = self.links.get(network).map(|handle| handle.tx.clone());
        if let Some(tx) = existing {
            let event = NetworkEvent::Reconfigure(Box::new(settings.clone()));
            if tx.send(event).await.is_ok() {
                return EnsureOutcome::Reconfigured;
            }
            warn!(network = %network, "network task is gone, restarting it");
            self.links.remove(network);
        }
        self.spawn(network, settings)
    }

    fn spawn(&self, network: &str, settings: NetworkSettings) -> EnsureOutcome {
        info!(network = %network, channels = settings.channels.len(), "starting network");
        let handle = NetworkActor::spawn(network.to_string(), settings);
        self.links.insert(network.to_string(), handle);
        EnsureOutcome::Created
    }

    /// Queue `text` for `channel` on `network`. Dropped (returning `false`)
    /// unless the network is connected and its mailbox has room.
    pub fn post(&self, network: &str, channel: &str, text: &str) -> bool {
        let Some(handle) = self.links.get(network) else {
            debug!(network = %network, channel = %channel, "dropped message for unknown network");
            return false;
        };
        let state = handle.status.read().state;
        if state != LinkState::Connected {
            debug!(
                network = %network,
                channel = %channel,
                state = %state,
                "dropped message, not connected"
            );
            return false;
        }
        let event = NetworkEvent::Post {
            channel: channel.to_string(),
            text: text.to_string(),
        };
        match handle.tx.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                debug!(network = %network, channel = %channel, error = %e, "dropped message");
                false
            }
        }
    }

    pub fn contains(&self, network: &str) -> bool {
        self.links.contains_key(network)
    }

    /// Last published state of `network`.
    pub fn snapshot(&self, network: &str) -> Option<LinkSnapshot> {
        self.links
            .get(network)
            .map(|handle| handle.status.read().clone())
    }

    /// Names of all running networks, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.links.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Send `QUIT` everywhere and wait (briefly) for the tasks to finish.
    pub async fn shutdown(&self) {
        for name in self.names() {
            let Some((_, handle)) = self.links.remove(&name) else {
                continue;
            };
            let _ = handle.tx.send(NetworkEvent::Shutdown).await;
            if tokio::time::timeout(Duration::from_secs(5), handle.task)
                .await
                .is_err()
            {
                warn!(network = %name, "network task did not stop in time");
            }
        }
    }
}
