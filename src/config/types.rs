//! Core configuration structures.

use std::collections::{BTreeMap, BTreeSet};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use super::defaults::*;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// HTTP listener for webhooks.
    #[serde(default)]
    pub web: WebConfig,
    /// Reconnect backoff shared by all networks.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// IRC networks by name.
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,
    /// Projects by name.
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectConfig>,
}

impl Config {
    /// Load a configuration file.
    ///
    /// Files ending in `.json` are parsed as JSON, everything else as TOML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };
        Ok(config)
    }

    /// Union of the channels every project requests, keyed by network.
    ///
    /// Every declared network has an entry, even when no project routes to it.
    pub fn desired_channels(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut desired: BTreeMap<String, BTreeSet<String>> = self
            .networks
            .keys()
            .map(|name| (name.clone(), BTreeSet::new()))
            .collect();
        for project in self.projects.values() {
            for (network, channels) in &project.channels {
                desired
                    .entry(network.clone())
                    .or_default()
                    .extend(channels.iter().cloned());
            }
        }
        desired
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: IpAddr,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_web_port(),
        }
    }
}

impl WebConfig {
    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

/// Reconnect backoff parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
    #[serde(default = "default_backoff_factor")]
    pub factor: f64,
    /// Relative jitter applied to every delay, `0.1` meaning ±10%.
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_secs: default_max_delay_secs(),
            factor: default_backoff_factor(),
            jitter: default_jitter(),
        }
    }
}

impl ReconnectConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }
}

/// One IRC network.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Candidate servers; one is picked at random per connection attempt.
    pub servers: Vec<ServerAddr>,
    pub nick: String,
    /// Sent to NickServ as `IDENTIFY <password>` after sign-on.
    #[serde(default, rename = "nickserv-password", alias = "nickserv_password")]
    pub nickserv_password: Option<String>,
    /// Server password (`PASS`).
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_realname")]
    pub realname: String,
    #[serde(default)]
    pub tls: bool,
    #[serde(default = "default_true")]
    pub verify_cert: bool,
}

/// A `host`/`port` pair.
///
/// Accepts `["irc.example.org", 6667]`, `"irc.example.org:6667"` or
/// `{ host = "irc.example.org", port = 6667 }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "ServerEntry")]
pub struct ServerAddr {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ServerEntry {
    Pair(String, u16),
    Address(String),
    Table {
        host: String,
        #[serde(default = "default_irc_port")]
        port: u16,
    },
}

impl TryFrom<ServerEntry> for ServerAddr {
    type Error = String;

    fn try_from(entry: ServerEntry) -> Result<Self, Self::Error> {
        match entry {
            ServerEntry::Pair(host, port) | ServerEntry::Table { host, port } => {
                Ok(ServerAddr { host, port })
            }
            ServerEntry::Address(address) => match address.rsplit_once(':') {
                Some((host, port)) => {
                    let port = port
                        .parse()
                        .map_err(|_| format!("invalid port in server address {address:?}"))?;
                    Ok(ServerAddr {
                        host: host.to_string(),
                        port,
                    })
                }
                None => Ok(ServerAddr {
                    host: address,
                    port: default_irc_port(),
                }),
            },
        }
    }
}

/// One project.
///
/// Every key other than `token` and `channels` names a listener kind; its
/// value is that listener's configuration block.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// URL path segment identifying the project. Checked when the project
    /// table is built so a missing token is reported by project name.
    #[serde(default)]
    pub token: Option<String>,
    /// Channels to notify, by network name.
    #[serde(default)]
    pub channels: BTreeMap<String, Vec<String>>,
    #[serde(flatten)]
    pub listeners: BTreeMap<String, serde_json::Value>,
}
