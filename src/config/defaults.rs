//! Default value functions for configuration.

use std::net::{IpAddr, Ipv4Addr};

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Web Defaults
// =============================================================================

pub fn default_bind() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

pub fn default_web_port() -> u16 {
    8080
}

// =============================================================================
// Network Defaults
// =============================================================================

pub fn default_irc_port() -> u16 {
    6667
}

pub fn default_username() -> String {
    "trompet".to_string()
}

pub fn default_realname() -> String {
    "trompet commit announcer".to_string()
}

// =============================================================================
// Reconnect Defaults
// =============================================================================

pub fn default_initial_delay_ms() -> u64 {
    2_000
}

pub fn default_max_delay_secs() -> u64 {
    300
}

pub fn default_backoff_factor() -> f64 {
    1.6
}

pub fn default_jitter() -> f64 {
    0.1
}
