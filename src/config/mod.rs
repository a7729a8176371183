//! Configuration loading and validation.
//!
//! - [`types`]: the file model (Config, WebConfig, NetworkConfig, ProjectConfig)
//! - [`validation`]: structural checks returning every error found
//! - [`defaults`]: serde default functions

mod defaults;
mod types;
mod validation;

pub use types::{
    Config, ConfigError, NetworkConfig, ProjectConfig, ReconnectConfig, ServerAddr, WebConfig,
};
pub use validation::{ValidationError, validate};
