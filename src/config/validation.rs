//! Configuration validation.
//!
//! Every problem is collected so one run reports the whole list.

use super::Config;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Required config setting 'token' not found for project {0:?}")]
    MissingToken(String),
    #[error(
        "Project {project:?}: Invalid value for setting 'token': {token:?} (allowed: a-z, A-Z, 0-9, _, -)"
    )]
    InvalidToken { project: String, token: String },
    #[error("Project {project:?}: token {token:?} already used by project {other:?}")]
    DuplicateToken {
        project: String,
        other: String,
        token: String,
    },
    #[error("Unknown config setting {kind:?} for project {project:?}")]
    UnknownListener { project: String, kind: String },
    #[error("Project {project:?}: invalid {kind:?} configuration: {reason}")]
    InvalidListener {
        project: String,
        kind: String,
        reason: String,
    },
    #[error("Project {project:?} routes to undeclared network {network:?}")]
    UnknownNetwork { project: String, network: String },
    #[error("Project {project:?}: empty channel name for network {network:?}")]
    EmptyChannel { project: String, network: String },
    #[error("Network {0:?} has no servers")]
    NoServers(String),
    #[error("Network {0:?} has an empty nick")]
    EmptyNick(String),
    #[error("reconnect.factor must be at least 1.0, got {0}")]
    InvalidBackoffFactor(f64),
    #[error("reconnect.jitter must be within [0, 1), got {0}")]
    InvalidJitter(f64),
}

/// Validate the network and routing parts of a configuration.
///
/// Tokens and listener blocks are checked when the project table is built,
/// since that needs the listener registry.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (name, network) in &config.networks {
        if network.servers.is_empty() {
            errors.push(ValidationError::NoServers(name.clone()));
        }
        if network.nick.trim().is_empty() {
            errors.push(ValidationError::EmptyNick(name.clone()));
        }
    }

    for (project, settings) in &config.projects {
        for (network, channels) in &settings.channels {
            if !config.networks.contains_key(network) {
                errors.push(ValidationError::UnknownNetwork {
                    project: project.clone(),
                    network: network.clone(),
                });
            }
            if channels.iter().any(|c| c.trim().is_empty()) {
                errors.push(ValidationError::EmptyChannel {
                    project: project.clone(),
                    network: network.clone(),
                });
            }
        }
    }

    let reconnect = &config.reconnect;
    if reconnect.factor.is_nan() || reconnect.factor < 1.0 {
        errors.push(ValidationError::InvalidBackoffFactor(reconnect.factor));
    }
    if !(0.0..1.0).contains(&reconnect.jitter) {
        errors.push(ValidationError::InvalidJitter(reconnect.jitter));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_valid_config() -> String {
        r##"
[networks.libera]
servers = [["irc.libera.chat", 6667]]
nick = "trompet"

[projects.widget]
token = "widget"
channels = { libera = ["#widget"] }
"##
        .to_string()
    }

    #[test]
    fn test_valid_config_passes() {
        let config: Config = toml::from_str(&minimal_valid_config()).unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_config_passes() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_undeclared_network_fails() {
        let toml = r##"
[projects.widget]
token = "widget"
channels = { oftc = ["#widget"] }
"##;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::UnknownNetwork {
                project: "widget".into(),
                network: "oftc".into(),
            }]
        );
    }

    #[test]
    fn test_network_errors_are_collected() {
        let toml = r#"
[networks.libera]
servers = []
nick = " "
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&ValidationError::NoServers("libera".into())));
        assert!(errors.contains(&ValidationError::EmptyNick("libera".into())));
    }

    #[test]
    fn test_bad_backoff_fails() {
        let toml = r#"
[reconnect]
factor = 0.5
jitter = 1.5
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::InvalidBackoffFactor(0.5)));
        assert!(errors.contains(&ValidationError::InvalidJitter(1.5)));
    }

    #[test]
    fn test_error_messages_name_the_project() {
        let err = ValidationError::MissingToken("widget".into());
        assert_eq!(
            err.to_string(),
            "Required config setting 'token' not found for project \"widget\""
        );
    }
}
