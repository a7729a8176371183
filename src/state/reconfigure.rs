//! Applying a configuration to a running relay.
//!
//! The whole configuration is checked and the new project table is built
//! before anything changes, so a rejected configuration leaves the running
//! topology untouched. Projects are always rebuilt; networks are reconciled
//! in place by their actors.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{error, info, warn};

use super::Relay;
use super::projects::ProjectTable;
use crate::config::{self, Config};
use crate::error::ReconfigureError;
use crate::irc::backoff::BackoffPolicy;
use crate::irc::{EnsureOutcome, NetworkSettings};
use crate::listeners::Registry;

/// A validated configuration, ready to be applied.
#[derive(Debug)]
pub struct Plan {
    pub projects: ProjectTable,
    pub networks: BTreeMap<String, NetworkSettings>,
}

/// What a successful reconfiguration did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconfigureReport {
    pub projects: usize,
    /// Networks that were not running before.
    pub started: Vec<String>,
    /// Running networks handed new settings.
    pub reconfigured: Vec<String>,
    /// Running networks the configuration no longer mentions. They are left
    /// connected.
    pub orphaned: Vec<String>,
}

/// Check `config` and build everything it describes, without applying it.
pub fn prepare(config: &Config, registry: &Registry) -> Result<Plan, ReconfigureError> {
    let mut errors = config::validate(config).err().unwrap_or_default();
    let projects = match ProjectTable::build(config, registry) {
        Ok(table) => Some(table),
        Err(mut e) => {
            errors.append(&mut e);
            None
        }
    };
    let Some(projects) = projects.filter(|_| errors.is_empty()) else {
        return Err(ReconfigureError::from(errors));
    };

    let backoff = BackoffPolicy::from(&config.reconnect);
    let mut desired = config.desired_channels();
    let networks = config
        .networks
        .iter()
        .map(|(name, network)| {
            let channels = desired.remove(name).unwrap_or_default();
            (
                name.clone(),
                NetworkSettings::from_config(network, channels, backoff),
            )
        })
        .collect();

    Ok(Plan { projects, networks })
}

impl Relay {
    /// Replace the running topology with the one `config` describes.
    ///
    /// All-or-nothing: on error nothing changed. Applying the same
    /// configuration twice is a no-op for every connection.
    pub async fn reconfigure(&self, config: &Config) -> Result<ReconfigureReport, ReconfigureError> {
        let _guard = self.reconfigure_lock.lock().await;

        let plan = prepare(config, &self.registry).inspect_err(|e| {
            for problem in &e.errors {
                error!(error = %problem, "configuration rejected");
            }
        })?;

        let mut report = ReconfigureReport {
            projects: plan.projects.len(),
            ..ReconfigureReport::default()
        };

        *self.projects.write() = Arc::new(plan.projects);

        for (name, settings) in plan.networks.iter() {
            match self.networks.ensure_connection(name, settings.clone()).await {
                EnsureOutcome::Created => report.started.push(name.clone()),
                EnsureOutcome::Reconfigured => report.reconfigured.push(name.clone()),
            }
        }

        report.orphaned = self
            .networks
            .names()
            .into_iter()
            .filter(|name| !plan.networks.contains_key(name))
            .collect();
        for name in &report.orphaned {
            warn!(network = %name, "network removed from configuration, leaving it connected");
        }

        info!(
            projects = report.projects,
            started = report.started.len(),
            reconfigured = report.reconfigured.len(),
            "configuration applied"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationError;

    fn config(toml: &str) -> Config {
        toml::from_str(toml).unwrap()
    }

    const BASE: &str = r##"
[reconnect]
initial_delay_ms = 50
max_delay_secs = 1

[networks.alpha]
servers = [["127.0.0.1", 1]]
nick = "trompet"

[networks.beta]
servers = [["127.0.0.1", 1]]
nick = "trompet"

[projects.widget]
token = "widget"
channels = { alpha = ["#a", "#b"] }
github = { message = "$revision" }

[projects.gadget]
token = "gadget"
channels = { alpha = ["#b", "#c"], beta = ["#gadget"] }
xmlrpc = {}
"##;

    #[test]
    fn prepare_unions_channels_per_network() {
        let plan = prepare(&config(BASE), &Registry::builtin()).unwrap();
        let alpha: Vec<_> = plan.networks["alpha"].channels.iter().cloned().collect();
        assert_eq!(alpha, ["#a", "#b", "#c"]);
        assert_eq!(plan.networks["beta"].channels.len(), 1);
        assert_eq!(plan.projects.len(), 2);
    }

    #[test]
    fn prepare_collects_all_errors() {
        let err = prepare(
            &config(
                r#"
[networks.alpha]
servers = []
nick = "trompet"

[projects.widget]
github = { message = "x" }
"#,
            ),
            &Registry::builtin(),
        )
        .unwrap_err();
        assert_eq!(
            err.errors,
            vec![
                ValidationError::NoServers("alpha".into()),
                ValidationError::MissingToken("widget".into()),
            ]
        );
    }

    #[tokio::test]
    async fn reconfigure_installs_projects_and_networks() {
        let relay = Relay::new(Registry::builtin());
        let report = relay.reconfigure(&config(BASE)).await.unwrap();
        assert_eq!(report.projects, 2);
        assert_eq!(report.started, ["alpha", "beta"]);
        assert!(report.reconfigured.is_empty());
        assert!(relay.projects().resolve("widget").is_some());
        assert!(relay.networks().contains("alpha"));
        relay.shutdown().await;
    }

    #[tokio::test]
    async fn reconfigure_twice_reuses_connections() {
        let relay = Relay::new(Registry::builtin());
        relay.reconfigure(&config(BASE)).await.unwrap();
        let report = relay.reconfigure(&config(BASE)).await.unwrap();
        assert!(report.started.is_empty());
        assert_eq!(report.reconfigured, ["alpha", "beta"]);
        relay.shutdown().await;
    }

    #[tokio::test]
    async fn missing_token_leaves_running_projects() {
        let relay = Relay::new(Registry::builtin());
        relay.reconfigure(&config(BASE)).await.unwrap();
        let before = relay.projects();

        let broken = BASE.replace("token = \"gadget\"\n", "");
        let err = relay.reconfigure(&config(&broken)).await.unwrap_err();
        assert_eq!(
            err.errors,
            vec![ValidationError::MissingToken("gadget".into())]
        );

        let after = relay.projects();
        assert!(Arc::ptr_eq(&before, &after));
        assert!(after.resolve("widget").is_some());
        assert!(after.resolve("gadget").is_some());
        relay.shutdown().await;
    }

    #[tokio::test]
    async fn removed_projects_and_networks() {
        let relay = Relay::new(Registry::builtin());
        relay.reconfigure(&config(BASE)).await.unwrap();

        let smaller = r##"
[networks.alpha]
servers = [["127.0.0.1", 1]]
nick = "trompet"

[projects.widget]
token = "widget2"
channels = { alpha = ["#a"] }
"##;
        let report = relay.reconfigure(&config(smaller)).await.unwrap();
        assert_eq!(report.orphaned, ["beta"]);
        assert!(relay.networks().contains("beta"));

        let table = relay.projects();
        assert!(table.resolve("widget").is_none());
        assert!(table.resolve("gadget").is_none());
        assert_eq!(table.resolve("widget2").unwrap().name(), "widget");
        relay.shutdown().await;
    }
}
