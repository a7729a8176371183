//! trompet - announces repository pushes and CI builds on IRC.
//!
//! Source hosts and CI services post webhooks to `/{token}/{listener}`; each
//! project's messages are rendered from its templates and relayed to the IRC
//! channels it is routed to.

mod commit;
mod config;
mod dispatch;
mod error;
mod http;
mod irc;
mod listeners;
mod state;
mod template;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

use crate::config::Config;
use crate::listeners::Registry;
use crate::state::Relay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Announce repository pushes and CI builds on IRC
#[derive(Parser, Debug)]
#[command(name = "trompet")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (`.json` for JSON, TOML otherwise)
    #[arg(default_value = "trompet.toml")]
    config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,

    /// Log output format
    #[arg(long, env = "TROMPET_LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// `--check`: load and validate without connecting anywhere.
fn check(path: &Path) -> ExitCode {
    let config = match Config::load(path) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to load config");
            return ExitCode::FAILURE;
        }
    };
    match state::prepare(&config, &Registry::builtin()) {
        Ok(plan) => {
            for project in plan.projects.iter() {
                let listeners: Vec<_> = project.listener_names().collect();
                info!(
                    project = %project.name(),
                    listeners = %listeners.join(","),
                    networks = project.channels().len(),
                    "project ok"
                );
            }
            info!(
                path = %path.display(),
                projects = plan.projects.len(),
                networks = plan.networks.len(),
                "configuration is valid"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            for problem in &e.errors {
                error!(error = %problem, "configuration rejected");
            }
            ExitCode::FAILURE
        }
    }
}

/// Re-read the configuration on every SIGHUP. A bad file is logged and the
/// running topology is kept.
#[cfg(unix)]
async fn reload_on_hangup(mut hangups: Signal, path: PathBuf, relay: Arc<Relay>) {
    while hangups.recv().await.is_some() {
        info!(path = %path.display(), "SIGHUP received, reloading configuration");
        match Config::load(&path) {
            Ok(config) => {
                // Failures are logged by the engine itself.
                let _ = relay.reconfigure(&config).await;
            }
            Err(e) => warn!(
                path = %path.display(),
                error = %e,
                "reload failed, keeping current configuration"
            ),
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    info!(version = env!("CARGO_PKG_VERSION"), "starting trompet");

    let relay = Arc::new(Relay::new(Registry::builtin()));
    info!(listener_kinds = relay.registry().len(), "listener registry ready");
    relay
        .reconfigure(&config)
        .await
        .context("initial configuration rejected")?;

    // Installed before the ingress starts so an early SIGHUP is not fatal.
    #[cfg(unix)]
    let reload = {
        let hangups =
            signal(SignalKind::hangup()).context("failed to install SIGHUP handler")?;
        Some(tokio::spawn(reload_on_hangup(
            hangups,
            args.config.clone(),
            Arc::clone(&relay),
        )))
    };
    #[cfg(not(unix))]
    let reload: Option<tokio::task::JoinHandle<()>> = None;

    let addr = config.web.address();
    let mut server = tokio::spawn(http::run_http_server(addr, Arc::clone(&relay)));

    let outcome = tokio::select! {
        result = &mut server => match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                Err(anyhow::Error::new(e).context(format!("HTTP ingress on {addr} failed")))
            }
            Err(e) => Err(anyhow::Error::new(e).context("HTTP ingress panicked")),
        },
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for ctrl-c")?;
            info!("interrupted, shutting down");
            Ok(())
        }
    };

    if let Some(reload) = reload {
        reload.abort();
    }
    server.abort();
    relay.shutdown().await;
    outcome
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_format);

    if args.check {
        return check(&args.config);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };
    match runtime.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "trompet stopped");
            ExitCode::FAILURE
        }
    }
}
