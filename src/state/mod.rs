//! Shared relay state.
//!
//! [`Relay`] ties together the listener registry, the current project table
//! and the network connections. The HTTP layer and the reload signal only
//! ever talk to a `Relay`.

pub mod projects;
pub mod reconfigure;

use std::sync::Arc;

use parking_lot::RwLock;

pub use projects::ProjectTable;
pub use reconfigure::prepare;

use crate::dispatch::Dispatcher;
use crate::irc::NetworkManager;
use crate::listeners::Registry;

/// The current project table. Readers clone the inner `Arc` and never hold
/// the lock while working.
pub type SharedProjects = Arc<RwLock<Arc<ProjectTable>>>;

pub struct Relay {
    registry: Arc<Registry>,
    projects: SharedProjects,
    networks: Arc<NetworkManager>,
    dispatcher: Dispatcher,
    /// Serializes reconfigurations.
    reconfigure_lock: tokio::sync::Mutex<()>,
}

impl Relay {
    /// A relay with no projects and no networks.
    pub fn new(registry: Registry) -> Self {
        let projects: SharedProjects = Arc::new(RwLock::new(Arc::new(ProjectTable::empty())));
        let networks = Arc::new(NetworkManager::new());
        let dispatcher = Dispatcher::new(Arc::clone(&projects), Arc::clone(&networks));
        Self {
            registry: Arc::new(registry),
            projects,
            networks,
            dispatcher,
            reconfigure_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Snapshot of the current project table.
    pub fn projects(&self) -> Arc<ProjectTable> {
        Arc::clone(&self.projects.read())
    }

    pub fn networks(&self) -> &NetworkManager {
        &self.networks
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Disconnect from every network.
    pub async fn shutdown(&self) {
        self.networks.shutdown().await;
    }
}
