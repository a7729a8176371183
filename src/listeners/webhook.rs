//! Push webhooks (Bitbucket, GitHub).
//!
//! One message per commit, rendered from the project's template. A project
//! may cap the number of messages per push; the rest are summarized as
//! `[k commits omitted.]`.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{Endpoint, InboundRequest, ListenerKind, Notifier, Reply, parse_config};
use crate::commit::{self, PayloadFormat};
use crate::error::IngressError;
use crate::template::Template;

#[derive(Debug, Deserialize)]
struct PushConfig {
    message: String,
    #[serde(
        default,
        rename = "max commit messages per push",
        alias = "max_commits_per_push"
    )]
    max_commits_per_push: Option<usize>,
}

/// Listener kind for a push webhook dialect.
#[derive(Debug, Clone)]
pub struct PushKind {
    name: &'static str,
    format: PayloadFormat,
}

impl PushKind {
    pub fn new(name: &'static str, format: PayloadFormat) -> Self {
        Self { name, format }
    }
}

impl ListenerKind for PushKind {
    fn name(&self) -> &'static str {
        self.name
    }

    fn validate(&self, config: &Value) -> Result<(), String> {
        parse_config::<PushConfig>(config).map(drop)
    }

    fn attach(&self, project: &str, config: &Value) -> Result<Arc<dyn Endpoint>, String> {
        let config: PushConfig = parse_config(config)?;
        Ok(Arc::new(PushEndpoint {
            project: project.to_string(),
            format: self.format,
            template: Template::new(config.message),
            max_commits_per_push: config.max_commits_per_push,
        }))
    }
}

/// Announces every commit of a push.
#[derive(Debug)]
pub struct PushEndpoint {
    project: String,
    format: PayloadFormat,
    template: Template,
    max_commits_per_push: Option<usize>,
}

impl Endpoint for PushEndpoint {
    fn handle(
        &self,
        request: &InboundRequest,
        notifier: &dyn Notifier,
    ) -> Result<Reply, IngressError> {
        let payload = request.payload()?;
        // Everything is extracted before anything is sent, so a bad commit
        // halfway through the list announces nothing.
        let events = commit::normalize(self.format, &payload)?;

        let limit = self.max_commits_per_push.unwrap_or(usize::MAX);
        for event in events.iter().take(limit) {
            let message = self
                .template
                .safe_substitute(&event.substitutions(&self.project));
            notifier.notify(&self.project, &message);
        }

        let omitted = events.len().saturating_sub(limit);
        if omitted > 0 {
            notifier.notify(&self.project, &format!("[{omitted} commits omitted.]"));
        }

        debug!(
            project = %self.project,
            commits = events.len(),
            omitted,
            "push announced"
        );
        Ok(Reply::empty())
    }
}
