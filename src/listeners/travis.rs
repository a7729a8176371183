//! Travis CI build notifications.
//!
//! Travis signs each notification with `Authorization:
//! sha256(<repo slug> + <user token>)` in lower-case hex and names the
//! repository in `Travis-Repo-Slug`.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::warn;

use super::{Endpoint, InboundRequest, ListenerKind, Notifier, Reply, parse_config};
use crate::commit::{self, PayloadFormat};
use crate::error::IngressError;
use crate::template::Template;

const AUTHORIZATION: &str = "authorization";
const REPO_SLUG: &str = "travis-repo-slug";

#[derive(Deserialize)]
struct TravisConfig {
    message: String,
    /// The Travis user token the notifications are signed with.
    token: String,
}

/// Listener kind `travisci`.
#[derive(Debug, Clone, Copy)]
pub struct TravisKind;

impl ListenerKind for TravisKind {
    fn name(&self) -> &'static str {
        "travisci"
    }

    fn validate(&self, config: &Value) -> Result<(), String> {
        parse_config::<TravisConfig>(config).map(drop)
    }

    fn attach(&self, project: &str, config: &Value) -> Result<Arc<dyn Endpoint>, String> {
        let config: TravisConfig = parse_config(config)?;
        Ok(Arc::new(BuildEndpoint {
            project: project.to_string(),
            template: Template::new(config.message),
            travis_token: config.token,
        }))
    }
}

/// Announces a finished build.
pub struct BuildEndpoint {
    project: String,
    template: Template,
    travis_token: String,
}

impl std::fmt::Debug for BuildEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildEndpoint")
            .field("project", &self.project)
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

impl Endpoint for BuildEndpoint {
    fn handle(
        &self,
        request: &InboundRequest,
        notifier: &dyn Notifier,
    ) -> Result<Reply, IngressError> {
        let payload = request.payload()?;

        let authorization = request.header(AUTHORIZATION);
        let slug = request.header(REPO_SLUG);
        if !verify_authorization(authorization, slug, &self.travis_token) {
            warn!(project = %self.project, slug = ?slug, "travis signature mismatch");
            return Err(IngressError::Unauthorized);
        }

        for event in commit::normalize(PayloadFormat::TravisCi, &payload)? {
            let message = self
                .template
                .safe_substitute(&event.substitutions(&self.project));
            notifier.notify(&self.project, &message);
        }
        Ok(Reply::empty())
    }
}

/// Lower-case hex SHA-256 of `slug + token`.
pub fn expected_authorization(slug: &str, token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(slug.as_bytes());
    hasher.update(token.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Check a Travis signature. Both headers must be present.
pub fn verify_authorization(authorization: Option<&str>, slug: Option<&str>, token: &str) -> bool {
    let (Some(authorization), Some(slug)) = (authorization, slug) else {
        return false;
    };
    let expected = expected_authorization(slug, token);
    expected.as_bytes().ct_eq(authorization.as_bytes()).into()
}
