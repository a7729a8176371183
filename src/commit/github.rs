//! GitHub push webhook.
//!
//! See <https://docs.github.com/webhooks/webhook-events-and-payloads#push>.

use serde_json::Value;

use super::{Event, NormalizeError, array, field, text};

/// One event per commit, in the order GitHub lists them.
pub fn extract(payload: &Value) -> Result<Vec<Event>, NormalizeError> {
    let reference = text(payload, "ref")?;
    let branch = branch_name(&reference);

    array(payload, "commits")?
        .iter()
        .map(|commit| {
            Ok(Event::new(
                text(field(commit, "author")?, "name")?,
                branch,
                text(commit, "id")?,
                text(commit, "message")?,
                text(commit, "url")?,
            ))
        })
        .collect()
}

/// Strip one leading `refs/heads/`. Tags and other refs pass through.
pub fn branch_name(reference: &str) -> &str {
    reference.strip_prefix("refs/heads/").unwrap_or(reference)
}
