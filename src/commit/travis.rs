//! Travis CI build notification.

use serde_json::Value;

use super::{Event, NormalizeError, text};

/// A build notification describes a single commit.
pub fn extract(payload: &Value) -> Result<Event, NormalizeError> {
    Ok(Event::new(
        text(payload, "author_name")?,
        text(payload, "branch")?,
        text(payload, "commit")?,
        text(payload, "message")?,
        text(payload, "compare_url")?,
    )
    .with_build(text(payload, "status_message")?, text(payload, "build_url")?))
}
