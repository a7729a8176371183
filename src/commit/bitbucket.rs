//! Bitbucket POST service push.

use serde_json::Value;

use super::{Event, NormalizeError, array, field, text};

const BITBUCKET_ORIGIN: &str = "https://bitbucket.org";

/// One event per commit, in the order Bitbucket lists them.
pub fn extract(payload: &Value) -> Result<Vec<Event>, NormalizeError> {
    let absolute_url = text(field(payload, "repository")?, "absolute_url")?;

    array(payload, "commits")?
        .iter()
        .map(|commit| {
            let node = text(commit, "node")?;
            let url = format!("{BITBUCKET_ORIGIN}{absolute_url}changeset/{node}");
            Ok(Event::new(
                text(commit, "author")?,
                text(commit, "branch")?,
                node,
                text(commit, "message")?,
                url,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{NormalizeError, PayloadFormat, normalize};

    const PAYLOAD: &str = r#"{
        "canon_url": "https://bitbucket.org",
        "commits": [{
            "author": "Test",
            "branch": "default",
            "files": [{"file": "README", "type": "modified"}],
            "message": "Test commit\n\nWith a body.",
            "node": "a73056d1d557",
            "parents": ["1b5e9e02c47b"],
            "raw_author": "Test <test@example.com>",
            "raw_node": "a73056d1d5575d4ac0bd6bc2d0ee58a2ae6be54a",
            "revision": 4,
            "size": -1,
            "timestamp": "2011-12-22 01:21:06",
            "utctimestamp": "2011-12-22 00:21:06+00:00"
        }],
        "repository": {
            "absolute_url": "/Test/test/",
            "fork": false,
            "is_private": true,
            "name": "test",
            "owner": "Test",
            "scm": "hg",
            "slug": "test",
            "website": ""
        },
        "user": "Test"
    }"#;

    #[test]
    fn extracts_changeset_url() {
        let events = normalize(PayloadFormat::Bitbucket, PAYLOAD).unwrap();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.url(), "https://bitbucket.org/Test/test/changeset/a73056d1d557");
        assert_eq!(event.author(), "Test");
        assert_eq!(event.branch(), "default");
        assert_eq!(event.revision(), "a73056d1d557");
        assert_eq!(event.short_message(), "Test commit\u{2026}");
    }

    #[test]
    fn null_branch_is_empty() {
        let mut payload: Value = serde_json::from_str(PAYLOAD).unwrap();
        payload["commits"][0]["branch"] = Value::Null;
        let events = extract(&payload).unwrap();
        assert_eq!(events[0].branch(), "");
    }

    #[test]
    fn missing_repository_fails() {
        let mut payload: Value = serde_json::from_str(PAYLOAD).unwrap();
        payload.as_object_mut().unwrap().remove("repository");
        assert!(matches!(
            extract(&payload),
            Err(NormalizeError::MissingField("repository"))
        ));
    }

    #[test]
    fn commits_must_be_an_array() {
        let payload = serde_json::json!({
            "repository": {"absolute_url": "/a/b/"},
            "commits": {"node": "x"}
        });
        assert!(matches!(
            extract(&payload),
            Err(NormalizeError::WrongType { field: "commits", .. })
        ));
    }
}
