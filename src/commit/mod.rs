//! Canonical commit and build events.
//!
//! Providers describe a push or a build in their own JSON shape. The
//! submodules turn those payloads into [`Event`]s; everything downstream
//! (templates, dispatch) only ever sees an [`Event`].

pub mod bitbucket;
pub mod github;
pub mod travis;

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

/// Appended to the first line of a multi-line commit message.
pub const ELLIPSIS: char = '\u{2026}';

/// Why a payload could not be normalized.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("required field {0:?} missing from payload")]
    MissingField(&'static str),
    #[error("field {field:?} should be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

/// Payload dialects the normalizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// Bitbucket POST service push.
    Bitbucket,
    /// GitHub push webhook.
    GitHub,
    /// Travis CI build notification.
    TravisCi,
}

/// Parse `raw` as JSON and extract its events.
///
/// Push formats yield one event per commit, in payload order. A build
/// notification yields exactly one event.
pub fn normalize(format: PayloadFormat, raw: &str) -> Result<Vec<Event>, NormalizeError> {
    let payload: Value = serde_json::from_str(raw)?;
    match format {
        PayloadFormat::Bitbucket => bitbucket::extract(&payload),
        PayloadFormat::GitHub => github::extract(&payload),
        PayloadFormat::TravisCi => travis::extract(&payload).map(|event| vec![event]),
    }
}

/// CI-specific additions to an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStatus {
    pub status_message: String,
    pub report_url: String,
}

/// A single commit (or a build of one), independent of the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    author: String,
    branch: String,
    revision: String,
    message: String,
    short_message: String,
    url: String,
    build: Option<BuildStatus>,
}

impl Event {
    pub fn new(
        author: impl Into<String>,
        branch: impl Into<String>,
        revision: impl Into<String>,
        message: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Self {
            author: author.into(),
            branch: branch.into(),
            revision: revision.into(),
            short_message: short_message(&message),
            message,
            url: url.into(),
            build: None,
        }
    }

    /// Attach CI build results.
    #[must_use]
    pub fn with_build(
        mut self,
        status_message: impl Into<String>,
        report_url: impl Into<String>,
    ) -> Self {
        self.build = Some(BuildStatus {
            status_message: status_message.into(),
            report_url: report_url.into(),
        });
        self
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn short_message(&self) -> &str {
        &self.short_message
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn build(&self) -> Option<&BuildStatus> {
        self.build.as_ref()
    }

    /// Template variables for this event, announced on behalf of `project`.
    pub fn substitutions<'a>(&'a self, project: &'a str) -> HashMap<&'static str, &'a str> {
        let mut vars = HashMap::from([
            ("project", project),
            ("author", self.author.as_str()),
            ("branch", self.branch.as_str()),
            ("revision", self.revision.as_str()),
            ("message", self.message.as_str()),
            ("shortmessage", self.short_message.as_str()),
            ("shortMessage", self.short_message.as_str()),
            ("url", self.url.as_str()),
        ]);
        if let Some(build) = &self.build {
            for key in ["statusmessage", "statusMessage"] {
                vars.insert(key, build.status_message.as_str());
            }
            for key in ["reporturl", "reportUrl"] {
                vars.insert(key, build.report_url.as_str());
            }
        }
        vars
    }
}

/// First line of `message`, with [`ELLIPSIS`] appended if more lines follow.
///
/// Line breaks are the ones Unicode recognises (`\n`, `\r\n`, `\r`, form
/// feed, NEL, U+2028 and friends). A single trailing break does not count as
/// a second line.
pub fn short_message(message: &str) -> String {
    let Some(pos) = message.find(is_line_break) else {
        return message.to_string();
    };
    let (first, rest) = message.split_at(pos);
    let mut chars = rest.chars();
    let brk = chars.next();
    let mut rest = chars.as_str();
    if brk == Some('\r') {
        rest = rest.strip_prefix('\n').unwrap_or(rest);
    }

    let mut short = first.to_string();
    if !rest.is_empty() {
        short.push(ELLIPSIS);
    }
    short
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}'..='\u{1e}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Look up a required key.
fn field<'a>(value: &'a Value, key: &'static str) -> Result<&'a Value, NormalizeError> {
    value.get(key).ok_or(NormalizeError::MissingField(key))
}

/// Look up a required key and render it as text.
///
/// `null` becomes the empty string and numbers are printed, since providers
/// are not consistent about either.
fn text(value: &Value, key: &'static str) -> Result<String, NormalizeError> {
    match field(value, key)? {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(NormalizeError::WrongType {
            field: key,
            expected: "a string",
        }),
    }
}

/// Look up a required array.
fn array<'a>(value: &'a Value, key: &'static str) -> Result<&'a [Value], NormalizeError> {
    field(value, key)?
        .as_array()
        .map(Vec::as_slice)
        .ok_or(NormalizeError::WrongType {
            field: key,
            expected: "an array",
        })
}
