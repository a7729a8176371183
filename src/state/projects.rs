//! The live project table.
//!
//! A table is built whole from a configuration and never mutated afterwards;
//! reconfiguration swaps in a new one.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::config::{Config, ValidationError};
use crate::listeners::{Endpoint, Registry};

/// Tokens may only contain `[A-Za-z0-9_-]` and must not be empty.
pub fn validate_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// One project with its attached listeners.
pub struct Project {
    name: String,
    channels: BTreeMap<String, BTreeSet<String>>,
    listeners: BTreeMap<String, Arc<dyn Endpoint>>,
}

impl Project {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channels to notify, by network.
    pub fn channels(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.channels
    }

    pub fn listener(&self, kind: &str) -> Option<&Arc<dyn Endpoint>> {
        self.listeners.get(kind)
    }

    pub fn listener_names(&self) -> impl Iterator<Item = &str> {
        self.listeners.keys().map(String::as_str)
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("name", &self.name)
            .field("channels", &self.channels)
            .field("listeners", &self.listeners.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Projects indexed by token and by name.
#[derive(Default)]
pub struct ProjectTable {
    by_token: HashMap<String, Arc<Project>>,
    by_name: BTreeMap<String, Arc<Project>>,
}

impl fmt::Debug for ProjectTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.by_name.values()).finish()
    }
}

impl ProjectTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build every project of `config`, attaching listeners through
    /// `registry`. Returns all problems found, or a complete table.
    pub fn build(config: &Config, registry: &Registry) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut table = Self::empty();

        for (name, settings) in &config.projects {
            let Some(token) = settings.token.as_deref() else {
                errors.push(ValidationError::MissingToken(name.clone()));
                continue;
            };
            if !validate_token(token) {
                errors.push(ValidationError::InvalidToken {
                    project: name.clone(),
                    token: token.to_string(),
                });
                continue;
            }
            if let Some(other) = table.by_token.get(token) {
                errors.push(ValidationError::DuplicateToken {
                    project: name.clone(),
                    other: other.name.clone(),
                    token: token.to_string(),
                });
                continue;
            }

            let mut listeners = BTreeMap::new();
            for (kind_name, block) in &settings.listeners {
                let kind = match registry.get(kind_name) {
                    Ok(kind) => kind,
                    Err(_) => {
                        errors.push(ValidationError::UnknownListener {
                            project: name.clone(),
                            kind: kind_name.clone(),
                        });
                        continue;
                    }
                };
                match kind.attach(name, block) {
                    Ok(endpoint) => {
                        listeners.insert(kind_name.clone(), endpoint);
                    }
                    Err(reason) => errors.push(ValidationError::InvalidListener {
                        project: name.clone(),
                        kind: kind_name.clone(),
                        reason,
                    }),
                }
            }

            let channels = settings
                .channels
                .iter()
                .map(|(network, channels)| (network.clone(), channels.iter().cloned().collect()))
                .collect();

            let project = Arc::new(Project {
                name: name.clone(),
                channels,
                listeners,
            });
            table.by_token.insert(token.to_string(), Arc::clone(&project));
            table.by_name.insert(name.clone(), project);
        }

        if errors.is_empty() {
            Ok(table)
        } else {
            Err(errors)
        }
    }

    /// Project owning `token`.
    pub fn resolve(&self, token: &str) -> Option<&Arc<Project>> {
        self.by_token.get(token)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Project>> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Projects in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Project>> {
        self.by_name.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(toml: &str) -> Result<ProjectTable, Vec<ValidationError>> {
        let config: Config = toml::from_str(toml).unwrap();
        ProjectTable::build(&config, &Registry::builtin())
    }

    #[test]
    fn token_charset() {
        assert!(validate_token("abc-DEF_123"));
        assert!(!validate_token(""));
        assert!(!validate_token("a/b"));
        assert!(!validate_token("a b"));
        assert!(!validate_token("caf\u{e9}"));
    }

    #[test]
    fn builds_projects_with_listeners() {
        let table = build(
            r##"
[projects.widget]
token = "w1"
channels = { libera = ["#widget", "#dev"] }
github = { message = "$revision" }
xmlrpc = {}

[projects.gadget]
token = "g1"
"##,
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        let widget = table.resolve("w1").unwrap();
        assert_eq!(widget.name(), "widget");
        assert!(widget.listener("github").is_some());
        assert!(widget.listener("xmlrpc").is_some());
        assert!(widget.listener("bitbucket").is_none());
        assert_eq!(widget.listener_names().collect::<Vec<_>>(), ["github", "xmlrpc"]);
        assert_eq!(widget.channels()["libera"].len(), 2);
        assert!(table.get("gadget").is_some());
        assert!(table.resolve("nope").is_none());
    }

    #[test]
    fn missing_token_is_reported() {
        let errors = build("[projects.widget]\ngithub = { message = \"x\" }\n").unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingToken("widget".into())]);
    }

    #[test]
    fn invalid_and_duplicate_tokens() {
        let errors = build(
            r#"
[projects.a]
token = "same"
[projects.b]
token = "same"
[projects.c]
token = "bad token"
"#,
        )
        .unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::DuplicateToken {
                    project: "b".into(),
                    other: "a".into(),
                    token: "same".into(),
                },
                ValidationError::InvalidToken {
                    project: "c".into(),
                    token: "bad token".into(),
                },
            ]
        );
    }

    #[test]
    fn unknown_and_invalid_listeners() {
        let errors = build(
            r#"
[projects.widget]
token = "w"
gitlab = { message = "x" }
travisci = { message = "x" }
"#,
        )
        .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[0],
            ValidationError::UnknownListener {
                project: "widget".into(),
                kind: "gitlab".into(),
            }
        );
        assert!(matches!(
            &errors[1],
            ValidationError::InvalidListener { kind, .. } if kind == "travisci"
        ));
    }

    #[test]
    fn debug_hides_token() {
        let table = build("[projects.widget]\ntoken = \"s3cret\"\n").unwrap();
        let text = format!("{:?}", table.get("widget").unwrap());
        assert!(!text.contains("s3cret"));
    }
}
