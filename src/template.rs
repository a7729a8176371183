//! `$name` message templates.
//!
//! Syntax: `$name` or `${name}` insert a variable, `$$` is a literal `$`.
//! Names are ASCII letters, digits and `_`, not starting with a digit.
//! Substitution is lenient: unknown names and stray `$` are kept as written.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\$(?:(?P<escaped>\$)|(?P<named>[_a-z][_a-z0-9]*)|\{(?P<braced>[_a-z][_a-z0-9]*)\})")
        .expect("placeholder pattern is valid")
});

/// A parsed message template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
}

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Render the template, leaving unknown placeholders untouched.
    pub fn safe_substitute<K, V>(&self, vars: &HashMap<K, V>) -> String
    where
        K: Borrow<str> + Hash + Eq,
        V: AsRef<str>,
    {
        PLACEHOLDER
            .replace_all(&self.source, |caps: &Captures<'_>| {
                if caps.name("escaped").is_some() {
                    return "$".to_string();
                }
                let name = caps
                    .name("named")
                    .or_else(|| caps.name("braced"))
                    .map_or("", |m| m.as_str());
                match vars.get(name) {
                    Some(value) => value.as_ref().to_string(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

impl From<&str> for Template {
    fn from(source: &str) -> Self {
        Template::new(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([("author", "alice"), ("branch", "main"), ("shortMessage", "Fix")])
    }

    #[test]
    fn substitutes_plain_and_braced() {
        let t = Template::new("$author pushed to ${branch}: $shortMessage");
        assert_eq!(t.safe_substitute(&vars()), "alice pushed to main: Fix");
    }

    #[test]
    fn braced_allows_adjacent_text() {
        let t = Template::new("${author}s commit");
        assert_eq!(t.safe_substitute(&vars()), "alices commit");
    }

    #[test]
    fn unknown_placeholders_stay_literal() {
        let t = Template::new("$author did $what in ${where}");
        assert_eq!(t.safe_substitute(&vars()), "alice did $what in ${where}");
    }

    #[test]
    fn dollar_escapes_and_strays() {
        let t = Template::new("$$author costs $5 and ${ broken");
        assert_eq!(t.safe_substitute(&vars()), "$author costs $5 and ${ broken");
    }

    #[test]
    fn names_are_case_sensitive() {
        let t = Template::new("$Author");
        assert_eq!(t.safe_substitute(&vars()), "$Author");
    }

    #[test]
    fn works_with_owned_maps() {
        let owned: HashMap<String, String> =
            HashMap::from([("rev".to_string(), "abc".to_string())]);
        assert_eq!(Template::from("r$rev").safe_substitute(&owned), "rabc");
    }
}
