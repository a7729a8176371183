//! Message source (`:server` or `:nick!user@host`).

use std::fmt;

/// Origin of a message.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Prefix {
    /// Server name, e.g. `irc.libera.chat`.
    ServerName(String),
    /// `(nick, user, host)`; user and host may be empty.
    Nickname(String, String, String),
}

impl Prefix {
    /// Lenient parse: a dot before any `!`/`@` marks a server name.
    pub fn new_from_str(s: &str) -> Self {
        let (name, rest) = match s.find(['!', '@']) {
            Some(idx) => (&s[..idx], &s[idx..]),
            None => (s, ""),
        };

        if rest.is_empty() && name.contains('.') {
            return Prefix::ServerName(name.to_string());
        }

        let (user, host) = match rest.strip_prefix('!') {
            Some(after_bang) => match after_bang.split_once('@') {
                Some((user, host)) => (user, host),
                None => (after_bang, ""),
            },
            None => ("", rest.strip_prefix('@').unwrap_or("")),
        };

        Prefix::Nickname(name.to_string(), user.to_string(), host.to_string())
    }

    /// Nickname part, if the source is a user.
    pub fn nickname(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(nick, _, _) => Some(nick),
            Prefix::ServerName(_) => None,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => f.write_str(name),
            Prefix::Nickname(nick, user, host) => {
                f.write_str(nick)?;
                if !user.is_empty() {
                    write!(f, "!{user}")?;
                }
                if !host.is_empty() {
                    write!(f, "@{host}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_name() {
        assert_eq!(
            Prefix::new_from_str("irc.example.org"),
            Prefix::ServerName("irc.example.org".into())
        );
    }

    #[test]
    fn full_user_mask() {
        let prefix = Prefix::new_from_str("trompet!bot@example.org");
        assert_eq!(
            prefix,
            Prefix::Nickname("trompet".into(), "bot".into(), "example.org".into())
        );
        assert_eq!(prefix.to_string(), "trompet!bot@example.org");
    }

    #[test]
    fn bare_nick() {
        let prefix = Prefix::new_from_str("NickServ");
        assert_eq!(prefix.nickname(), Some("NickServ"));
    }
}
