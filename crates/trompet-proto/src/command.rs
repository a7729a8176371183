//! The subset of IRC commands a notification bot sends or reacts to.
//!
//! Everything else is preserved as [`Command::Raw`] so it can be logged and
//! ignored without failing the connection.

use std::fmt::{self, Write};

use crate::error::MessageParseError;

/// IRC command with its parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Command {
    /// `PASS password`
    PASS(String),
    /// `NICK nickname`
    NICK(String),
    /// `USER username mode realname`
    USER(String, String, String),
    /// `QUIT [message]`
    QUIT(Option<String>),
    /// `JOIN channels [keys]`
    JOIN(String, Option<String>),
    /// `PART channels [message]`
    PART(String, Option<String>),
    /// `PRIVMSG target text`
    PRIVMSG(String, String),
    /// `NOTICE target text`
    NOTICE(String, String),
    /// `PING server1 [server2]`
    PING(String, Option<String>),
    /// `PONG server1 [server2]`
    PONG(String, Option<String>),
    /// `ERROR :message`, sent by the server right before it closes the link.
    ERROR(String),
    /// Three-digit numeric reply.
    Response(u16, Vec<String>),
    /// Anything this crate does not model.
    Raw(String, Vec<String>),
}

fn arg(args: &[&str], idx: usize) -> Option<String> {
    args.get(idx).map(|s| (*s).to_string())
}

fn need(cmd: &'static str, args: &[&str], n: usize) -> Result<(), MessageParseError> {
    if args.len() < n {
        Err(MessageParseError::NotEnoughArguments { cmd, needed: n })
    } else {
        Ok(())
    }
}

impl Command {
    /// Build a command from its name and raw parameters.
    pub fn new(cmd: &str, args: Vec<&str>) -> Result<Command, MessageParseError> {
        if cmd.len() == 3 && cmd.bytes().all(|b| b.is_ascii_digit()) {
            let code = cmd
                .parse::<u16>()
                .map_err(|_| MessageParseError::InvalidCommand)?;
            return Ok(Command::Response(
                code,
                args.into_iter().map(str::to_string).collect(),
            ));
        }

        let upper = cmd.to_ascii_uppercase();
        let command = match upper.as_str() {
            "PASS" => {
                need("PASS", &args, 1)?;
                Command::PASS(args[0].to_string())
            }
            "NICK" => {
                need("NICK", &args, 1)?;
                Command::NICK(args[0].to_string())
            }
            "USER" => {
                need("USER", &args, 4)?;
                Command::USER(args[0].to_string(), args[1].to_string(), args[3].to_string())
            }
            "QUIT" => Command::QUIT(arg(&args, 0)),
            "JOIN" => {
                need("JOIN", &args, 1)?;
                Command::JOIN(args[0].to_string(), arg(&args, 1))
            }
            "PART" => {
                need("PART", &args, 1)?;
                Command::PART(args[0].to_string(), arg(&args, 1))
            }
            "PRIVMSG" => {
                need("PRIVMSG", &args, 2)?;
                Command::PRIVMSG(args[0].to_string(), args[1].to_string())
            }
            "NOTICE" => {
                need("NOTICE", &args, 2)?;
                Command::NOTICE(args[0].to_string(), args[1].to_string())
            }
            "PING" => {
                need("PING", &args, 1)?;
                Command::PING(args[0].to_string(), arg(&args, 1))
            }
            "PONG" => {
                need("PONG", &args, 1)?;
                Command::PONG(args[0].to_string(), arg(&args, 1))
            }
            "ERROR" => Command::ERROR(arg(&args, 0).unwrap_or_default()),
            _ => Command::Raw(upper, args.into_iter().map(str::to_string).collect()),
        };
        Ok(command)
    }

    /// Upper-case command name (numerics rendered as three digits).
    pub fn name(&self) -> String {
        match self {
            Command::PASS(_) => "PASS".into(),
            Command::NICK(_) => "NICK".into(),
            Command::USER(..) => "USER".into(),
            Command::QUIT(_) => "QUIT".into(),
            Command::JOIN(..) => "JOIN".into(),
            Command::PART(..) => "PART".into(),
            Command::PRIVMSG(..) => "PRIVMSG".into(),
            Command::NOTICE(..) => "NOTICE".into(),
            Command::PING(..) => "PING".into(),
            Command::PONG(..) => "PONG".into(),
            Command::ERROR(_) => "ERROR".into(),
            Command::Response(code, _) => format!("{code:03}"),
            Command::Raw(name, _) => name.clone(),
        }
    }
}

/// A final parameter needs the `:` marker when it is empty, contains a
/// space or itself starts with a colon.
pub(crate) fn needs_colon_prefix(s: &str) -> bool {
    s.is_empty() || s.contains(' ') || s.starts_with(':')
}

/// Middle parameters are written verbatim; the last one gets a colon only
/// when required.
fn write_cmd(f: &mut fmt::Formatter<'_>, cmd: &str, args: &[&str]) -> fmt::Result {
    f.write_str(cmd)?;
    if let Some((last, middle)) = args.split_last() {
        for a in middle {
            f.write_char(' ')?;
            f.write_str(a)?;
        }
        f.write_char(' ')?;
        if needs_colon_prefix(last) {
            f.write_char(':')?;
        }
        f.write_str(last)?;
    }
    Ok(())
}

/// Like [`write_cmd`] but the last parameter is always written as trailing.
fn write_cmd_freeform(f: &mut fmt::Formatter<'_>, cmd: &str, args: &[&str]) -> fmt::Result {
    f.write_str(cmd)?;
    if let Some((last, middle)) = args.split_last() {
        for a in middle {
            f.write_char(' ')?;
            f.write_str(a)?;
        }
        f.write_str(" :")?;
        f.write_str(last)?;
    }
    Ok(())
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::PASS(p) => write_cmd(f, "PASS", &[p]),
            Command::NICK(n) => write_cmd(f, "NICK", &[n]),
            Command::USER(u, m, r) => write_cmd_freeform(f, "USER", &[u, m, "*", r]),
            Command::QUIT(Some(m)) => write_cmd_freeform(f, "QUIT", &[m]),
            Command::QUIT(None) => write_cmd(f, "QUIT", &[]),
            Command::JOIN(c, Some(k)) => write_cmd(f, "JOIN", &[c, k]),
            Command::JOIN(c, None) => write_cmd(f, "JOIN", &[c]),
            Command::PART(c, Some(m)) => write_cmd_freeform(f, "PART", &[c, m]),
            Command::PART(c, None) => write_cmd(f, "PART", &[c]),
            Command::PRIVMSG(t, m) => write_cmd_freeform(f, "PRIVMSG", &[t, m]),
            Command::NOTICE(t, m) => write_cmd_freeform(f, "NOTICE", &[t, m]),
            Command::PING(s, Some(t)) => write_cmd(f, "PING", &[s, t]),
            Command::PING(s, None) => write_cmd(f, "PING", &[s]),
            Command::PONG(s, Some(t)) => write_cmd(f, "PONG", &[s, t]),
            Command::PONG(s, None) => write_cmd(f, "PONG", &[s]),
            Command::ERROR(m) => write_cmd_freeform(f, "ERROR", &[m]),
            Command::Response(code, args) => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                write_cmd(f, &format!("{code:03}"), &args)
            }
            Command::Raw(name, args) => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                write_cmd(f, name, &args)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_becomes_response() {
        let cmd = Command::new("433", vec!["*", "trompet", "Nickname is already in use"]).unwrap();
        assert_eq!(
            cmd,
            Command::Response(
                433,
                vec![
                    "*".into(),
                    "trompet".into(),
                    "Nickname is already in use".into()
                ]
            )
        );
        assert_eq!(cmd.name(), "433");
    }

    #[test]
    fn lowercase_names_are_accepted() {
        let cmd = Command::new("ping", vec!["irc.example.org"]).unwrap();
        assert_eq!(cmd, Command::PING("irc.example.org".into(), None));
    }

    #[test]
    fn missing_arguments_are_reported() {
        let err = Command::new("PRIVMSG", vec!["#a"]).unwrap_err();
        assert_eq!(
            err,
            MessageParseError::NotEnoughArguments {
                cmd: "PRIVMSG",
                needed: 2
            }
        );
    }

    #[test]
    fn unknown_commands_are_raw() {
        let cmd = Command::new("CAP", vec!["*", "LS", "sasl"]).unwrap();
        assert!(matches!(cmd, Command::Raw(ref name, _) if name == "CAP"));
    }

    #[test]
    fn serialization() {
        assert_eq!(Command::NICK("trompet".into()).to_string(), "NICK trompet");
        assert_eq!(
            Command::USER("bot".into(), "0".into(), "commit bot".into()).to_string(),
            "USER bot 0 * :commit bot"
        );
        assert_eq!(Command::JOIN("#a".into(), None).to_string(), "JOIN #a");
        assert_eq!(Command::PART("#a".into(), None).to_string(), "PART #a");
        assert_eq!(
            Command::PONG("irc.example.org".into(), None).to_string(),
            "PONG irc.example.org"
        );
        assert_eq!(Command::PING(":odd".into(), None).to_string(), "PING ::odd");
        assert_eq!(
            Command::PRIVMSG("#a".into(), "word".into()).to_string(),
            "PRIVMSG #a :word"
        );
    }
}
