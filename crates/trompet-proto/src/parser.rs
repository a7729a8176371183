//! nom grammar for a single IRC line.
//!
//! ```text
//! [@tags] [:prefix] <command> [params...] [:trailing]
//! ```
//!
//! Tags are recognised and skipped; trompet never negotiates
//! `message-tags`, so servers only send them by mistake.

use nom::{
    bytes::complete::{take_until, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    error::ErrorKind,
    sequence::preceded,
    IResult,
};
use smallvec::SmallVec;

/// RFC 2812 caps a message at 15 parameters.
const MAX_PARAMS: usize = 15;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedLine<'a> {
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    pub params: SmallVec<[&'a str; MAX_PARAMS]>,
}

fn tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_until(" "))(input)
}

fn prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c| c != ' '))(input)
}

/// `1*letter / 3digit`
fn command(input: &str) -> IResult<&str, &str> {
    let (rest, cmd) = take_while1(|c: char| c.is_ascii_alphanumeric())(input)?;

    let letters = cmd.chars().all(|c| c.is_ascii_alphabetic());
    let numeric = cmd.len() == 3 && cmd.chars().all(|c| c.is_ascii_digit());
    if letters || numeric {
        Ok((rest, cmd))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::AlphaNumeric,
        )))
    }
}

/// Runs of spaces count as one separator; a `:` parameter swallows the rest
/// of the line.
fn params(input: &str) -> (&str, SmallVec<[&str; MAX_PARAMS]>) {
    let mut out: SmallVec<[&str; MAX_PARAMS]> = SmallVec::new();
    let mut rest = input;

    while rest.starts_with(' ') {
        if out.len() >= MAX_PARAMS {
            break;
        }
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() || rest.starts_with(['\r', '\n']) {
            break;
        }

        if let Some(after_colon) = rest.strip_prefix(':') {
            let end = after_colon.find(['\r', '\n']).unwrap_or(after_colon.len());
            out.push(&after_colon[..end]);
            rest = &after_colon[end..];
            break;
        }

        let end = rest.find([' ', '\r', '\n']).unwrap_or(rest.len());
        out.push(&rest[..end]);
        rest = &rest[end..];
    }

    (rest, out)
}

fn line(input: &str) -> IResult<&str, ParsedLine<'_>> {
    let (input, _) = opt(tags)(input)?;
    let (input, _) = space0(input)?;
    let (input, prefix) = opt(prefix)(input)?;
    let (input, _) = space0(input)?;
    let (input, command) = command(input)?;
    let (rest, params) = params(input);

    Ok((
        rest,
        ParsedLine {
            prefix,
            command,
            params,
        },
    ))
}

impl<'a> ParsedLine<'a> {
    /// Parse one line; on failure returns the byte offset where the grammar
    /// stopped matching.
    pub fn parse(input: &'a str) -> Result<Self, usize> {
        match line(input) {
            Ok((_, parsed)) => Ok(parsed),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                Err(input.len() - e.input.len())
            }
            Err(nom::Err::Incomplete(_)) => Err(input.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefix_command_and_trailing() {
        let parsed = ParsedLine::parse(":nick!u@h PRIVMSG #chan :hello there\r\n").unwrap();
        assert_eq!(parsed.prefix, Some("nick!u@h"));
        assert_eq!(parsed.command, "PRIVMSG");
        assert_eq!(parsed.params.as_slice(), &["#chan", "hello there"]);
    }

    #[test]
    fn skips_tags() {
        let parsed = ParsedLine::parse("@time=2024-01-01T00:00:00Z PING :abc").unwrap();
        assert_eq!(parsed.prefix, None);
        assert_eq!(parsed.command, "PING");
        assert_eq!(parsed.params.as_slice(), &["abc"]);
    }

    #[test]
    fn collapses_repeated_spaces() {
        let parsed = ParsedLine::parse("JOIN   #a    key").unwrap();
        assert_eq!(parsed.params.as_slice(), &["#a", "key"]);
    }

    #[test]
    fn empty_trailing_is_kept() {
        let parsed = ParsedLine::parse("PRIVMSG #a :").unwrap();
        assert_eq!(parsed.params.as_slice(), &["#a", ""]);
    }

    #[test]
    fn rejects_mixed_command_token() {
        assert!(ParsedLine::parse("PR1VMSG #a :x").is_err());
        assert!(ParsedLine::parse("12 #a").is_err());
    }
}
