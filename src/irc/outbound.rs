//! Turning announcement text into `PRIVMSG` lines.

use trompet_proto::{MAX_LINE_LEN, Message};

/// Room kept for the `:nick!user@host ` prefix servers add when relaying.
const PREFIX_RESERVE: usize = 100;

/// One `PRIVMSG` per non-blank line of `text`, each cut to fit an IRC line.
pub fn privmsg_lines(target: &str, text: &str) -> Vec<Message> {
    let overhead = "PRIVMSG ".len() + target.len() + " :".len() + "\r\n".len() + PREFIX_RESERVE;
    let budget = MAX_LINE_LEN.saturating_sub(overhead).max(1);

    text.split(['\r', '\n'])
        .map(|line| line.replace('\0', ""))
        .filter(|line| !line.trim().is_empty())
        .map(|line| Message::privmsg(target, truncate(&line, budget)))
        .collect()
}

/// Longest prefix of `s` no longer than `max_bytes`, ending on a char boundary.
pub fn truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
