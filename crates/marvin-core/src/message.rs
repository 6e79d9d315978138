//! Decoded protocol lines.
//!
//! A [`Message`] is produced fresh for every inbound line and never mutated
//! afterwards, so it can be shared between concurrently running hooks behind an
//! [`Arc`](std::sync::Arc).
//!
//! Decoding is deliberately lenient: a short or malformed line yields an
//! all-empty message whose command matches no hook, never an error.

use std::fmt;
use std::str::FromStr;

/// The origin of a message, taken from the `:name!host` prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Sender {
    /// Nickname or server name.
    pub name: String,
    /// The `user@host` part, empty when the prefix carried no `!`.
    pub host: String,
}

impl Sender {
    fn from_prefix(prefix: &str) -> Self {
        match prefix.split_once('!') {
            Some((name, host)) => Self {
                name: name.to_string(),
                host: host.to_string(),
            },
            None => Self {
                name: prefix.to_string(),
                host: String::new(),
            },
        }
    }

    /// Returns `true` if the line had no prefix at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.host.is_empty()
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}!{}", self.name, self.host)
        }
    }
}

/// One fully decoded protocol line.
///
/// # Example
///
/// ```rust
/// use marvin_core::Message;
///
/// let msg = Message::decode(":nick!user@host PRIVMSG #chan :hello world");
/// assert_eq!(msg.command, "privmsg");
/// assert_eq!(msg.receiver, "#chan");
/// assert_eq!(msg.data, "hello world");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Who sent the line.
    pub sender: Sender,
    /// Target of the `target :trailing` shape (channel or nickname), else empty.
    pub receiver: String,
    /// The command, always lowercase (`privmsg`, `001`, ...).
    pub command: String,
    /// Trailing payload, or the whole remainder when there is no trailing marker.
    pub data: String,
}

impl Message {
    /// Decodes a single line (without its line terminator).
    ///
    /// Never fails: lines with fewer than two whitespace-separated tokens decode
    /// to [`Message::default`].
    pub fn decode(line: &str) -> Self {
        if line.split_whitespace().nth(1).is_none() {
            return Self::default();
        }

        let mut msg = Self::default();
        let mut rest = line;

        if let Some(prefixed) = rest.strip_prefix(':') {
            let (prefix, tail) = prefixed.split_once(' ').unwrap_or((prefixed, ""));
            msg.sender = Sender::from_prefix(prefix);
            rest = tail;
        }

        let rest = rest.trim_start();
        let (command, remainder) = rest.split_once(' ').unwrap_or((rest, ""));
        msg.command = command.to_lowercase();

        if remainder.contains(' ') {
            if let Some((receiver, data)) = remainder.split_once(':') {
                msg.receiver = receiver.trim().to_string();
                msg.data = data.trim().to_string();
            }
        } else {
            let data = remainder.strip_prefix(':').unwrap_or(remainder);
            msg.data = data.trim().to_string();
        }

        msg
    }

    /// Returns `true` for the no-op message produced from malformed input.
    pub fn is_empty(&self) -> bool {
        self.command.is_empty()
    }

    /// Whitespace-separated tokens of the receiver (middle parameters).
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.receiver.split_whitespace()
    }

    /// The channel a membership command (`JOIN`, `PART`, `KICK`) refers to.
    ///
    /// Servers put it in the middle parameters when a trailing part follows
    /// (`PART #chan :bye`) and as the only parameter otherwise (`JOIN #chan`).
    pub fn channel(&self) -> &str {
        self.params()
            .next()
            .unwrap_or_else(|| self.data.split_whitespace().next().unwrap_or(""))
    }

    /// Where a reply to this `PRIVMSG`/`NOTICE` should go.
    ///
    /// Channel messages are answered in the channel. A private message is
    /// addressed to us, so the answer goes back to the sender instead.
    pub fn reply_target(&self, own_nickname: &str) -> &str {
        let target = self.params().next().unwrap_or("");
        if target.is_empty() || target.eq_ignore_ascii_case(own_nickname) {
            &self.sender.name
        } else {
            target
        }
    }
}

impl FromStr for Message {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::decode(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(name: &str, host: &str) -> Sender {
        Sender {
            name: name.into(),
            host: host.into(),
        }
    }

    #[test]
    fn test_decode_join_without_trailing() {
        let msg = Message::decode(":nick!user@host JOIN #chan");
        assert_eq!(msg.sender, sender("nick", "user@host"));
        assert_eq!(msg.command, "join");
        assert_eq!(msg.receiver, "");
        assert_eq!(msg.data, "#chan");
    }

    #[test]
    fn test_decode_ping_strips_trailing_marker() {
        let msg = Message::decode("PING :server.example");
        assert!(msg.sender.is_empty());
        assert_eq!(msg.command, "ping");
        assert_eq!(msg.receiver, "");
        assert_eq!(msg.data, "server.example");
    }

    #[test]
    fn test_decode_privmsg() {
        let msg = Message::decode(":nick!user@host PRIVMSG #chan :hello world");
        assert_eq!(msg.sender, sender("nick", "user@host"));
        assert_eq!(msg.command, "privmsg");
        assert_eq!(msg.receiver, "#chan");
        assert_eq!(msg.data, "hello world");
    }

    #[test]
    fn test_decode_single_token_is_empty() {
        assert_eq!(Message::decode("PING"), Message::default());
        assert_eq!(Message::decode(""), Message::default());
        assert_eq!(Message::decode("   "), Message::default());
        assert!(Message::decode(":only.prefix").is_empty());
    }

    #[test]
    fn test_decode_server_prefix_without_host() {
        let msg = Message::decode(":irc.example.net 001 marvin :Welcome to the network");
        assert_eq!(msg.sender, sender("irc.example.net", ""));
        assert_eq!(msg.command, "001");
        assert_eq!(msg.receiver, "marvin");
        assert_eq!(msg.data, "Welcome to the network");
    }

    #[test]
    fn test_decode_params_without_trailing_are_dropped() {
        let msg = Message::decode(":op!o@h MODE #chan +o");
        assert_eq!(msg.command, "mode");
        assert_eq!(msg.receiver, "");
        assert_eq!(msg.data, "");
    }

    #[test]
    fn test_decode_kick_and_channel() {
        let msg = Message::decode(":op!o@h KICK #chan marvin :flooding");
        assert_eq!(msg.command, "kick");
        assert_eq!(msg.receiver, "#chan marvin");
        assert_eq!(msg.data, "flooding");
        assert_eq!(msg.channel(), "#chan");
        assert_eq!(msg.params().nth(1), Some("marvin"));
    }

    #[test]
    fn test_decode_trims_trailing_whitespace() {
        let msg = Message::decode(":a!b@c NOTICE marvin :  padded  ");
        assert_eq!(msg.data, "padded");
        assert_eq!(msg.sender.to_string(), "a!b@c");
    }

    #[test]
    fn test_channel_for_join_with_trailing_marker() {
        let msg = Message::decode(":nick!user@host JOIN :#chan");
        assert_eq!(msg.data, "#chan");
        assert_eq!(msg.channel(), "#chan");
    }

    #[test]
    fn test_reply_target() {
        let channel = Message::decode(":nick!u@h PRIVMSG #chan :!time");
        assert_eq!(channel.reply_target("marvin"), "#chan");

        let query = Message::decode(":nick!u@h PRIVMSG Marvin :!time");
        assert_eq!(query.reply_target("marvin"), "nick");
    }

    #[test]
    fn test_from_str() {
        let msg: Message = "PING :abc".parse().unwrap();
        assert_eq!(msg.data, "abc");
    }
}
