//! Outgoing line encoding and argument sanitization.
//!
//! Every value substituted into an outgoing line passes through [`sanitize`],
//! which guarantees that user-influenced text (a chat message, a fetched page
//! title, a configured password) can never terminate the current protocol line
//! and smuggle in a second command. The format string itself is trusted.
//!
//! The [`encode!`](crate::encode!) and [`irc_write!`](crate::irc_write!) macros
//! wrap every argument in [`Sanitized`] automatically:
//!
//! ```rust
//! use marvin_core::encode;
//!
//! let line = encode!("PRIVMSG {} :{}", "#chan", "hi\r\nQUIT :pwned");
//! assert_eq!(line, b"PRIVMSG #chan :hi QUIT :pwned\r\n");
//! ```

use std::fmt::{self, Display, Write as _};

/// Line terminator appended to every outgoing line.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Returns `true` for characters that separate words in sanitized output.
///
/// Control characters include CR, LF, NUL and the mIRC formatting bytes.
fn is_separator(c: char) -> bool {
    c.is_whitespace() || c.is_control() || is_format(c)
}

/// Unicode format characters (general category `Cf`): bidi overrides,
/// zero-width characters, the byte order mark and tag characters.
fn is_format(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{0600}'..='\u{0605}'
            | '\u{061C}'
            | '\u{06DD}'
            | '\u{070F}'
            | '\u{0890}'..='\u{0891}'
            | '\u{08E2}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
            | '\u{110BD}'
            | '\u{110CD}'
            | '\u{13430}'..='\u{1343F}'
            | '\u{1BCA0}'..='\u{1BCA3}'
            | '\u{1D173}'..='\u{1D17A}'
            | '\u{E0001}'
            | '\u{E0020}'..='\u{E007F}'
    )
}

/// Collapses every run of whitespace, control or format characters into one
/// space and drops leading and trailing separators.
///
/// The result never contains CR or LF, and `sanitize(&sanitize(s)) == sanitize(s)`.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split(is_separator).filter(|w| !w.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Display adapter that renders its inner value through [`sanitize`].
#[derive(Debug, Clone, Copy)]
pub struct Sanitized<T>(pub T);

impl<T: Display> Display for Sanitized<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&sanitize(&self.0.to_string()))
    }
}

/// Formats one protocol line and appends the CRLF terminator.
///
/// Arguments should already be wrapped in [`Sanitized`]; use [`encode!`](crate::encode!)
/// rather than calling this directly. Any CR or LF coming from the format
/// literal is replaced with a space so the result is always exactly one line.
pub fn encode(args: fmt::Arguments<'_>) -> Vec<u8> {
    let mut line = String::new();
    // Writing into a String cannot fail.
    let _ = line.write_fmt(args);

    let mut line: String = line
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect();
    line.push_str(LINE_TERMINATOR);
    line.into_bytes()
}

/// Encodes a protocol line, sanitizing every argument.
///
/// Only positional `{}` style arguments are sanitized; do not use inline
/// captured identifiers in the format string.
#[macro_export]
macro_rules! encode {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::encode::encode(::std::format_args!($fmt $(, $crate::encode::Sanitized(&$arg))*))
    };
}

/// Encodes a line like [`encode!`] and writes it through a [`Client`](crate::Client).
///
/// Evaluates to the future returned by [`Client::write`](crate::Client::write);
/// the line is fully formatted before the future is created, so the future is
/// `Send` regardless of the argument types.
///
/// ```rust,ignore
/// irc_write!(client, "NOTICE {} :{}", msg.receiver, reply).await?;
/// ```
#[macro_export]
macro_rules! irc_write {
    ($client:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        let line = $crate::encode!($fmt $(, $arg)*);
        $client.write(line)
    }};
}
