//! Go-style duration strings.
//!
//! Durations are written as a sequence of decimal numbers, each with an
//! optional fraction and a unit suffix: `1h30m`, `0m3s`, `1.5s`, `250ms`.
//! Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`.

use std::fmt::Write;
use std::time::Duration;

use thiserror::Error;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Errors from [`parse_duration`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    /// The input is not a duration at all.
    #[error("invalid duration '{0}'")]
    Invalid(String),

    /// A number was not followed by a unit.
    #[error("missing unit in duration '{0}'")]
    MissingUnit(String),

    /// The unit suffix is not recognised.
    #[error("unknown unit '{unit}' in duration '{input}'")]
    UnknownUnit {
        /// The offending unit.
        unit: String,
        /// The whole input.
        input: String,
    },

    /// Negative durations cannot be represented.
    #[error("negative duration '{0}'")]
    Negative(String),

    /// The duration does not fit into 64 bits of nanoseconds.
    #[error("duration '{0}' is too large")]
    Overflow(String),
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60 * NANOS_PER_SEC),
        "h" => Some(3600 * NANOS_PER_SEC),
        _ => None,
    }
}

/// Parses a duration such as `1h30m` or `250ms`.
///
/// ```rust,ignore
/// assert_eq!(parse_duration("1m30s")?, Duration::from_secs(90));
/// ```
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let invalid = || DurationError::Invalid(input.to_string());

    if let Some(magnitude) = input.strip_prefix('-') {
        let duration = parse_duration(magnitude)?;
        if !duration.is_zero() {
            return Err(DurationError::Negative(input.to_string()));
        }
        return Ok(Duration::ZERO);
    }
    let mut rest = input.strip_prefix('+').unwrap_or(input);

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (int_part, after_int) = rest.split_at(int_len);

        let (frac_part, after_num) = match after_int.strip_prefix('.') {
            Some(after_dot) => {
                let frac_len = after_dot
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(after_dot.len());
                after_dot.split_at(frac_len)
            }
            None => ("", after_int),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }

        let unit_len = after_num
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after_num.len());
        let (unit, after_unit) = after_num.split_at(unit_len);
        if unit.is_empty() {
            return Err(DurationError::MissingUnit(input.to_string()));
        }
        let scale = unit_nanos(unit).ok_or_else(|| DurationError::UnknownUnit {
            unit: unit.to_string(),
            input: input.to_string(),
        })?;

        let overflow = || DurationError::Overflow(input.to_string());
        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| overflow())?
        };
        let mut value = whole.checked_mul(scale).ok_or_else(overflow)?;

        if !frac_part.is_empty() {
            // Digits beyond nanosecond precision cannot change the result.
            let digits = &frac_part[..frac_part.len().min(18)];
            let numerator: u128 = digits.parse().map_err(|_| invalid())?;
            let denominator = 10u128.pow(digits.len() as u32);
            value += numerator * scale / denominator;
        }

        total = total.checked_add(value).ok_or_else(overflow)?;
        if total > u128::from(u64::MAX) {
            return Err(overflow());
        }
        rest = after_unit;
    }

    Ok(Duration::from_nanos(total as u64))
}

/// Formats a duration the way Go prints one: `1h30m0s`, `3s`, `250ms`.
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < NANOS_PER_MICRO {
        return format!("{nanos}ns");
    }
    if nanos < NANOS_PER_MILLI {
        return format!("{}µs", decimal(nanos, NANOS_PER_MICRO));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", decimal(nanos, NANOS_PER_MILLI));
    }

    let secs = duration.as_secs();
    let (hours, minutes) = (secs / 3600, (secs % 3600) / 60);

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h");
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    let seconds = u128::from(secs % 60) * NANOS_PER_SEC + u128::from(duration.subsec_nanos());
    let _ = write!(out, "{}s", decimal(seconds, NANOS_PER_SEC));
    out
}

fn decimal(value: u128, unit: u128) -> String {
    let (whole, rem) = (value / unit, value % unit);
    if rem == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let frac = format!("{rem:0width$}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// `serde` adapter storing a [`Duration`] as a Go-style string.
///
/// ```rust,ignore
/// #[derive(Deserialize)]
/// struct Config {
///     #[serde(with = "marvin_modules::duration::as_string")]
///     timeout: Duration,
/// }
/// ```
pub mod as_string {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    use super::{format_duration, parse_duration};

    /// Serializes as a Go-style string.
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*duration))
    }

    /// Deserializes from a Go-style string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
