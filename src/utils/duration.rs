//! Human readable durations in the compact `1h2m3.5s` notation

use crate::error::{AppError, Result};
use std::time::Duration;

const NANOSECOND: u128 = 1;
const MICROSECOND: u128 = 1_000 * NANOSECOND;
const MILLISECOND: u128 = 1_000 * MICROSECOND;
const SECOND: u128 = 1_000 * MILLISECOND;
const MINUTE: u128 = 60 * SECOND;
const HOUR: u128 = 60 * MINUTE;

/// Format a duration such as `120.993689ms`, `1h0m0s` or `33h36m33.689461785s`.
///
/// Durations under a second use the largest fitting sub-second unit; longer
/// ones are broken into hours, minutes and fractional seconds.
pub fn format_duration(d: Duration) -> String {
    format_nanos(d.as_nanos())
}

/// Same as [`format_duration`] for a raw nanosecond count.
pub fn format_nanos(nanos: u128) -> String {
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < MICROSECOND {
        return format!("{}ns", nanos);
    }
    if nanos < MILLISECOND {
        return format!("{}µs", fraction(nanos, MICROSECOND, 3));
    }
    if nanos < SECOND {
        return format!("{}ms", fraction(nanos, MILLISECOND, 6));
    }

    let hours = nanos / HOUR;
    let minutes = (nanos % HOUR) / MINUTE;
    let seconds = fraction(nanos % MINUTE, SECOND, 9);

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h{}m", hours, minutes));
    } else if minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    out.push_str(&seconds);
    out.push('s');
    out
}

/// `value / unit` with the remainder as trimmed decimal digits
fn fraction(value: u128, unit: u128, digits: usize) -> String {
    let whole = value / unit;
    let rem = value % unit;
    if rem == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", rem, width = digits);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Parse a duration string like `90m`, `1h30m`, `2h45m10s` or `1.5s`.
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare `0`
/// is accepted. Negative durations are rejected.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    let err = || AppError::parse(format!("invalid duration '{}'", input));

    if s.is_empty() {
        return Err(err());
    }
    let s = s.strip_prefix('+').unwrap_or(s);
    if s.starts_with('-') {
        return Err(AppError::parse(format!("negative duration '{}' is not supported", input)));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total: u128 = 0;
    let mut rest = s;

    while !rest.is_empty() {
        // Number: integer part with an optional fraction
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| AppError::parse(format!("missing unit in duration '{}'", input)))?;
        let (number, tail) = rest.split_at(num_len);
        if number.is_empty() || number == "." {
            return Err(err());
        }

        let unit_len = tail.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let scale = match unit {
            "ns" => NANOSECOND,
            "us" | "µs" | "μs" => MICROSECOND,
            "ms" => MILLISECOND,
            "s" => SECOND,
            "m" => MINUTE,
            "h" => HOUR,
            _ => {
                return Err(AppError::parse(format!(
                    "unknown unit '{}' in duration '{}'",
                    unit, input
                )))
            }
        };

        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        if frac.contains('.') {
            return Err(err());
        }
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| err())?
        };

        let mut value = whole.checked_mul(scale).ok_or_else(err)?;
        if !frac.is_empty() {
            let digits: u128 = frac.parse().map_err(|_| err())?;
            let divisor = 10u128.checked_pow(frac.len() as u32).ok_or_else(err)?;
            value = value
                .checked_add(digits.checked_mul(scale).ok_or_else(err)? / divisor)
                .ok_or_else(err)?;
        }

        total = total.checked_add(value).ok_or_else(err)?;
        rest = tail;
    }

    let secs = u64::try_from(total / SECOND).map_err(|_| err())?;
    Ok(Duration::new(secs, (total % SECOND) as u32))
}
