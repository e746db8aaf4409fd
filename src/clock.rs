//! Timekeeping helpers behind the `clock` binary
//!
//! Named layouts, timezone lookup, relative time descriptions and the
//! clipboard hook all live here so the binary stays a thin wrapper.

use crate::error::{AppError, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::time::Duration;

/// Named layouts accepted by the clock, with their strftime equivalent.
pub const LAYOUTS: &[(&[&str], &str)] = &[
    (&["", "json", "rfc3339"], "%Y-%m-%dT%H:%M:%S%:z"),
    (&["code"], "%a %b %d %H:%M:%S %Y %z"),
    (&["date", "today"], "%B %d, %Y"),
    (&["blog"], "%Y-%m-%d %H:%M:%S %z"),
    (&["file"], "%Y%m%d%H%M"),
    (&["ansic"], "%a %b %e %H:%M:%S %Y"),
    (&["ruby"], "%a %b %d %H:%M:%S %z %Y"),
    (&["unix"], "%a %b %e %H:%M:%S %Z %Y"),
    (&["kitchen"], "%-I:%M%p"),
    (&["rfc3339nano"], "%Y-%m-%dT%H:%M:%S%.9f%:z"),
    (&["rfc822"], "%d %b %y %H:%M %Z"),
    (&["rfc822z"], "%d %b %y %H:%M %z"),
    (&["rfc850"], "%A, %d-%b-%y %H:%M:%S %Z"),
    (&["rfc1123"], "%a, %d %b %Y %H:%M:%S %Z"),
    (&["rfc1123z"], "%a, %d %b %Y %H:%M:%S %z"),
    (&["stamp"], "%b %e %H:%M:%S"),
    (&["stampmilli"], "%b %e %H:%M:%S%.3f"),
    (&["stampmicro"], "%b %e %H:%M:%S%.6f"),
    (&["stampnano"], "%b %e %H:%M:%S%.9f"),
];

/// Resolve a layout name (case insensitive) or validate a strftime layout.
///
/// A custom layout must parse and contain at least one date or time field.
pub fn parse_layout(s: &str) -> Result<String> {
    let name = s.trim().to_lowercase();
    if let Some((_, layout)) = LAYOUTS.iter().find(|(names, _)| names.contains(&name.as_str())) {
        return Ok(layout.to_string());
    }

    let mut has_field = false;
    for item in StrftimeItems::new(s) {
        match item {
            Item::Error => return Err(invalid_layout(s)),
            Item::Numeric(..) | Item::Fixed(..) => has_field = true,
            _ => {}
        }
    }

    if !has_field {
        return Err(invalid_layout(s));
    }
    Ok(s.to_string())
}

fn invalid_layout(s: &str) -> AppError {
    AppError::validation(format!("{:?} is not a valid layout or layout name", s))
}

//===========================================================================
// Timezones
//===========================================================================

/// Location used to render and parse times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Utc,
    Local,
    Named(Tz),
}

impl Zone {
    /// `UTC`, `Local` (either case) or an IANA database name. An empty
    /// name means UTC; a POSIX `TZ` value starting with `:` means local.
    pub fn parse(name: &str) -> Result<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("utc") {
            return Ok(Zone::Utc);
        }
        if trimmed.eq_ignore_ascii_case("local") || trimmed.starts_with(':') {
            return Ok(Zone::Local);
        }
        trimmed
            .parse::<Tz>()
            .map(Zone::Named)
            .map_err(|_| AppError::validation(format!("cannot parse location {:?}", name)))
    }

    /// Pick the zone from the clock flags; `utc` wins over `local`
    pub fn select(tz: &str, utc: bool, local: bool) -> Result<Self> {
        if utc {
            return Ok(Zone::Utc);
        }
        if local {
            return Ok(Zone::Local);
        }
        Self::parse(tz)
    }

    /// Render `instant` in this zone with a strftime layout
    pub fn format(&self, instant: DateTime<Utc>, layout: &str) -> String {
        match self {
            Zone::Utc => instant.format(layout).to_string(),
            Zone::Local => instant.with_timezone(&Local).format(layout).to_string(),
            Zone::Named(tz) => instant.with_timezone(tz).format(layout).to_string(),
        }
    }

    /// Interpret a wall clock time in this zone
    pub fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Zone::Utc => Some(naive.and_utc()),
            Zone::Local => Local.from_local_datetime(&naive).earliest().map(|dt| dt.with_timezone(&Utc)),
            Zone::Named(tz) => tz.from_local_datetime(&naive).earliest().map(|dt| dt.with_timezone(&Utc)),
        }
    }

    /// Calendar date of `instant` in this zone
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            Zone::Utc => instant.date_naive(),
            Zone::Local => instant.with_timezone(&Local).date_naive(),
            Zone::Named(tz) => instant.with_timezone(tz).date_naive(),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Utc => write!(f, "UTC"),
            Zone::Local => write!(f, "Local"),
            Zone::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

//===========================================================================
// Commands
//===========================================================================

/// Current time in `zone` rendered with a layout name or strftime layout
pub fn now(zone: Zone, layout: &str) -> Result<String> {
    let layout = parse_layout(layout)?;
    Ok(zone.format(Utc::now(), &layout))
}

/// Time `after` from now in `zone`, rendered with a layout
pub fn after(delay: Duration, zone: Zone, layout: &str) -> Result<String> {
    let layout = parse_layout(layout)?;
    let delay = chrono::Duration::from_std(delay)
        .map_err(|_| AppError::validation("duration is too large"))?;
    let then = Utc::now()
        .checked_add_signed(delay)
        .ok_or_else(|| AppError::validation("duration is too large"))?;
    Ok(zone.format(then, &layout))
}

/// Parse a date, date and time, or a time today, in `zone`.
///
/// Accepted forms: `YYYY-MM-DD`, `YYYY-MM-DD HH:MM`, `YYYY-MM-DD HH:MM:SS`
/// and `HH:MM`.
pub fn parse_datetime(s: &str, zone: Zone) -> Result<DateTime<Utc>> {
    let s = s.trim();
    let unparsable = || AppError::parse(format!("could not parse {:?} into a datetime", s));

    let naive = if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        date.and_time(NaiveTime::MIN)
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M") {
        dt
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        dt
    } else if let Ok(time) = NaiveTime::parse_from_str(s, "%H:%M") {
        zone.date_of(Utc::now()).and_time(time)
    } else {
        return Err(unparsable());
    };

    zone.localize(naive).ok_or_else(unparsable)
}

/// Relative description of `s` from now, e.g. "3 hours from now"
pub fn until(s: &str, zone: Zone) -> Result<String> {
    let then = parse_datetime(s, zone)?;
    Ok(humanize(then, Utc::now()))
}

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 12 * MONTH;
const LONG_TIME: i64 = 37 * YEAR;

/// (upper bound in seconds, singular text, unit for plural counts)
const MAGNITUDES: &[(i64, &str, i64)] = &[
    (1, "now", 0),
    (2, "1 second", 0),
    (MINUTE, "seconds", 1),
    (2 * MINUTE, "1 minute", 0),
    (HOUR, "minutes", MINUTE),
    (2 * HOUR, "1 hour", 0),
    (DAY, "hours", HOUR),
    (2 * DAY, "1 day", 0),
    (WEEK, "days", DAY),
    (2 * WEEK, "1 week", 0),
    (MONTH, "weeks", WEEK),
    (2 * MONTH, "1 month", 0),
    (YEAR, "months", MONTH),
    (18 * MONTH, "1 year", 0),
    (2 * YEAR, "2 years", 0),
    (LONG_TIME, "years", YEAR),
];

/// Describe `then` relative to `now` in coarse human units
pub fn humanize(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let (secs, label) = if then <= now {
        ((now - then).num_seconds(), "ago")
    } else {
        ((then - now).num_seconds(), "from now")
    };

    for (bound, text, unit) in MAGNITUDES {
        if secs < *bound {
            return match (*text, *unit) {
                ("now", _) => "now".to_string(),
                (text, 0) => format!("{} {}", text, label),
                (text, unit) => format!("{} {} {}", secs / unit, text, label),
            };
        }
    }
    format!("a long while {}", label)
}

/// Put `text` on the system clipboard
#[cfg(feature = "clipboard")]
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|e| AppError::validation(format!("clipboard not supported: {}", e)))?;
    clipboard
        .set_text(text.to_string())
        .map_err(|e| AppError::validation(format!("could not copy to clipboard: {}", e)))
}

#[cfg(not(feature = "clipboard"))]
pub fn copy_to_clipboard(_text: &str) -> Result<()> {
    Err(AppError::validation("clipboard not supported"))
}
