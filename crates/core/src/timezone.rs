//! Conversion between the provider's Cairo wall clock and a viewer's zone.
//!
//! Working hours are defined in `Africa/Cairo`. By default the Cairo UTC
//! offset is derived from a month heuristic (UTC+3 from April through
//! October, UTC+2 otherwise) instead of the IANA database, which keeps the
//! displayed slots stable regardless of Egypt's yearly DST decisions.
//! [`OffsetRule::Iana`] switches to the real transition rules.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::errors::{BookingError, BookingResult};

/// Zone the working hours are defined in.
pub const PROVIDER_TZ: Tz = chrono_tz::Africa::Cairo;

/// How the Cairo UTC offset for a calendar date is determined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetRule {
    /// +3 from April through October, +2 otherwise.
    #[default]
    Heuristic,
    /// Transitions from the bundled IANA database.
    Iana,
}

impl std::str::FromStr for OffsetRule {
    type Err = BookingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "heuristic" => Ok(OffsetRule::Heuristic),
            "iana" => Ok(OffsetRule::Iana),
            other => Err(BookingError::Validation(format!(
                "Unknown offset rule '{other}', expected 'heuristic' or 'iana'"
            ))),
        }
    }
}

/// Cairo's UTC offset in hours under the month heuristic.
pub fn cairo_offset_hours(date: NaiveDate) -> i64 {
    if (4..=10).contains(&date.month()) { 3 } else { 2 }
}

/// UTC instant of a Cairo wall-clock time on `date`.
pub fn provider_instant(date: NaiveDate, time: NaiveTime, rule: OffsetRule) -> DateTime<Utc> {
    let wall = date.and_time(time);
    let heuristic = || Utc.from_utc_datetime(&(wall - Duration::hours(cairo_offset_hours(date))));

    match rule {
        OffsetRule::Heuristic => heuristic(),
        OffsetRule::Iana => match PROVIDER_TZ.from_local_datetime(&wall) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
            // Wall time skipped by a spring-forward transition.
            LocalResult::None => heuristic(),
        },
    }
}

/// Parse an IANA zone name such as `America/New_York`.
pub fn parse_timezone(name: &str) -> BookingResult<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| BookingError::Validation(format!("Unknown timezone: {}", name.trim())))
}

/// `instant` on the wall clock of `tz`.
pub fn to_zone(instant: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    instant.with_timezone(&tz)
}

/// `HH:MM` wall-clock time of `instant` in `tz`.
pub fn utc_to_user_time(instant: DateTime<Utc>, tz: Tz) -> String {
    to_zone(instant, tz).format("%H:%M").to_string()
}

/// Interpret a viewer-local date and time in `tz`.
///
/// Returns `None` for wall times that do not exist in `tz` (DST gaps).
/// Ambiguous times resolve to the earlier instant.
pub fn local_to_utc(date: NaiveDate, time: NaiveTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Twelve-hour display form: `8:00 AM`, `12:30 PM`, `12:00 AM`.
pub fn format_12h(time: NaiveTime) -> String {
    let (is_pm, hour) = time.hour12();
    let period = if is_pm { "PM" } else { "AM" };
    format!("{}:{:02} {}", hour, time.minute(), period)
}

/// Day, short month, year and 24-hour time, e.g. `18 Sep 2025, 08:00`.
pub fn format_in_zone(instant: DateTime<Utc>, tz: Tz) -> String {
    to_zone(instant, tz).format("%d %b %Y, %H:%M").to_string()
}
