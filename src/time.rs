use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub};
use thiserror::Error;

pub const MINUTES_PER_DAY: u32 = 1440;

/// Date-time layouts accepted when a timestamp carries no offset. Such values
/// are read as UTC.
const NAIVE_LAYOUTS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed time value `{input}`")]
pub struct MalformedTimeError {
    pub input: String,
}

impl MalformedTimeError {
    fn new(input: &str) -> Self {
        MalformedTimeError {
            input: input.to_string(),
        }
    }
}

/// Minutes since civil midnight of the target day. Values past 1440 belong to
/// the following day and only show up in windows that span midnight.
#[derive(Debug, Clone, Copy, Ord, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd)]
pub struct Minutes(pub u32);

impl Minutes {
    pub const MIDNIGHT: Minutes = Minutes(0);

    pub(crate) fn is_overlapping(time: &(Minutes, Minutes), window: &(Minutes, Minutes)) -> bool {
        time.0 < window.1 && time.1 > window.0
    }

    pub fn from_hm(hours: u32, minutes: u32) -> Minutes {
        Minutes(hours * 60 + minutes)
    }

    pub fn saturating_sub(self, rhs: u32) -> Minutes {
        Minutes(self.0.saturating_sub(rhs))
    }

    /// Parses a bare `HH:MM` (or `HH:MM:SS`, seconds dropped) wall-clock value.
    pub fn parse_clock(input: &str) -> Result<Minutes, MalformedTimeError> {
        let parts = input.trim().split(':').collect::<Vec<&str>>();
        if !(2..=3).contains(&parts.len()) {
            return Err(MalformedTimeError::new(input));
        }
        let fields = parts
            .iter()
            .map(|p| {
                if p.is_empty() || p.len() > 2 || !p.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                p.parse::<u32>().ok()
            })
            .collect::<Option<Vec<u32>>>()
            .ok_or_else(|| MalformedTimeError::new(input))?;

        let (hours, minutes) = (fields[0], fields[1]);
        let seconds = fields.get(2).copied().unwrap_or(0);
        if hours > 23 || minutes > 59 || seconds > 59 {
            return Err(MalformedTimeError::new(input));
        }
        Ok(Minutes::from_hm(hours, minutes))
    }

    /// Position within its own civil day, dropping any next-day offset.
    pub fn time_of_day(self) -> Minutes {
        Minutes(self.0 % MINUTES_PER_DAY)
    }
}

impl std::fmt::Display for Minutes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let days = self.0 / MINUTES_PER_DAY;
        let remaining = self.0 % MINUTES_PER_DAY;
        let hours = remaining / 60;
        let mins = remaining % 60;
        if days == 0 {
            write!(f, "{:02}:{:02}", hours, mins)
        } else {
            write!(f, "{:02}:{:02}+{}", hours, mins, days)
        }
    }
}

impl Add<u32> for Minutes {
    type Output = Self;

    fn add(self, rhs: u32) -> Self::Output {
        Minutes(self.0 + rhs)
    }
}

impl Sub<u32> for Minutes {
    type Output = Self;

    fn sub(self, rhs: u32) -> Self::Output {
        Minutes(self.0 - rhs)
    }
}

impl Sub<Minutes> for Minutes {
    type Output = u32;

    fn sub(self, rhs: Minutes) -> Self::Output {
        self.0 - rhs.0
    }
}

impl AddAssign<u32> for Minutes {
    fn add_assign(&mut self, rhs: u32) {
        self.0 += rhs;
    }
}

/// Converts a reservation time into minutes since midnight in `zone`.
///
/// Values containing a `T` or a space are absolute timestamps: RFC 3339 input
/// is converted from its own offset, offset-less date-times are read as UTC.
/// Anything else must be a bare `HH:MM`, which is already civil time.
pub fn normalize(input: &str, zone: FixedOffset) -> Result<Minutes, MalformedTimeError> {
    let trimmed = input.trim();
    if trimmed.contains('T') || trimmed.contains(' ') {
        let instant = parse_instant(trimmed).ok_or_else(|| MalformedTimeError::new(input))?;
        let civil = instant.with_timezone(&zone);
        Ok(Minutes::from_hm(civil.hour(), civil.minute()))
    } else {
        Minutes::parse_clock(trimmed)
    }
}

fn parse_instant(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(input, layout).ok())
        .map(|naive| naive.and_utc())
}

/// The civil date `now` falls on in `zone`.
pub fn civil_date(now: DateTime<Utc>, zone: FixedOffset) -> NaiveDate {
    now.with_timezone(&zone).date_naive()
}

/// The civil minute of day `now` falls on in `zone`.
pub fn civil_minutes(now: DateTime<Utc>, zone: FixedOffset) -> Minutes {
    let civil = now.with_timezone(&zone);
    Minutes::from_hm(civil.hour(), civil.minute())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn kathmandu() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600 + 45 * 60).unwrap()
    }

    #[test]
    fn test_bare_clock() {
        assert_eq!(Ok(Minutes(540)), normalize("09:00", kathmandu()));
        assert_eq!(Ok(Minutes(0)), normalize("00:00", kathmandu()));
        assert_eq!(Ok(Minutes(1439)), normalize("23:59", kathmandu()));
        assert_eq!(Ok(Minutes(545)), normalize("9:05", kathmandu()));
        assert_eq!(Ok(Minutes(600)), normalize("10:00:59", kathmandu()));
    }

    #[test]
    fn test_bare_clock_rejects_garbage() {
        for input in ["", "9", "24:00", "12:60", "ab:cd", "+1:00", "10:00:00:00", "100:00"] {
            assert_eq!(
                Err(MalformedTimeError::new(input)),
                normalize(input, kathmandu()),
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_utc_timestamp_is_shifted_into_zone() {
        // 03:15Z is 09:00 at +05:45
        assert_eq!(Ok(Minutes(540)), normalize("2026-10-16T03:15:00Z", kathmandu()));
        assert_eq!(Ok(Minutes(540)), normalize("2026-10-16T03:15:00.000Z", kathmandu()));
    }

    #[test]
    fn test_offset_timestamp() {
        assert_eq!(
            Ok(Minutes(540)),
            normalize("2026-10-16T09:00:00+05:45", kathmandu())
        );
        assert_eq!(
            Ok(Minutes(540)),
            normalize("2026-10-15T23:15:00-04:00", kathmandu())
        );
        assert_eq!(
            Ok(Minutes(540)),
            normalize("2026-10-16 09:00:00+05:45", kathmandu())
        );
    }

    #[test]
    fn test_naive_timestamp_is_utc() {
        assert_eq!(Ok(Minutes(540)), normalize("2026-10-16T03:15:00", kathmandu()));
        assert_eq!(Ok(Minutes(540)), normalize("2026-10-16 03:15", kathmandu()));
        assert_eq!(Ok(Minutes(540)), normalize("2026-10-16T03:15", kathmandu()));
    }

    #[test]
    fn test_malformed_timestamp() {
        assert!(normalize("2026-13-16T03:15:00Z", kathmandu()).is_err());
        assert!(normalize("tomorrow at noon", kathmandu()).is_err());
    }

    #[test]
    fn test_zone_is_a_parameter() {
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(Ok(Minutes(195)), normalize("2026-10-16T03:15:00Z", utc));
    }

    #[test]
    fn test_civil_date_and_minutes() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 20, 0, 0).unwrap();
        assert_eq!(
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
            civil_date(now, kathmandu())
        );
        assert_eq!(Minutes(105), civil_minutes(now, kathmandu()));
    }

    #[test]
    fn test_display() {
        assert_eq!("09:05", Minutes(545).to_string());
        assert_eq!("06:00+1", Minutes(1800).to_string());
        assert_eq!(Minutes(360), Minutes(1800).time_of_day());
    }
}
