use crate::time::{MINUTES_PER_DAY, MalformedTimeError, Minutes};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What to do for a weekday the station has no hours configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingHoursPolicy {
    /// Treat the day as 24-hour operation so incomplete configuration never
    /// blocks bookings.
    #[default]
    AlwaysOpen,
    Closed,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOperatingHours {
    #[serde(default)]
    is_24_hours: bool,
    #[serde(default)]
    is_closed: bool,
    open: Option<String>,
    close: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawOperatingHours")]
pub enum OperatingHours {
    AllDay,
    Closed,
    Window { open: Minutes, close: Minutes },
}

impl TryFrom<RawOperatingHours> for OperatingHours {
    type Error = MalformedTimeError;

    fn try_from(raw: RawOperatingHours) -> Result<Self, Self::Error> {
        if raw.is_closed {
            return Ok(OperatingHours::Closed);
        }
        if raw.is_24_hours {
            return Ok(OperatingHours::AllDay);
        }
        let open = Minutes::parse_clock(raw.open.as_deref().unwrap_or_default())?;
        let close = Minutes::parse_clock(raw.close.as_deref().unwrap_or_default())?;
        Ok(OperatingHours::Window { open, close })
    }
}

impl OperatingHours {
    pub fn window(&self) -> AdmissibleWindow {
        match *self {
            OperatingHours::AllDay => AdmissibleWindow::all_day(),
            OperatingHours::Closed => AdmissibleWindow::closed(),
            OperatingHours::Window { open, close } => {
                let close = if close > open {
                    close
                } else {
                    close + MINUTES_PER_DAY
                };
                AdmissibleWindow {
                    is_24_hours: false,
                    open,
                    close,
                }
            }
        }
    }
}

/// Half-open `[open, close)` range of bookable start minutes. `close` may
/// exceed 1440 when the hours run past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissibleWindow {
    pub is_24_hours: bool,
    pub open: Minutes,
    pub close: Minutes,
}

impl AdmissibleWindow {
    pub fn all_day() -> Self {
        AdmissibleWindow {
            is_24_hours: true,
            open: Minutes::MIDNIGHT,
            close: Minutes(MINUTES_PER_DAY),
        }
    }

    pub fn closed() -> Self {
        AdmissibleWindow {
            is_24_hours: false,
            open: Minutes::MIDNIGHT,
            close: Minutes::MIDNIGHT,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.close <= self.open
    }

    pub fn contains(&self, minute: Minutes) -> bool {
        self.open <= minute && minute < self.close
    }

    pub fn len(&self) -> u32 {
        self.close.0.saturating_sub(self.open.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WeeklyHours(HashMap<Weekday, OperatingHours>);

impl WeeklyHours {
    pub fn new() -> Self {
        WeeklyHours(HashMap::new())
    }

    pub fn with_day(mut self, day: Weekday, hours: OperatingHours) -> Self {
        self.0.insert(day, hours);
        self
    }

    pub fn get(&self, day: Weekday) -> Option<&OperatingHours> {
        self.0.get(&day)
    }

    pub fn resolve(&self, date: NaiveDate, policy: MissingHoursPolicy) -> AdmissibleWindow {
        match (self.0.get(&date.weekday()), policy) {
            (Some(hours), _) => hours.window(),
            (None, MissingHoursPolicy::AlwaysOpen) => AdmissibleWindow::all_day(),
            (None, MissingHoursPolicy::Closed) => AdmissibleWindow::closed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        // 2026-10-12 is a Monday
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn window(open: u32, close: u32) -> OperatingHours {
        OperatingHours::Window {
            open: Minutes(open),
            close: Minutes(close),
        }
    }

    #[test]
    fn test_regular_day() {
        let hours = WeeklyHours::new().with_day(Weekday::Mon, window(480, 1200));
        let resolved = hours.resolve(date(12), MissingHoursPolicy::AlwaysOpen);
        assert_eq!(Minutes(480), resolved.open);
        assert_eq!(Minutes(1200), resolved.close);
        assert!(!resolved.is_24_hours);
        assert_eq!(720, resolved.len());
    }

    #[test]
    fn test_midnight_spanning_window() {
        let hours = WeeklyHours::new().with_day(Weekday::Fri, window(1320, 360));
        let resolved = hours.resolve(date(16), MissingHoursPolicy::AlwaysOpen);
        assert_eq!(Minutes(1320), resolved.open);
        assert_eq!(Minutes(1800), resolved.close);
        assert!(resolved.contains(Minutes(1795)));
        assert!(!resolved.contains(Minutes(1800)));
    }

    #[test]
    fn test_equal_open_and_close_is_full_cycle() {
        let resolved = window(600, 600).window();
        assert_eq!(Minutes(600), resolved.open);
        assert_eq!(Minutes(2040), resolved.close);
    }

    #[test]
    fn test_missing_day_fails_open() {
        let hours = WeeklyHours::new().with_day(Weekday::Mon, window(480, 1200));
        let resolved = hours.resolve(date(13), MissingHoursPolicy::AlwaysOpen);
        assert_eq!(AdmissibleWindow::all_day(), resolved);
    }

    #[test]
    fn test_missing_day_policy_override() {
        let resolved = WeeklyHours::new().resolve(date(13), MissingHoursPolicy::Closed);
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_deserialize_table() {
        let hours: WeeklyHours = serde_json::from_str(
            r#"{
                "monday": {"is24Hours": true},
                "tue": {"open": "08:00", "close": "20:00"},
                "Sunday": {"isClosed": true},
                "friday": {"is24Hours": false, "open": "22:00", "close": "06:00"}
            }"#,
        )
        .unwrap();
        assert_eq!(Some(&OperatingHours::AllDay), hours.get(Weekday::Mon));
        assert_eq!(Some(&window(480, 1200)), hours.get(Weekday::Tue));
        assert_eq!(Some(&OperatingHours::Closed), hours.get(Weekday::Sun));
        assert_eq!(Some(&window(1320, 360)), hours.get(Weekday::Fri));
        assert_eq!(None, hours.get(Weekday::Wed));
    }

    #[test]
    fn test_deserialize_rejects_malformed_hours() {
        let result = serde_json::from_str::<WeeklyHours>(r#"{"monday": {"open": "8am", "close": "20:00"}}"#);
        assert!(result.is_err());
        let result = serde_json::from_str::<WeeklyHours>(r#"{"monday": {"close": "20:00"}}"#);
        assert!(result.is_err());
    }
}
