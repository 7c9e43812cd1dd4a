use crate::config::EngineConfig;
use crate::engine::AvailabilityEngine;
use crate::hours::{OperatingHours, WeeklyHours};
use crate::reservation::Reservation;
use crate::time::Minutes;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use proptest::prelude::Strategy;

pub fn kathmandu() -> FixedOffset {
    FixedOffset::east_opt(5 * 3600 + 45 * 60).unwrap()
}

/// 2026-10-16, a Friday.
pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

pub fn day_before(d: NaiveDate) -> NaiveDate {
    d.pred_opt().unwrap()
}

/// The instant `hh:mm` civil time on `d` in Kathmandu.
pub fn civil_now(d: NaiveDate, hh: u32, mm: u32) -> DateTime<Utc> {
    kathmandu()
        .from_local_datetime(&d.and_hms_opt(hh, mm, 0).unwrap())
        .unwrap()
        .with_timezone(&Utc)
}

pub fn engine(buffer: u32) -> AvailabilityEngine {
    AvailabilityEngine::new(EngineConfig {
        buffer,
        ..EngineConfig::default()
    })
}

pub fn all_day() -> WeeklyHours {
    WeeklyHours::new()
}

pub fn hours(open: u32, close: u32) -> WeeklyHours {
    let window = OperatingHours::Window {
        open: Minutes(open),
        close: Minutes(close),
    };
    [
        chrono::Weekday::Mon,
        chrono::Weekday::Tue,
        chrono::Weekday::Wed,
        chrono::Weekday::Thu,
        chrono::Weekday::Fri,
        chrono::Weekday::Sat,
        chrono::Weekday::Sun,
    ]
    .into_iter()
    .fold(WeeklyHours::new(), |acc, day| acc.with_day(day, window))
}

pub fn reservation(id: &str, start: u32, end: u32) -> Reservation {
    Reservation::new(Minutes(start), Minutes(end))
        .unwrap()
        .with_id(id)
}

pub fn arb_reservation() -> impl Strategy<Value = Reservation> {
    (0..1430u32, 5..300u32).prop_map(|(start, len)| {
        let end = (start + len).min(1440);
        Reservation::new(Minutes(start), Minutes(end)).unwrap()
    })
}
