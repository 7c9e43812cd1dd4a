//! Slot and duration availability for a single charging port and day.
//!
//! Everything here is a pure function of the reservations, the operating
//! hours, the target date and an injected "now". The output is advisory: two
//! callers may see the same slot as free, and only the reservation store's
//! commit decides who gets it.

pub mod duration;
pub mod slots;

#[cfg(test)]
mod tests;

use crate::config::EngineConfig;
use crate::engine::duration::{DurationOption, DurationRejection, duration_menu, validate_duration};
use crate::engine::slots::{Slot, generate_slots};
use crate::hours::{AdmissibleWindow, WeeklyHours};
use crate::reservation::{RawReservation, Reservation, normalize_all};
use crate::time::{MINUTES_PER_DAY, Minutes, civil_date, civil_minutes};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("no slot starts at {0}")]
    UnknownSlot(Minutes),
    #[error(transparent)]
    Rejected(#[from] DurationRejection),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub window: AdmissibleWindow,
    pub slots: Vec<Slot>,
}

impl DayAvailability {
    pub fn slot_at(&self, start: Minutes) -> Option<&Slot> {
        self.slots
            .binary_search_by_key(&start, |s| s.start)
            .ok()
            .map(|idx| &self.slots[idx])
    }

    pub fn available_slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|s| s.is_available)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AvailabilityEngine {
    config: EngineConfig,
}

impl AvailabilityEngine {
    pub fn new(config: EngineConfig) -> Self {
        AvailabilityEngine { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn window(&self, hours: &WeeklyHours, date: NaiveDate) -> AdmissibleWindow {
        hours.resolve(date, self.config.missing_hours)
    }

    // yesterday keeps the tail of a window running past midnight
    fn earliest_start(&self, date: NaiveDate, window: &AdmissibleWindow, now: DateTime<Utc>) -> Option<Minutes> {
        let today = civil_date(now, self.config.zone);
        let minute = civil_minutes(now, self.config.zone);
        match date.cmp(&today) {
            Ordering::Less
                if date.succ_opt() == Some(today) && window.close > Minutes(MINUTES_PER_DAY) =>
            {
                Some(minute + MINUTES_PER_DAY)
            }
            Ordering::Less => None,
            Ordering::Equal => Some(minute),
            Ordering::Greater => Some(Minutes::MIDNIGHT),
        }
    }

    pub fn compute(
        &self,
        hours: &WeeklyHours,
        date: NaiveDate,
        reservations: &[Reservation],
        now: DateTime<Utc>,
    ) -> DayAvailability {
        let window = self.window(hours, date);
        let slots = match self.earliest_start(date, &window, now) {
            Some(earliest) => generate_slots(&window, reservations, earliest, &self.config),
            None => vec![],
        };
        let day = DayAvailability { date, window, slots };

        debug!(
            %date,
            open = %window.open,
            close = %window.close,
            reservations = reservations.len(),
            slots = day.slots.len(),
            available = day.available_slots().count(),
            "computed availability"
        );
        self.assert_invariants(&day, reservations);
        day
    }

    /// Like [`compute`](Self::compute) for records straight from the
    /// reservation API. Unreadable records are dropped and logged.
    pub fn compute_from_raw(
        &self,
        hours: &WeeklyHours,
        date: NaiveDate,
        raw: &[RawReservation],
        now: DateTime<Utc>,
    ) -> DayAvailability {
        let reservations = normalize_all(raw, self.config.zone);
        self.compute(hours, date, &reservations, now)
    }

    pub fn durations(&self, slot: &Slot) -> Vec<DurationOption> {
        duration_menu(slot, &self.config)
    }

    pub fn validate(&self, slot: &Slot, duration: u32) -> Result<(), DurationRejection> {
        validate_duration(slot, duration, &self.config)
    }

    pub fn check(&self, day: &DayAvailability, start: Minutes, duration: u32) -> Result<(), CheckError> {
        let slot = day.slot_at(start).ok_or(CheckError::UnknownSlot(start))?;
        Ok(self.validate(slot, duration)?)
    }

    fn assert_invariants(&self, day: &DayAvailability, reservations: &[Reservation]) {
        debug_assert!(
            day.slots
                .iter()
                .all(|s| s.is_available == (s.max_continuous > 0)),
            "availability <-> max continuous duration invariant violated"
        );
        debug_assert!(
            day.slots
                .iter()
                .all(|s| s.is_available == s.conflicts.is_empty()),
            "availability <-> conflicts invariant violated"
        );
        debug_assert!(
            day.slots.iter().all(|s| {
                let booking = (s.start, s.start + s.max_continuous);
                s.max_continuous <= self.config.max_duration
                    && s.start + s.max_continuous <= day.window.close
                    && reservations
                        .iter()
                        .all(|r| s.max_continuous == 0 || !r.conflicts_with(&booking, self.config.buffer))
            }),
            "max continuous booking overlaps a reservation or leaves the window"
        );
        debug_assert!(
            day.slots.windows(2).all(|w| w[0].start < w[1].start),
            "slots out of order"
        );
    }
}
