use crate::time::{MINUTES_PER_DAY, MalformedTimeError, Minutes, normalize};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

pub type ReservationId = Arc<str>;

/// A reservation as the reservation API hands it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReservation {
    #[serde(default)]
    pub id: Option<ReservationId>,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationError {
    #[error(transparent)]
    Malformed(#[from] MalformedTimeError),
    #[error("reservation ends at {end} but starts at {start}")]
    Inverted { start: Minutes, end: Minutes },
}

/// A reservation normalized to civil minutes of the target day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reservation {
    pub id: Option<ReservationId>,
    pub start: Minutes,
    pub end: Minutes,
}

impl Reservation {
    pub fn new(start: Minutes, end: Minutes) -> Result<Reservation, ReservationError> {
        if end <= start {
            return Err(ReservationError::Inverted { start, end });
        }
        Ok(Reservation {
            id: None,
            start,
            end,
        })
    }

    pub fn with_id(mut self, id: impl Into<ReservationId>) -> Reservation {
        self.id = Some(id.into());
        self
    }

    pub fn from_raw(raw: &RawReservation, zone: FixedOffset) -> Result<Reservation, ReservationError> {
        let start = normalize(&raw.start_time, zone)?;
        let mut end = normalize(&raw.end_time, zone)?;
        // ending at midnight means the end of this day
        if end == Minutes::MIDNIGHT && start > Minutes::MIDNIGHT {
            end = Minutes(MINUTES_PER_DAY);
        }
        let mut reservation = Reservation::new(start, end)?;
        reservation.id = raw.id.clone();
        Ok(reservation)
    }

    /// The same reservation seen from the previous day, for windows that
    /// run past midnight.
    pub fn next_day(&self) -> Reservation {
        Reservation {
            id: self.id.clone(),
            start: self.start + MINUTES_PER_DAY,
            end: self.end + MINUTES_PER_DAY,
        }
    }

    pub fn duration(&self) -> u32 {
        self.end - self.start
    }

    /// The interval no other booking may touch: the reservation widened by
    /// `buffer` on both sides.
    pub fn buffered(&self, buffer: u32) -> (Minutes, Minutes) {
        (self.start.saturating_sub(buffer), self.end + buffer)
    }

    pub fn conflicts_with(&self, interval: &(Minutes, Minutes), buffer: u32) -> bool {
        Minutes::is_overlapping(interval, &self.buffered(buffer))
    }
}

impl std::fmt::Display for Reservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{} {}-{}", id, self.start, self.end),
            None => write!(f, "{}-{}", self.start, self.end),
        }
    }
}

/// Normalizes every record, dropping (and logging) the ones that cannot be
/// read rather than failing the whole day.
pub fn normalize_all(raw: &[RawReservation], zone: FixedOffset) -> Vec<Reservation> {
    raw.iter()
        .filter_map(|r| match Reservation::from_raw(r, zone) {
            Ok(reservation) => Some(reservation),
            Err(err) => {
                warn!(
                    id = r.id.as_deref().unwrap_or("-"),
                    start = %r.start_time,
                    end = %r.end_time,
                    "dropping reservation: {err}"
                );
                None
            }
        })
        .collect()
}
