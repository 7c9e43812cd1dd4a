use crate::config::EngineConfig;
use crate::hours::AdmissibleWindow;
use crate::reservation::Reservation;
use crate::time::Minutes;
use serde::Serialize;

/// One candidate start time of the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    #[serde(rename = "startMinutes")]
    pub start: Minutes,
    pub is_available: bool,
    #[serde(rename = "maxContinuousDurationMinutes")]
    pub max_continuous: u32,
    /// Reservations whose buffered interval covers part of this slot.
    pub conflicts: Vec<Reservation>,
}

/// Reservations whose buffered interval overlaps `[start, start + granularity)`.
pub fn conflicts_at(start: Minutes, reservations: &[Reservation], config: &EngineConfig) -> Vec<Reservation> {
    let slot = (start, start + config.granularity);
    reservations
        .iter()
        .filter(|r| r.conflicts_with(&slot, config.buffer))
        .cloned()
        .collect()
}

fn horizon(start: Minutes, window: &AdmissibleWindow, config: &EngineConfig) -> Minutes {
    window.close.min(start + config.max_duration)
}

// assumes no reservation covers `start`
fn free_run(start: Minutes, window: &AdmissibleWindow, reservations: &[Reservation], config: &EngineConfig) -> u32 {
    let horizon = horizon(start, window, config);
    let next_conflict = reservations
        .iter()
        .map(|r| r.buffered(config.buffer).0)
        .filter(|buffered_start| *buffered_start >= start)
        .min()
        .unwrap_or(horizon);
    next_conflict
        .min(horizon)
        .0
        .saturating_sub(start.0)
        .min(config.max_duration)
}

/// Longest booking that may start at `start` without touching any buffered
/// reservation. Zero whenever the start itself is blocked, including by a
/// reservation that began earlier and is still running.
pub fn max_continuous_duration(
    start: Minutes,
    window: &AdmissibleWindow,
    reservations: &[Reservation],
    config: &EngineConfig,
) -> u32 {
    if !conflicts_at(start, reservations, config).is_empty() {
        return 0;
    }
    free_run(start, window, reservations, config)
}

pub fn generate_slots(
    window: &AdmissibleWindow,
    reservations: &[Reservation],
    earliest: Minutes,
    config: &EngineConfig,
) -> Vec<Slot> {
    if window.is_empty() {
        return vec![];
    }

    (window.open.0..window.close.0)
        .step_by(config.granularity.max(1) as usize)
        .map(Minutes)
        .filter(|start| *start >= earliest)
        .map(|start| {
            let conflicts = conflicts_at(start, reservations, config);
            let is_available = conflicts.is_empty();
            let max_continuous = if is_available {
                free_run(start, window, reservations, config)
            } else {
                0
            };
            Slot {
                start,
                is_available,
                max_continuous,
                conflicts,
            }
        })
        .collect()
}
