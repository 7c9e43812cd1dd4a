use crate::config::EngineConfig;
use crate::engine::slots::Slot;
use crate::reservation::Reservation;
use crate::time::Minutes;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationRejection {
    #[error("{duration} minutes is below the {min} minute minimum")]
    TooShort { duration: u32, min: u32 },
    #[error("{duration} minutes is above the {max} minute maximum")]
    TooLong { duration: u32, max: u32 },
    #[error("only {available} continuous minutes are free from {start}, {duration} requested")]
    ExceedsAvailable {
        start: Minutes,
        duration: u32,
        available: u32,
    },
    #[error("booking from {start} for {duration} minutes overlaps reservation {reservation}")]
    Overlaps {
        start: Minutes,
        duration: u32,
        reservation: Reservation,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationOption {
    pub minutes: u32,
    pub is_max: bool,
}

pub fn validate_duration(slot: &Slot, duration: u32, config: &EngineConfig) -> Result<(), DurationRejection> {
    if duration < config.min_duration {
        return Err(DurationRejection::TooShort {
            duration,
            min: config.min_duration,
        });
    }
    if duration > config.max_duration {
        return Err(DurationRejection::TooLong {
            duration,
            max: config.max_duration,
        });
    }
    if duration > slot.max_continuous {
        return Err(DurationRejection::ExceedsAvailable {
            start: slot.start,
            duration,
            available: slot.max_continuous,
        });
    }
    // implied by the max continuous bound, checked on its own anyway
    let booking = (slot.start, slot.start + duration);
    if let Some(reservation) = slot
        .conflicts
        .iter()
        .find(|r| r.conflicts_with(&booking, config.buffer))
    {
        return Err(DurationRejection::Overlaps {
            start: slot.start,
            duration,
            reservation: reservation.clone(),
        });
    }
    Ok(())
}

/// The fixed menu up to the slot's max continuous duration, plus that exact
/// maximum when it is off-menu.
pub fn duration_menu(slot: &Slot, config: &EngineConfig) -> Vec<DurationOption> {
    let max = slot.max_continuous;
    let mut minutes = config
        .duration_menu
        .iter()
        .copied()
        .filter(|m| *m >= config.min_duration && *m <= max && *m <= config.max_duration)
        .collect::<Vec<u32>>();
    if max > config.min_duration && max <= config.max_duration && !minutes.contains(&max) {
        minutes.push(max);
    }
    minutes.sort_unstable();
    minutes.dedup();
    minutes
        .into_iter()
        .map(|m| DurationOption {
            minutes: m,
            is_max: m == max,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(start: u32, max_continuous: u32) -> Slot {
        Slot {
            start: Minutes(start),
            is_available: max_continuous > 0,
            max_continuous,
            conflicts: vec![],
        }
    }

    fn menu(slot: &Slot) -> Vec<u32> {
        duration_menu(slot, &EngineConfig::default())
            .into_iter()
            .map(|o| o.minutes)
            .collect()
    }

    #[test]
    fn test_menu_with_off_menu_max() {
        assert_eq!(vec![30, 50], menu(&slot(600, 50)));
    }

    #[test]
    fn test_menu_with_on_menu_max() {
        assert_eq!(vec![30, 60, 90, 120], menu(&slot(600, 120)));
        let options = duration_menu(&slot(600, 120), &EngineConfig::default());
        assert_eq!(
            vec![false, false, false, true],
            options.iter().map(|o| o.is_max).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_menu_full() {
        assert_eq!(
            vec![30, 60, 90, 120, 180, 240, 300, 360, 480],
            menu(&slot(600, 480))
        );
        assert_eq!(
            vec![30, 60, 90, 120, 180, 240, 300, 360, 475],
            menu(&slot(600, 475))
        );
    }

    #[test]
    fn test_menu_exactly_minimum_or_less() {
        assert_eq!(vec![30], menu(&slot(600, 30)));
        assert!(menu(&slot(600, 25)).is_empty());
        assert!(menu(&slot(600, 0)).is_empty());
    }

    #[test]
    fn test_validate_bounds() {
        let config = EngineConfig::default();
        let s = slot(600, 480);
        assert_eq!(
            Err(DurationRejection::TooShort { duration: 25, min: 30 }),
            validate_duration(&s, 25, &config)
        );
        assert_eq!(
            Err(DurationRejection::TooLong { duration: 485, max: 480 }),
            validate_duration(&s, 485, &config)
        );
        assert_eq!(Ok(()), validate_duration(&s, 30, &config));
        assert_eq!(Ok(()), validate_duration(&s, 480, &config));
    }

    #[test]
    fn test_validate_against_max_continuous() {
        let config = EngineConfig::default();
        let s = slot(600, 50);
        assert_eq!(Ok(()), validate_duration(&s, 50, &config));
        assert_eq!(
            Err(DurationRejection::ExceedsAvailable {
                start: Minutes(600),
                duration: 60,
                available: 50
            }),
            validate_duration(&s, 60, &config)
        );
    }

    #[test]
    fn test_validate_checks_conflicts_independently() {
        // a slot whose max continuous value disagrees with its conflicts
        let config = EngineConfig::default();
        let blocking = Reservation::new(Minutes(620), Minutes(700)).unwrap();
        let s = Slot {
            start: Minutes(600),
            is_available: true,
            max_continuous: 120,
            conflicts: vec![blocking.clone()],
        };
        assert_eq!(
            Err(DurationRejection::Overlaps {
                start: Minutes(600),
                duration: 30,
                reservation: blocking
            }),
            validate_duration(&s, 30, &config)
        );
    }
}
