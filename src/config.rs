use crate::hours::MissingHoursPolicy;
use crate::time::{MINUTES_PER_DAY, Minutes};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub const DEFAULT_MENU: [u32; 9] = [30, 60, 90, 120, 180, 240, 300, 360, 480];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid zone offset `{0}`, expected e.g. +05:45")]
    InvalidZone(String),
    #[error("slot granularity must be positive")]
    ZeroGranularity,
    #[error("minimum duration {min} exceeds maximum duration {max}")]
    InvertedDurationBounds { min: u32, max: u32 },
    #[error("duration menu is empty")]
    EmptyMenu,
    #[error("maximum duration must be positive")]
    ZeroMaxDuration,
    #[error("{field} of {value} minutes exceeds one day")]
    LongerThanDay { field: &'static str, value: u32 },
}

/// Knobs of the availability computation. Every field has a default so a
/// scenario file may override any subset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(deserialize_with = "deserialize_zone")]
    pub zone: FixedOffset,
    pub granularity: u32,
    pub buffer: u32,
    pub min_duration: u32,
    pub max_duration: u32,
    pub duration_menu: Vec<u32>,
    pub missing_hours: MissingHoursPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            zone: kathmandu(),
            granularity: 5,
            buffer: 5,
            min_duration: 30,
            max_duration: 480,
            duration_menu: DEFAULT_MENU.to_vec(),
            missing_hours: MissingHoursPolicy::AlwaysOpen,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.granularity == 0 {
            return Err(ConfigError::ZeroGranularity);
        }
        if self.max_duration == 0 {
            return Err(ConfigError::ZeroMaxDuration);
        }
        for (field, value) in [
            ("granularity", self.granularity),
            ("buffer", self.buffer),
            ("maxDuration", self.max_duration),
        ] {
            if value > MINUTES_PER_DAY {
                return Err(ConfigError::LongerThanDay { field, value });
            }
        }
        if self.min_duration > self.max_duration {
            return Err(ConfigError::InvertedDurationBounds {
                min: self.min_duration,
                max: self.max_duration,
            });
        }
        if self.duration_menu.is_empty() {
            return Err(ConfigError::EmptyMenu);
        }
        Ok(())
    }
}

const KATHMANDU_OFFSET_SECS: i32 = 5 * 3600 + 45 * 60;

fn kathmandu() -> FixedOffset {
    FixedOffset::east_opt(KATHMANDU_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Parses a `+HH:MM` / `-HH:MM` offset, or `Z` for UTC.
pub fn parse_zone(input: &str) -> Result<FixedOffset, ConfigError> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }
    let (sign, rest) = match trimmed.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(ConfigError::InvalidZone(input.to_string())),
    };
    let Minutes(offset) =
        Minutes::parse_clock(rest).map_err(|_| ConfigError::InvalidZone(input.to_string()))?;
    FixedOffset::east_opt(sign * offset as i32 * 60)
        .ok_or_else(|| ConfigError::InvalidZone(input.to_string()))
}

fn deserialize_zone<'de, D>(deserializer: D) -> Result<FixedOffset, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_zone(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(5 * 3600 + 45 * 60, config.zone.local_minus_utc());
        assert_eq!(5, config.granularity);
        assert_eq!(5, config.buffer);
        assert_eq!(30, config.min_duration);
        assert_eq!(480, config.max_duration);
        assert_eq!(Ok(()), config.validate());
    }

    #[test]
    fn test_parse_zone() {
        assert_eq!(Ok(20700), parse_zone("+05:45").map(|z| z.local_minus_utc()));
        assert_eq!(Ok(-16200), parse_zone("-04:30").map(|z| z.local_minus_utc()));
        assert_eq!(Ok(0), parse_zone("Z").map(|z| z.local_minus_utc()));
        assert!(parse_zone("05:45").is_err());
        assert!(parse_zone("Asia/Kathmandu").is_err());
    }

    #[test]
    fn test_partial_override() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"buffer": 10, "zone": "+01:00", "missingHours": "closed"}"#)
                .unwrap();
        assert_eq!(10, config.buffer);
        assert_eq!(3600, config.zone.local_minus_utc());
        assert_eq!(MissingHoursPolicy::Closed, config.missing_hours);
        assert_eq!(480, config.max_duration);
    }

    #[test]
    fn test_validate() {
        let config = EngineConfig {
            granularity: 0,
            ..EngineConfig::default()
        };
        assert_eq!(Err(ConfigError::ZeroGranularity), config.validate());

        let config = EngineConfig {
            min_duration: 500,
            ..EngineConfig::default()
        };
        assert_eq!(
            Err(ConfigError::InvertedDurationBounds { min: 500, max: 480 }),
            config.validate()
        );
    }

    #[test]
    fn test_validate_rejects_zero_and_oversized_values() {
        let config = EngineConfig {
            min_duration: 0,
            max_duration: 0,
            ..EngineConfig::default()
        };
        assert_eq!(Err(ConfigError::ZeroMaxDuration), config.validate());

        let config = EngineConfig {
            buffer: u32::MAX,
            ..EngineConfig::default()
        };
        assert_eq!(
            Err(ConfigError::LongerThanDay {
                field: "buffer",
                value: u32::MAX
            }),
            config.validate()
        );

        let config = EngineConfig {
            max_duration: 1441,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::LongerThanDay { field: "maxDuration", .. })
        ));

        let config = EngineConfig {
            granularity: 1440,
            buffer: 1440,
            max_duration: 1440,
            ..EngineConfig::default()
        };
        assert_eq!(Ok(()), config.validate());
    }
}
