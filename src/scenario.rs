use crate::cache::ResourceId;
use crate::config::{ConfigError, EngineConfig};
use crate::engine::{AvailabilityEngine, CheckError};
use crate::hours::{AdmissibleWindow, WeeklyHours};
use crate::reservation::{RawReservation, Reservation, ReservationId, normalize_all};
use crate::time::{MINUTES_PER_DAY, Minutes};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("cannot read scenario: {0}")]
    Io(#[from] io::Error),
    #[error("cannot parse scenario: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommitError {
    #[error("unknown port {0}")]
    UnknownPort(String),
    #[error("no calendar day follows {0}")]
    DateOutOfRange(NaiveDate),
    #[error(transparent)]
    Rejected(#[from] CheckError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Station {
    pub id: Arc<str>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub hours: WeeklyHours,
}

#[derive(Debug, Clone, Deserialize)]
struct RawPort {
    id: ResourceId,
    #[serde(default)]
    reservations: BTreeMap<NaiveDate, Vec<RawReservation>>,
}

/// In-memory stand-in for the reservation API: reservations per port and
/// civil date, exactly as the API would return them.
#[derive(Debug, Clone, Default)]
pub struct ReservationStore {
    ports: HashMap<ResourceId, BTreeMap<NaiveDate, Vec<RawReservation>>>,
    next_booking: u64,
}

impl ReservationStore {
    pub fn new() -> Self {
        ReservationStore::default()
    }

    pub fn port_ids(&self) -> Vec<&ResourceId> {
        let mut ids = self.ports.keys().collect::<Vec<&ResourceId>>();
        ids.sort();
        ids
    }

    pub fn port(&self, port: &str) -> Option<&ResourceId> {
        self.ports.get_key_value(port).map(|(id, _)| id)
    }

    pub fn reservations_for(&self, port: &str, date: NaiveDate) -> &[RawReservation] {
        self.ports
            .get(port)
            .and_then(|days| days.get(&date))
            .map(|r| r.as_slice())
            .unwrap_or_default()
    }

    pub fn reservation_count(&self, port: &str) -> usize {
        self.ports
            .get(port)
            .map(|days| days.values().map(|r| r.len()).sum())
            .unwrap_or(0)
    }

    /// Normalized reservations touching `window` on `date`. When the window
    /// runs past midnight the following day's reservations are included,
    /// shifted onto this day's minute scale.
    pub fn reservations_in_window(
        &self,
        port: &str,
        date: NaiveDate,
        window: &AdmissibleWindow,
        engine: &AvailabilityEngine,
    ) -> Vec<Reservation> {
        let zone = engine.config().zone;
        let mut reservations = normalize_all(self.reservations_for(port, date), zone);
        if window.close > Minutes(MINUTES_PER_DAY) {
            if let Some(next) = date.succ_opt() {
                reservations.extend(
                    normalize_all(self.reservations_for(port, next), zone)
                        .iter()
                        .map(Reservation::next_day),
                );
            }
        }
        reservations
    }

    /// Records a booking after re-checking it against the store's own
    /// current reservations. Returns the new reservation id and every civil
    /// date a record was filed under: a booking running past midnight is
    /// stored as two records sharing one id.
    #[allow(clippy::too_many_arguments)]
    pub fn commit(
        &mut self,
        engine: &AvailabilityEngine,
        hours: &WeeklyHours,
        port: &str,
        date: NaiveDate,
        start: Minutes,
        duration: u32,
        now: DateTime<Utc>,
    ) -> Result<(ReservationId, Vec<NaiveDate>), CommitError> {
        let Some(port_id) = self.port(port).cloned() else {
            return Err(CommitError::UnknownPort(port.to_string()));
        };

        let window = engine.window(hours, date);
        let reservations = self.reservations_in_window(port, date, &window, engine);
        let day = engine.compute(hours, date, &reservations, now);
        engine.check(&day, start, duration)?;

        let end = start + duration;
        let midnight = Minutes(MINUTES_PER_DAY);
        let pieces = if start >= midnight || end > midnight {
            let next = date.succ_opt().ok_or(CommitError::DateOutOfRange(date))?;
            if start >= midnight {
                vec![(next, start - MINUTES_PER_DAY, end - MINUTES_PER_DAY)]
            } else {
                vec![(date, start, midnight), (next, Minutes::MIDNIGHT, end - MINUTES_PER_DAY)]
            }
        } else {
            vec![(date, start, end)]
        };

        self.next_booking += 1;
        let id: ReservationId = Arc::from(format!("BK-{:04}", self.next_booking));
        let days = self.ports.entry(port_id).or_default();
        for (filed, start, end) in &pieces {
            // 24:00 is written as 00:00, which reads back as end of day
            days.entry(*filed).or_default().push(RawReservation {
                id: Some(id.clone()),
                start_time: start.time_of_day().to_string(),
                end_time: end.time_of_day().to_string(),
            });
            info!(%port, date = %filed, %start, %end, booking = %id, "booking committed");
        }
        Ok((id, pieces.into_iter().map(|(filed, _, _)| filed).collect()))
    }
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub station: Station,
    pub config: EngineConfig,
    pub store: ReservationStore,
}

impl Scenario {
    pub fn from_json(data: &str) -> Result<Self, ScenarioError> {
        #[derive(Deserialize)]
        struct RawData {
            station: Station,
            #[serde(default)]
            config: EngineConfig,
            ports: Vec<RawPort>,
        }
        let raw: RawData = serde_json::from_str(data)?;
        raw.config.validate()?;

        let mut store = ReservationStore::new();
        for port in raw.ports {
            store.ports.insert(port.id, port.reservations);
        }
        info!(
            station = %raw.station.id,
            ports = store.ports.len(),
            "scenario loaded"
        );

        Ok(Scenario {
            station: raw.station,
            config: raw.config,
            store,
        })
    }

    pub fn load_from_file(path: &str) -> Result<Self, ScenarioError> {
        let data = std::fs::read_to_string(path)?;
        Scenario::from_json(&data)
    }
}
