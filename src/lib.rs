//! Real-time availability of EV-charging slots: which start times on a day
//! are bookable and for how long.

pub mod cache;
pub mod config;
pub mod engine;
pub mod hours;
pub mod reservation;
pub mod scenario;
pub mod time;

pub use config::EngineConfig;
pub use engine::{AvailabilityEngine, DayAvailability};
pub use hours::{AdmissibleWindow, MissingHoursPolicy, OperatingHours, WeeklyHours};
pub use reservation::{RawReservation, Reservation};
pub use time::{MalformedTimeError, Minutes};
