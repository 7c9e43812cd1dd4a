//! Caller-side cache of computed availability. The engine itself never
//! caches; this sits in front of it, keyed by resource and date.

use crate::engine::DayAvailability;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tracing::debug;

pub type ResourceId = Arc<str>;

pub const DEFAULT_TTL_SECS: i64 = 120;

#[derive(Debug)]
struct CachedDay {
    computed_at: DateTime<Utc>,
    day: DayAvailability,
}

fn is_fresh(entry: &CachedDay, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
    now >= entry.computed_at && now - entry.computed_at < ttl
}

#[derive(Debug)]
pub struct AvailabilityCache {
    ttl: TimeDelta,
    entries: HashMap<ResourceId, HashMap<NaiveDate, CachedDay>>,
}

impl Default for AvailabilityCache {
    fn default() -> Self {
        AvailabilityCache::new(TimeDelta::seconds(DEFAULT_TTL_SECS))
    }
}

impl AvailabilityCache {
    pub fn new(ttl: TimeDelta) -> Self {
        AvailabilityCache {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, resource: &str, date: NaiveDate, now: DateTime<Utc>) -> Option<&DayAvailability> {
        self.entries
            .get(resource)
            .and_then(|days| days.get(&date))
            .filter(|entry| is_fresh(entry, now, self.ttl))
            .map(|entry| &entry.day)
    }

    pub fn insert(&mut self, resource: ResourceId, now: DateTime<Utc>, day: DayAvailability) {
        self.entries.entry(resource).or_default().insert(
            day.date,
            CachedDay {
                computed_at: now,
                day,
            },
        );
    }

    /// Returns the cached day when still fresh, otherwise runs `compute` and
    /// stores its result.
    pub fn get_or_compute<F>(
        &mut self,
        resource: &ResourceId,
        date: NaiveDate,
        now: DateTime<Utc>,
        compute: F,
    ) -> &DayAvailability
    where
        F: FnOnce() -> DayAvailability,
    {
        let ttl = self.ttl;
        let cached = match self.entries.entry(resource.clone()).or_default().entry(date) {
            Entry::Occupied(occupied) if is_fresh(occupied.get(), now, ttl) => {
                debug!(%resource, %date, "availability cache hit");
                occupied.into_mut()
            }
            Entry::Occupied(mut occupied) => {
                debug!(%resource, %date, "availability cache stale");
                occupied.insert(CachedDay {
                    computed_at: now,
                    day: compute(),
                });
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => {
                debug!(%resource, %date, "availability cache miss");
                vacant.insert(CachedDay {
                    computed_at: now,
                    day: compute(),
                })
            }
        };
        &cached.day
    }

    /// Drops the entry for `resource` on `date`. Call whenever a reservation
    /// is created for that pair.
    pub fn invalidate(&mut self, resource: &str, date: NaiveDate) -> bool {
        let removed = self
            .entries
            .get_mut(resource)
            .and_then(|days| days.remove(&date))
            .is_some();
        if removed {
            debug!(%resource, %date, "availability cache invalidated");
        }
        removed
    }

    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl;
        let mut evicted = 0;
        for days in self.entries.values_mut() {
            let before = days.len();
            days.retain(|_, entry| is_fresh(entry, now, ttl));
            evicted += before - days.len();
        }
        self.entries.retain(|_, days| !days.is_empty());
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(|days| days.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
