//! Historical wait-time samples.
//!
//! The [`SampleStore`] is built once at startup from per-attraction CSV
//! sub-periods and shared read-only by every monitor afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use time::{Date, PrimitiveDateTime, Weekday};

pub mod csv;

/// Identity of a monitored attraction: its display name, matched exactly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttractionId(String);

impl AttractionId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttractionId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// One historical sample. Hour, weekday and date are derived from `timestamp`.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub attraction_id: AttractionId,
    pub timestamp: PrimitiveDateTime,
    pub wait_minutes: f64,
}

impl Observation {
    /// Returns `None` when the wait is negative or not finite.
    pub fn new(
        attraction_id: AttractionId,
        timestamp: PrimitiveDateTime,
        wait_minutes: f64,
    ) -> Option<Self> {
        if !wait_minutes.is_finite() || wait_minutes < 0.0 {
            return None;
        }
        Some(Self {
            attraction_id,
            timestamp,
            wait_minutes,
        })
    }

    pub fn hour_of_day(&self) -> u8 {
        self.timestamp.hour()
    }

    pub fn weekday(&self) -> Weekday {
        self.timestamp.weekday()
    }

    pub fn calendar_date(&self) -> Date {
        self.timestamp.date()
    }
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed history file {path}: {reason}")]
    Format { path: PathBuf, reason: String },
}

/// Read-only mapping from attraction to its observations.
#[derive(Debug, Default)]
pub struct SampleStore {
    samples: BTreeMap<AttractionId, Vec<Observation>>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, observations: impl IntoIterator<Item = Observation>) {
        for observation in observations {
            self.samples
                .entry(observation.attraction_id.clone())
                .or_default()
                .push(observation);
        }
    }

    pub fn observations(&self, attraction_id: &AttractionId) -> Option<&[Observation]> {
        self.samples.get(attraction_id).map(Vec::as_slice)
    }

    pub fn attractions(&self) -> impl Iterator<Item = &AttractionId> {
        self.samples.keys()
    }

    pub fn len(&self) -> usize {
        self.samples.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sort each attraction's samples by timestamp once loading is complete.
    pub fn finish(mut self) -> Self {
        for observations in self.samples.values_mut() {
            observations.sort_by_key(|o| o.timestamp);
        }
        self
    }
}
