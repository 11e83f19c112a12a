use crate::history::{AttractionId, Observation};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use time::{Date, Duration, Month, PrimitiveDateTime, Weekday};

pub mod model;
pub mod pooled;
pub mod weighted;

use model::Estimator;
use pooled::PooledModel;
use weighted::WeightedModel;

/// Days either side of the anniversary date that still count as "same season".
pub const SEASON_WINDOW_DAYS: i64 = 14;

pub const ANNIVERSARY_MULTIPLIER: u32 = 4;
pub const SEASON_MULTIPLIER: u32 = 2;
pub const WEEKDAY_MULTIPLIER: u32 = 2;

/// Expected wait in minutes, or the reason none could be produced.
pub type Prediction = Result<f64, EstimationError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EstimationError {
    #[error("no history for {attraction}")]
    UnknownAttraction { attraction: AttractionId },
    #[error("no samples for {attraction} at hour {hour}")]
    NoHistory { attraction: AttractionId, hour: u8 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    #[default]
    Weighted,
    Pooled,
}

pub fn create_estimator(kind: EstimatorKind) -> Arc<dyn Estimator> {
    match kind {
        EstimatorKind::Weighted => Arc::new(WeightedModel),
        EstimatorKind::Pooled => Arc::new(PooledModel),
    }
}

/// Apply a signed hour offset to wall-clock "now".
///
/// Offsets too large to express as a `Duration` saturate instead of panicking.
pub fn query_time(now: PrimitiveDateTime, hour_offset: i64) -> PrimitiveDateTime {
    let hours = hour_offset.clamp(i64::MIN / 3600, i64::MAX / 3600);
    now.saturating_add(Duration::hours(hours))
}

/// Same month and day one year earlier; 29 February maps to 28 February.
pub fn anniversary_of(date: Date) -> Date {
    let year = date.year() - 1;
    date.replace_year(year)
        .or_else(|_| Date::from_calendar_date(year, Month::February, 28))
        .unwrap_or(Date::MIN)
}

/// The parts of a query time the weighting scheme looks at, computed once per estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub hour: u8,
    pub weekday: Weekday,
    pub anniversary: Date,
    pub season_start: Date,
    pub season_end: Date,
}

impl QueryWindow {
    pub fn new(query_time: PrimitiveDateTime) -> Self {
        let anniversary = anniversary_of(query_time.date());
        Self {
            hour: query_time.hour(),
            weekday: query_time.weekday(),
            anniversary,
            season_start: anniversary.saturating_sub(Duration::days(SEASON_WINDOW_DAYS)),
            season_end: anniversary.saturating_add(Duration::days(SEASON_WINDOW_DAYS)),
        }
    }

    pub fn matches_hour(&self, observation: &Observation) -> bool {
        observation.hour_of_day() == self.hour
    }

    /// Weight of an hour-matched observation: 1, 2, 4 or 8.
    pub fn weight(&self, observation: &Observation) -> u32 {
        let date = observation.calendar_date();
        let mut weight = 1;
        if date == self.anniversary {
            weight *= ANNIVERSARY_MULTIPLIER;
        } else if (self.season_start..=self.season_end).contains(&date) {
            weight *= SEASON_MULTIPLIER;
        }
        if observation.weekday() == self.weekday {
            weight *= WEEKDAY_MULTIPLIER;
        }
        weight
    }
}
