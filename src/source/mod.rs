//! Live wait-time readings.
//!
//! A source answers "what is the posted wait right now" for one attraction.
//! `Ok(None)` means no usable reading: the attraction was not listed, was
//! closed, or reported zero.

use crate::history::AttractionId;
use crate::lightning::LaneStatus;
use async_trait::async_trait;
use thiserror::Error;

pub mod mock;
pub mod thrill;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected http status {0}")]
    Status(u16),
    #[error("scripted failure: {0}")]
    Scripted(String),
}

#[async_trait]
pub trait LiveReadingSource: Send + Sync {
    async fn current_wait(&self, attraction_id: &AttractionId) -> Result<Option<u32>, SourceError>;
}

/// Lightning Lane availability for one attraction.
///
/// `Ok(None)` means the attraction is not listed at all.
#[async_trait]
pub trait LightningLaneSource: Send + Sync {
    async fn lane_status(&self, attraction_id: &AttractionId) -> Result<Option<LaneStatus>, SourceError>;
}

/// Zero is never a real reading; the upstream page uses it for "unknown".
pub fn reading_from_minutes(minutes: u32) -> Option<u32> {
    (minutes > 0).then_some(minutes)
}
