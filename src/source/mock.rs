use crate::history::AttractionId;
use crate::lightning::LaneStatus;
use crate::source::{LightningLaneSource, LiveReadingSource, SourceError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
pub enum ScriptedReading {
    Minutes(u32),
    Absent,
    Fail(String),
}

#[derive(Debug, Clone)]
pub enum ScriptedLane {
    Status(LaneStatus),
    NotListed,
    Fail(String),
}

/// Replays a fixed sequence of readings per attraction, then reports absent.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<AttractionId, VecDeque<ScriptedReading>>>,
    lane_scripts: Mutex<HashMap<AttractionId, VecDeque<ScriptedLane>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(
        self,
        attraction_id: impl Into<AttractionId>,
        readings: impl IntoIterator<Item = ScriptedReading>,
    ) -> Self {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts
                .entry(attraction_id.into())
                .or_default()
                .extend(readings);
        }
        self
    }

    pub fn with_lane_script(
        self,
        attraction_id: impl Into<AttractionId>,
        statuses: impl IntoIterator<Item = ScriptedLane>,
    ) -> Self {
        if let Ok(mut scripts) = self.lane_scripts.lock() {
            scripts
                .entry(attraction_id.into())
                .or_default()
                .extend(statuses);
        }
        self
    }

    /// Wait-time reads served so far; Lightning Lane reads are not counted.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LiveReadingSource for ScriptedSource {
    async fn current_wait(&self, attraction_id: &AttractionId) -> Result<Option<u32>, SourceError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let next = self
            .scripts
            .lock()
            .map_err(|_| SourceError::Scripted("script lock poisoned".to_string()))?
            .get_mut(attraction_id)
            .and_then(VecDeque::pop_front);
        match next {
            Some(ScriptedReading::Minutes(minutes)) => Ok(super::reading_from_minutes(minutes)),
            Some(ScriptedReading::Fail(reason)) => Err(SourceError::Scripted(reason)),
            Some(ScriptedReading::Absent) | None => Ok(None),
        }
    }
}

#[async_trait]
impl LightningLaneSource for ScriptedSource {
    async fn lane_status(&self, attraction_id: &AttractionId) -> Result<Option<LaneStatus>, SourceError> {
        let next = self
            .lane_scripts
            .lock()
            .map_err(|_| SourceError::Scripted("script lock poisoned".to_string()))?
            .get_mut(attraction_id)
            .and_then(VecDeque::pop_front);
        match next {
            Some(ScriptedLane::Status(status)) => Ok(Some(status)),
            Some(ScriptedLane::Fail(reason)) => Err(SourceError::Scripted(reason)),
            Some(ScriptedLane::NotListed) | None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_script_in_order() -> Result<(), SourceError> {
        let source = ScriptedSource::new().with_script(
            "Autopia",
            [
                ScriptedReading::Minutes(25),
                ScriptedReading::Minutes(0),
                ScriptedReading::Absent,
            ],
        );
        let id = AttractionId::new("Autopia");

        assert_eq!(source.current_wait(&id).await?, Some(25));
        assert_eq!(source.current_wait(&id).await?, None);
        assert_eq!(source.current_wait(&id).await?, None);
        assert_eq!(source.current_wait(&id).await?, None);
        assert_eq!(source.calls(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn lane_script_is_independent_of_waits() -> Result<(), SourceError> {
        let source = ScriptedSource::new()
            .with_script("Autopia", [ScriptedReading::Minutes(25)])
            .with_lane_script("Autopia", [ScriptedLane::Status(LaneStatus::SoldOut)]);
        let id = AttractionId::new("Autopia");

        assert_eq!(source.lane_status(&id).await?, Some(LaneStatus::SoldOut));
        assert_eq!(source.lane_status(&id).await?, None);
        assert_eq!(source.current_wait(&id).await?, Some(25));
        assert_eq!(source.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn scripted_failure_surfaces_as_error() {
        let source =
            ScriptedSource::new().with_script("Autopia", [ScriptedReading::Fail("timeout".into())]);

        let err = source
            .current_wait(&AttractionId::new("Autopia"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "scripted failure: timeout");
    }
}
