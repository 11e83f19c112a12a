use crate::classify::Category;
use crate::error::AppError;
use crate::history::AttractionId;
use crate::lightning::LaneSnapshot;
use std::collections::BTreeMap;
use std::time::SystemTime;

/// How the last tick of a monitor ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// Registered, not ticked yet.
    Pending,
    Classified,
    NoHistory,
    NoReading,
    SourceError,
}

/// Latest published view of one monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSnapshot {
    pub attraction_id: AttractionId,
    pub category: Option<Category>,
    pub prediction_minutes: Option<f64>,
    pub actual_minutes: Option<u32>,
    pub status: TickStatus,
    pub notifications_sent: u64,
    pub last_tick: Option<SystemTime>,
}

impl MonitorSnapshot {
    pub fn pending(attraction_id: AttractionId) -> Self {
        Self {
            attraction_id,
            category: None,
            prediction_minutes: None,
            actual_minutes: None,
            status: TickStatus::Pending,
            notifications_sent: 0,
            last_tick: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct AppState {
    snapshots: BTreeMap<AttractionId, MonitorSnapshot>,
    lanes: BTreeMap<AttractionId, LaneSnapshot>,
    scheduler_mode: Option<String>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, attraction_id: AttractionId) {
        self.snapshots
            .entry(attraction_id.clone())
            .or_insert_with(|| MonitorSnapshot::pending(attraction_id));
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &MonitorSnapshot> {
        self.snapshots.values()
    }

    pub fn snapshot(&self, attraction_id: &AttractionId) -> Option<&MonitorSnapshot> {
        self.snapshots.get(attraction_id)
    }

    pub fn record(&mut self, snapshot: MonitorSnapshot) {
        self.snapshots
            .insert(snapshot.attraction_id.clone(), snapshot);
    }

    pub fn register_lane(&mut self, attraction_id: AttractionId) {
        self.lanes
            .entry(attraction_id.clone())
            .or_insert_with(|| LaneSnapshot::pending(attraction_id));
    }

    pub fn lanes(&self) -> impl Iterator<Item = &LaneSnapshot> {
        self.lanes.values()
    }

    pub fn lane(&self, attraction_id: &AttractionId) -> Option<&LaneSnapshot> {
        self.lanes.get(attraction_id)
    }

    pub fn record_lane(&mut self, snapshot: LaneSnapshot) {
        self.lanes.insert(snapshot.attraction_id.clone(), snapshot);
    }

    pub fn scheduler_mode(&self) -> Option<&str> {
        self.scheduler_mode.as_deref()
    }

    pub fn set_scheduler_mode(&mut self, mode: impl Into<String>) {
        self.scheduler_mode = Some(mode.into());
    }
}

/// Write a snapshot into shared state.
pub fn publish(
    state: &std::sync::RwLock<AppState>,
    snapshot: MonitorSnapshot,
) -> Result<(), AppError> {
    let mut guard = state.write().map_err(|_| AppError::StateLock)?;
    guard.record(snapshot);
    Ok(())
}
