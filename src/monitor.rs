//! Per-attraction notification state machine.
//!
//! A [`Monitor`] remembers the last category it announced (and, optionally,
//! the last live reading). A tick only notifies when the category changes,
//! including the first classification after startup.

use crate::classify::{Category, Classifier};
use crate::clock::Clock;
use crate::estimation::model::Estimator;
use crate::estimation::{EstimationError, query_time};
use crate::history::{AttractionId, SampleStore};
use crate::notify::{Notification, Notifier};
use crate::source::LiveReadingSource;
use crate::state::{AppState, MonitorSnapshot, TickStatus, publish};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub interval: Duration,
    /// Signed hours added to wall-clock "now" before estimating.
    pub hour_offset: i64,
    pub classifier: Classifier,
    /// Also announce every drop in the live wait.
    pub track_decrease: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            hour_offset: 0,
            classifier: Classifier::default(),
            track_decrease: false,
        }
    }
}

/// Result of feeding one prediction/reading pair through the state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub category: Category,
    pub changed: bool,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    NoHistory(EstimationError),
    NoReading { prediction: f64 },
    SourceFailed { prediction: f64, reason: String },
    Classified {
        prediction: f64,
        actual: u32,
        evaluation: Evaluation,
        delivered: usize,
    },
}

/// Everything a tick needs besides the monitor's own state. Cheap to clone.
#[derive(Clone)]
pub struct TickContext {
    pub store: Arc<SampleStore>,
    pub estimator: Arc<dyn Estimator>,
    pub source: Arc<dyn LiveReadingSource>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub state: Arc<RwLock<AppState>>,
}

#[derive(Debug)]
pub struct Monitor {
    attraction_id: AttractionId,
    settings: MonitorSettings,
    last_category: Option<Category>,
    last_actual_wait: Option<u32>,
    notifications_sent: u64,
}

impl Monitor {
    pub fn new(attraction_id: AttractionId, settings: MonitorSettings) -> Self {
        Self {
            attraction_id,
            settings,
            last_category: None,
            last_actual_wait: None,
            notifications_sent: 0,
        }
    }

    pub fn attraction_id(&self) -> &AttractionId {
        &self.attraction_id
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn last_category(&self) -> Option<Category> {
        self.last_category
    }

    pub fn last_actual_wait(&self) -> Option<u32> {
        self.last_actual_wait
    }

    pub fn notifications_sent(&self) -> u64 {
        self.notifications_sent
    }

    /// Advance the state machine with a prediction and a valid live reading.
    pub fn evaluate(&mut self, prediction: f64, actual: u32) -> Evaluation {
        let category = self.settings.classifier.classify(prediction, actual);
        let changed = self.last_category != Some(category);
        let mut notifications = Vec::new();

        if changed {
            notifications.push(self.category_notification(category, prediction, actual));
            self.last_category = Some(category);
        }

        if self.settings.track_decrease
            && let Some(previous) = self.last_actual_wait
            && actual < previous
        {
            notifications.push(Notification::new(
                self.title(),
                format!("Wait time has decreased! (Previous: {previous} mins, Now: {actual} mins)"),
            ));
        }
        self.last_actual_wait = Some(actual);

        Evaluation {
            category,
            changed,
            notifications,
        }
    }

    /// Run one scheduled evaluation: estimate, read, classify, notify, publish.
    pub async fn tick(&mut self, ctx: &TickContext) -> TickOutcome {
        let at = query_time(ctx.clock.now(), self.settings.hour_offset);
        let prediction = match ctx.estimator.estimate(&ctx.store, &self.attraction_id, at) {
            Ok(prediction) => prediction,
            Err(err) => {
                debug!(attraction = %self.attraction_id, error = %err, "Skipping tick without history");
                self.publish(ctx, TickStatus::NoHistory, None, None);
                return TickOutcome::NoHistory(err);
            }
        };

        let actual = match ctx.source.current_wait(&self.attraction_id).await {
            Ok(Some(actual)) => actual,
            Ok(None) => {
                debug!(attraction = %self.attraction_id, "No live reading this tick");
                self.publish(ctx, TickStatus::NoReading, Some(prediction), None);
                return TickOutcome::NoReading { prediction };
            }
            Err(err) => {
                warn!(attraction = %self.attraction_id, error = %err, "Live reading failed");
                self.publish(ctx, TickStatus::SourceError, Some(prediction), None);
                return TickOutcome::SourceFailed {
                    prediction,
                    reason: err.to_string(),
                };
            }
        };

        let previous = self.last_category;
        let evaluation = self.evaluate(prediction, actual);
        if evaluation.changed {
            info!(
                attraction = %self.attraction_id,
                from = ?previous,
                to = %evaluation.category,
                prediction = format_args!("{prediction:.2}"),
                actual,
                "Category changed"
            );
        }

        let mut delivered = 0;
        for notification in &evaluation.notifications {
            match ctx.notifier.send(notification).await {
                Ok(()) => {
                    delivered += 1;
                    self.notifications_sent += 1;
                }
                Err(err) => {
                    warn!(attraction = %self.attraction_id, error = %err, "Notification not delivered");
                }
            }
        }

        self.publish(ctx, TickStatus::Classified, Some(prediction), Some(actual));
        TickOutcome::Classified {
            prediction,
            actual,
            evaluation,
            delivered,
        }
    }

    fn publish(
        &self,
        ctx: &TickContext,
        status: TickStatus,
        prediction: Option<f64>,
        actual: Option<u32>,
    ) {
        let snapshot = MonitorSnapshot {
            attraction_id: self.attraction_id.clone(),
            category: self.last_category,
            prediction_minutes: prediction,
            actual_minutes: actual,
            status,
            notifications_sent: self.notifications_sent,
            last_tick: Some(SystemTime::now()),
        };
        if let Err(err) = publish(&ctx.state, snapshot) {
            warn!(attraction = %self.attraction_id, error = %err, "Failed to publish monitor snapshot");
        }
    }

    fn title(&self) -> String {
        format!("{} Wait Time Update", self.attraction_id)
    }

    fn category_notification(&self, category: Category, prediction: f64, actual: u32) -> Notification {
        Notification::new(
            self.title(),
            format!(
                "{} (Predicted: {prediction:.2} mins, Actual: {actual} mins)",
                category.headline()
            ),
        )
    }
}

/// Process-wide set of monitors keyed by attraction.
#[derive(Debug, Default)]
pub struct MonitorRegistry {
    monitors: BTreeMap<AttractionId, Monitor>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the monitor it replaced, if the attraction was already registered.
    pub fn insert(&mut self, monitor: Monitor) -> Option<Monitor> {
        self.monitors.insert(monitor.attraction_id.clone(), monitor)
    }

    pub fn get(&self, attraction_id: &AttractionId) -> Option<&Monitor> {
        self.monitors.get(attraction_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &AttractionId> {
        self.monitors.keys()
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    pub fn into_monitors(self) -> Vec<Monitor> {
        self.monitors.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::BandMode;
    use crate::clock::FixedClock;
    use crate::estimation::weighted::WeightedModel;
    use crate::history::Observation;
    use crate::notify::mock::RecordingNotifier;
    use crate::source::mock::{ScriptedReading, ScriptedSource};
    use time::macros::datetime;

    fn monitor(track_decrease: bool) -> Monitor {
        Monitor::new(
            AttractionId::new("Space Mountain"),
            MonitorSettings {
                track_decrease,
                ..MonitorSettings::default()
            },
        )
    }

    #[test]
    fn first_classification_notifies() {
        let mut monitor = monitor(false);

        let evaluation = monitor.evaluate(44.12, 30);

        assert_eq!(evaluation.category, Category::Good);
        assert!(evaluation.changed);
        assert_eq!(evaluation.notifications.len(), 1);
        assert_eq!(evaluation.notifications[0].title, "Space Mountain Wait Time Update");
        assert_eq!(
            evaluation.notifications[0].body,
            "Good time to go! (Predicted: 44.12 mins, Actual: 30 mins)"
        );
        assert_eq!(monitor.last_category(), Some(Category::Good));
    }

    #[test]
    fn identical_ticks_notify_once() {
        let mut monitor = monitor(false);

        let total: usize = (0..5)
            .map(|_| monitor.evaluate(44.12, 30).notifications.len())
            .sum();

        assert_eq!(total, 1);
    }

    #[test]
    fn category_change_notifies_each_time() {
        let mut monitor = monitor(false);

        assert_eq!(monitor.evaluate(44.12, 30).notifications.len(), 1);
        let evaluation = monitor.evaluate(44.12, 35);
        assert_eq!(evaluation.category, Category::Average);
        assert_eq!(evaluation.notifications.len(), 1);
        assert!(evaluation.notifications[0].body.starts_with("Average wait time."));
        assert_eq!(monitor.evaluate(44.12, 36).notifications.len(), 0);
        assert_eq!(monitor.evaluate(44.12, 60).category, Category::Bad);
        assert_eq!(monitor.evaluate(44.12, 20).notifications.len(), 1);
    }

    #[test]
    fn two_band_monitor_only_flips_between_good_and_not_good() {
        let mut monitor = Monitor::new(
            AttractionId::new("Star Tours"),
            MonitorSettings {
                classifier: Classifier::new(10.0, BandMode::Two),
                ..MonitorSettings::default()
            },
        );

        assert_eq!(monitor.evaluate(30.0, 35).category, Category::NotGood);
        assert_eq!(monitor.evaluate(30.0, 60).notifications.len(), 0);
        let evaluation = monitor.evaluate(30.0, 15);
        assert_eq!(evaluation.category, Category::Good);
        assert_eq!(evaluation.notifications.len(), 1);
    }

    #[test]
    fn decrease_notification_is_independent_of_category() {
        let mut monitor = monitor(true);

        assert_eq!(monitor.evaluate(44.12, 40).notifications.len(), 1);
        // Same AVERAGE category, lower wait.
        let evaluation = monitor.evaluate(44.12, 38);
        assert!(!evaluation.changed);
        assert_eq!(evaluation.notifications.len(), 1);
        assert_eq!(
            evaluation.notifications[0].body,
            "Wait time has decreased! (Previous: 40 mins, Now: 38 mins)"
        );
        // Category change and decrease together.
        assert_eq!(monitor.evaluate(44.12, 30).notifications.len(), 2);
        // Increase: nothing.
        assert_eq!(monitor.evaluate(44.12, 31).notifications.len(), 0);
        assert_eq!(monitor.last_actual_wait(), Some(31));
    }

    #[test]
    fn decrease_tracking_is_off_by_default() {
        let mut monitor = monitor(false);

        monitor.evaluate(44.12, 40);

        assert_eq!(monitor.evaluate(44.12, 38).notifications.len(), 0);
    }

    fn context(
        source: Arc<ScriptedSource>,
        notifier: Arc<RecordingNotifier>,
    ) -> TickContext {
        let id = AttractionId::new("Space Mountain");
        let mut store = SampleStore::new();
        // Far from the anniversary and not on the query weekday: plain mean.
        store.insert(
            [20.0, 40.0]
                .into_iter()
                .filter_map(|wait| Observation::new(id.clone(), datetime!(2024-10-01 14:00), wait)),
        );
        let state = Arc::new(RwLock::new(AppState::new()));
        TickContext {
            store: Arc::new(store.finish()),
            estimator: Arc::new(WeightedModel),
            source,
            notifier,
            // 2025-05-02 is a Friday.
            clock: Arc::new(FixedClock(datetime!(2025-05-02 14:10))),
            state,
        }
    }

    #[tokio::test]
    async fn absent_readings_keep_prior_category() {
        let source = Arc::new(ScriptedSource::new().with_script(
            "Space Mountain",
            [
                ScriptedReading::Minutes(15),
                ScriptedReading::Absent,
                ScriptedReading::Minutes(0),
            ],
        ));
        let notifier = Arc::new(RecordingNotifier::new());
        let ctx = context(source, Arc::clone(&notifier));
        let mut monitor = monitor(false);

        let first = monitor.tick(&ctx).await;
        let second = monitor.tick(&ctx).await;
        let third = monitor.tick(&ctx).await;

        assert!(matches!(first, TickOutcome::Classified { delivered: 1, .. }));
        assert_eq!(second, TickOutcome::NoReading { prediction: 30.0 });
        assert_eq!(third, TickOutcome::NoReading { prediction: 30.0 });
        assert_eq!(monitor.last_category(), Some(Category::Good));
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn no_history_aborts_before_reading() {
        let source = Arc::new(ScriptedSource::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let mut ctx = context(Arc::clone(&source), Arc::clone(&notifier));
        ctx.clock = Arc::new(FixedClock(datetime!(2025-05-02 09:00)));
        let mut monitor = monitor(false);

        let outcome = monitor.tick(&ctx).await;

        assert!(matches!(outcome, TickOutcome::NoHistory(EstimationError::NoHistory { hour: 9, .. })));
        assert_eq!(source.calls(), 0);
        assert!(notifier.sent().is_empty());
        assert_eq!(monitor.last_category(), None);
    }

    #[tokio::test]
    async fn hour_offset_selects_the_history_hour() {
        let id = AttractionId::new("Space Mountain");
        let mut store = SampleStore::new();
        store.insert(
            [20.0, 40.0]
                .into_iter()
                .filter_map(|wait| Observation::new(id.clone(), datetime!(2024-10-01 11:00), wait)),
        );
        let source = Arc::new(
            ScriptedSource::new().with_script("Space Mountain", [ScriptedReading::Minutes(15)]),
        );
        let notifier = Arc::new(RecordingNotifier::new());
        let mut ctx = context(Arc::clone(&source), Arc::clone(&notifier));
        ctx.store = Arc::new(store.finish());
        let settings = |hour_offset| MonitorSettings {
            hour_offset,
            ..MonitorSettings::default()
        };

        let mut shifted = Monitor::new(id.clone(), settings(-3));
        let outcome = shifted.tick(&ctx).await;
        assert!(matches!(outcome, TickOutcome::Classified { prediction, actual: 15, .. } if prediction == 30.0));

        let mut unshifted = Monitor::new(id, settings(0));
        let outcome = unshifted.tick(&ctx).await;
        assert!(matches!(outcome, TickOutcome::NoHistory(EstimationError::NoHistory { hour: 14, .. })));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn source_failure_is_contained() {
        let source = Arc::new(
            ScriptedSource::new().with_script("Space Mountain", [ScriptedReading::Fail("dns".into())]),
        );
        let notifier = Arc::new(RecordingNotifier::new());
        let ctx = context(source, Arc::clone(&notifier));
        let mut monitor = monitor(false);

        let outcome = monitor.tick(&ctx).await;

        assert!(matches!(outcome, TickOutcome::SourceFailed { .. }));
        assert!(notifier.sent().is_empty());
        let guard = ctx.state.read().expect("state readable");
        let snapshot = guard
            .snapshot(&AttractionId::new("Space Mountain"))
            .expect("snapshot published");
        assert_eq!(snapshot.status, TickStatus::SourceError);
        assert_eq!(snapshot.prediction_minutes, Some(30.0));
    }

    #[tokio::test]
    async fn failed_delivery_still_counts_as_transition() {
        let source = Arc::new(ScriptedSource::new().with_script(
            "Space Mountain",
            [ScriptedReading::Minutes(15), ScriptedReading::Minutes(15)],
        ));
        let notifier = Arc::new(RecordingNotifier::failing());
        let ctx = context(source, Arc::clone(&notifier));
        let mut monitor = monitor(false);

        let first = monitor.tick(&ctx).await;
        let second = monitor.tick(&ctx).await;

        assert!(matches!(first, TickOutcome::Classified { delivered: 0, .. }));
        match second {
            TickOutcome::Classified { evaluation, .. } => assert!(!evaluation.changed),
            other => panic!("expected classified tick, got {other:?}"),
        }
        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(monitor.notifications_sent(), 0);
    }

    #[test]
    fn registry_keys_by_attraction() {
        let mut registry = MonitorRegistry::new();
        assert!(registry.insert(monitor(false)).is_none());
        assert!(registry.insert(monitor(true)).is_some());
        registry.insert(Monitor::new(AttractionId::new("Autopia"), MonitorSettings::default()));

        let ids: Vec<&str> = registry.ids().map(AttractionId::as_str).collect();

        assert_eq!(ids, vec!["Autopia", "Space Mountain"]);
        assert_eq!(registry.len(), 2);
        let space = registry
            .get(&AttractionId::new("Space Mountain"))
            .expect("registered");
        assert!(space.settings().track_decrease);
    }
}
