//! Lightning Lane return-time watching.
//!
//! Each watched attraction reports its next return time (or that passes are
//! sold out, or that the attraction is closed). A watch notifies when the
//! return time moves inside its window, and once more if passes then run out
//! or the attraction closes.

use crate::clock::Clock;
use crate::error::AppError;
use crate::history::AttractionId;
use crate::notify::{Notification, Notifier};
use crate::source::LightningLaneSource;
use crate::state::AppState;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{PrimitiveDateTime, Time};
use tracing::{debug, info, warn};

pub const DEFAULT_LANE_INTERVAL: Duration = Duration::from_secs(30);
pub const NOTIFICATION_TITLE: &str = "Lightning Lane Status";

const RETURN_TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[hour repr:12 padding:none]:[minute] [period case_sensitive:false]"
);
const SOON_MINUTES: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaneStatus {
    /// Next return window opens at this local time.
    ReturnAt(Time),
    SoldOut,
    Closed,
    /// Text in the return-time cell that is not a clock time.
    Unrecognized(String),
}

impl LaneStatus {
    /// Interpret the text of the Lightning Lane link.
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        match Time::parse(text, RETURN_TIME_FORMAT) {
            Ok(at) => LaneStatus::ReturnAt(at),
            Err(_) if text.eq_ignore_ascii_case("sold out") => LaneStatus::SoldOut,
            Err(_) if text.eq_ignore_ascii_case("closed") => LaneStatus::Closed,
            Err(_) => LaneStatus::Unrecognized(text.to_string()),
        }
    }

    /// Minutes from `now` until the return time, rolling past midnight.
    pub fn minutes_until(&self, now: PrimitiveDateTime) -> Option<i64> {
        match self {
            LaneStatus::ReturnAt(at) => Some(minutes_until(now, *at)),
            _ => None,
        }
    }
}

impl fmt::Display for LaneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneStatus::ReturnAt(at) => match at.format(RETURN_TIME_FORMAT) {
                Ok(formatted) => f.write_str(&formatted),
                Err(_) => write!(f, "{at}"),
            },
            LaneStatus::SoldOut => f.write_str("Sold Out"),
            LaneStatus::Closed => f.write_str("Closed"),
            LaneStatus::Unrecognized(text) => f.write_str(text),
        }
    }
}

pub fn minutes_until(now: PrimitiveDateTime, at: Time) -> i64 {
    let mut target = now.replace_time(at);
    if target < now {
        target = target.saturating_add(time::Duration::days(1));
    }
    (target - now).whole_minutes()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneSettings {
    pub interval: Duration,
    /// Notify when the return time is at most this many minutes away.
    pub window_minutes: i64,
}

impl Default for LaneSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_LANE_INTERVAL,
            window_minutes: 90,
        }
    }
}

/// Latest published view of one Lightning Lane watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneSnapshot {
    pub attraction_id: AttractionId,
    pub status: Option<LaneStatus>,
    pub minutes_until: Option<i64>,
    pub in_window: bool,
    pub notifications_sent: u64,
    pub last_tick: Option<SystemTime>,
}

impl LaneSnapshot {
    pub fn pending(attraction_id: AttractionId) -> Self {
        Self {
            attraction_id,
            status: None,
            minutes_until: None,
            in_window: false,
            notifications_sent: 0,
            last_tick: None,
        }
    }
}

#[derive(Clone)]
pub struct LaneContext {
    pub source: Arc<dyn LightningLaneSource>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub state: Arc<RwLock<AppState>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaneOutcome {
    NotListed,
    SourceFailed(String),
    Observed {
        status: LaneStatus,
        notification: Option<Notification>,
        delivered: bool,
    },
}

#[derive(Debug)]
pub struct LaneWatch {
    attraction_id: AttractionId,
    settings: LaneSettings,
    previous: Option<LaneStatus>,
    in_window: bool,
    notifications_sent: u64,
}

impl LaneWatch {
    pub fn new(attraction_id: AttractionId, settings: LaneSettings) -> Self {
        Self {
            attraction_id,
            settings,
            previous: None,
            in_window: false,
            notifications_sent: 0,
        }
    }

    pub fn attraction_id(&self) -> &AttractionId {
        &self.attraction_id
    }

    pub fn settings(&self) -> &LaneSettings {
        &self.settings
    }

    pub fn in_window(&self) -> bool {
        self.in_window
    }

    /// Feed one status through the watch. Only a changed status can notify.
    pub fn observe(&mut self, status: LaneStatus, now: PrimitiveDateTime) -> Option<Notification> {
        if self.previous.as_ref() == Some(&status) {
            return None;
        }

        let minutes = status.minutes_until(now);
        let notification = match minutes {
            Some(minutes) if minutes <= self.settings.window_minutes => {
                if self.in_window {
                    None
                } else {
                    self.in_window = true;
                    let soon = if minutes <= SOON_MINUTES { " (within the hour)" } else { "" };
                    Some(self.notification(format!("{}: {status}{soon}", self.attraction_id)))
                }
            }
            _ => {
                let ran_out = self.in_window
                    && matches!(status, LaneStatus::SoldOut | LaneStatus::Closed);
                self.in_window = false;
                ran_out.then(|| self.notification(format!("{}: {status}", self.attraction_id)))
            }
        };

        self.previous = Some(status);
        notification
    }

    pub async fn tick(&mut self, ctx: &LaneContext) -> LaneOutcome {
        let status = match ctx.source.lane_status(&self.attraction_id).await {
            Ok(Some(status)) => status,
            Ok(None) => {
                debug!(attraction = %self.attraction_id, "Attraction not listed on Lightning Lane page");
                return LaneOutcome::NotListed;
            }
            Err(err) => {
                warn!(attraction = %self.attraction_id, error = %err, "Lightning Lane read failed");
                return LaneOutcome::SourceFailed(err.to_string());
            }
        };

        let now = ctx.clock.now();
        let notification = self.observe(status.clone(), now);
        let mut delivered = false;
        if let Some(notification) = &notification {
            info!(attraction = %self.attraction_id, status = %status, "Lightning Lane update");
            match ctx.notifier.send(notification).await {
                Ok(()) => {
                    delivered = true;
                    self.notifications_sent += 1;
                }
                Err(err) => {
                    warn!(attraction = %self.attraction_id, error = %err, "Notification not delivered");
                }
            }
        }

        let snapshot = LaneSnapshot {
            attraction_id: self.attraction_id.clone(),
            minutes_until: status.minutes_until(now),
            status: Some(status.clone()),
            in_window: self.in_window,
            notifications_sent: self.notifications_sent,
            last_tick: Some(SystemTime::now()),
        };
        if let Err(err) = publish_lane(&ctx.state, snapshot) {
            warn!(attraction = %self.attraction_id, error = %err, "Failed to publish lane snapshot");
        }

        LaneOutcome::Observed {
            status,
            notification,
            delivered,
        }
    }

    fn notification(&self, body: String) -> Notification {
        Notification::new(NOTIFICATION_TITLE, body)
    }
}

pub fn publish_lane(state: &RwLock<AppState>, snapshot: LaneSnapshot) -> Result<(), AppError> {
    let mut guard = state.write().map_err(|_| AppError::StateLock)?;
    guard.record_lane(snapshot);
    Ok(())
}
