//! Notification sinks.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub mod log;
pub mod mock;
pub mod pushover;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("delivery rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("notifier unavailable: {0}")]
    Unavailable(String),
}

/// Best-effort delivery. Callers log failures and never retry.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}
