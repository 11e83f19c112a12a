use crate::notify::{Notification, Notifier, NotifyError};
use async_trait::async_trait;
use std::sync::Mutex;

/// Records every notification it is asked to send, optionally failing delivery.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records attempts but reports every delivery as failed.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .map_err(|_| NotifyError::Unavailable("recorder lock poisoned".to_string()))?
            .push(notification.clone());
        if self.fail {
            return Err(NotifyError::Unavailable("mock delivery failure".to_string()));
        }
        Ok(())
    }
}
