use crate::notify::{Notification, Notifier, NotifyError};
use async_trait::async_trait;
use tracing::info;

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            title = %notification.title,
            body = %notification.body,
            "Notification"
        );
        Ok(())
    }
}
