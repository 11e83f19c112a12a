//! Pushover push-notification sink.

use crate::notify::{Notification, Notifier, NotifyError};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://api.pushover.net/1/messages.json";

pub struct PushoverNotifier {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    user: String,
}

impl PushoverNotifier {
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        user: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token: token.into(),
            user: user.into(),
        })
    }
}

impl fmt::Debug for PushoverNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushoverNotifier")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let form = [
            ("token", self.token.as_str()),
            ("user", self.user.as_str()),
            ("title", notification.title.as_str()),
            ("message", notification.body.as_str()),
        ];
        let response = self.client.post(&self.endpoint).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!(title = %notification.title, "Pushover notification delivered");
        Ok(())
    }
}
