//! Best-effort chat notifications for workflow transitions.
//!
//! Delivery failures are logged and dropped; a transition never fails
//! because a notification could not be sent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{DeckError, Result};
use crate::github::issue::Issue;

/// Environment variable to disable all notifications.
const ENV_NOTIFY_DISABLED: &str = "NOTIFY_DISABLED";

/// Upper bound on a single channel send unless configured otherwise.
const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// A single transition announcement.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub actor: String,
    /// Past-tense description, e.g. "started working on".
    pub action: String,
    pub reference: String,
    pub title: String,
    pub url: String,
}

impl Notification {
    pub fn new(actor: &str, action: &str, issue: &Issue, host: &str) -> Self {
        Self {
            actor: actor.to_string(),
            action: action.to_string(),
            reference: format!("{}#{}", issue.repo, issue.number),
            title: issue.title.clone(),
            url: issue.permalink(host),
        }
    }

    /// Slack mrkdwn text.
    pub fn text(&self) -> String {
        format!(
            "{} {} <{}|{}>: {}",
            self.actor, self.action, self.url, self.reference, self.title
        )
    }
}

#[async_trait]
pub trait NotifyChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Slack incoming-webhook channel.
pub struct SlackChannel {
    webhook_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SlackPayload {
    text: String,
}

impl SlackChannel {
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotifyChannel for SlackChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn send(&self, notification: &Notification) -> Result<()> {
        let payload = SlackPayload {
            text: notification.text(),
        };

        debug!(channel = "slack", reference = %notification.reference, "sending notification");

        let response = self
            .client
            .post(self.webhook_url.as_str())
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(DeckError::Notify(format!("slack returned {status}: {body}")))
    }
}

/// Dispatches notifications to every configured channel, one after another.
/// Each send is bounded by `timeout`; an elapsed send counts as a failure.
pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
    timeout: Duration,
}

impl Notifier {
    /// Slack when a webhook is configured; nothing when `NOTIFY_DISABLED`
    /// is set to `true`/`1`.
    pub fn from_config(config: &Config) -> Self {
        let disabled = std::env::var(ENV_NOTIFY_DISABLED)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);
        if disabled {
            info!("notifications disabled via {ENV_NOTIFY_DISABLED}");
            return Self::disabled();
        }

        match config.slack_webhook_url() {
            Some(url) => {
                let slack: Arc<dyn NotifyChannel> = Arc::new(SlackChannel::new(url));
                Self::with_channels(vec![slack])
                    .with_timeout(Duration::from_secs(config.settings.request_timeout_secs))
            }
            None => {
                debug!("no notification channels configured");
                Self::disabled()
            }
        }
    }

    pub fn with_channels(channels: Vec<Arc<dyn NotifyChannel>>) -> Self {
        Self {
            channels,
            timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn disabled() -> Self {
        Self::with_channels(vec![])
    }

    pub fn has_channels(&self) -> bool {
        !self.channels.is_empty()
    }

    pub async fn notify(&self, notification: &Notification) {
        for channel in &self.channels {
            let sent = match tokio::time::timeout(self.timeout, channel.send(notification)).await {
                Ok(result) => result,
                Err(_) => Err(DeckError::Notify(format!(
                    "no response within {}s",
                    self.timeout.as_secs_f32()
                ))),
            };
            match sent {
                Ok(()) => debug!(channel = channel.name(), "notification sent"),
                Err(e) => warn!(
                    channel = channel.name(),
                    error = %e,
                    "failed to send notification for {}",
                    notification.reference
                ),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{Notification, NotifyChannel};
    use crate::error::{DeckError, Result};

    /// Records what it was asked to send; optionally fails every send.
    #[derive(Default)]
    pub struct RecordingChannel {
        pub sent: Mutex<Vec<Notification>>,
        pub fail: bool,
    }

    /// Accepts the notification and never answers.
    pub struct StalledChannel;

    #[async_trait]
    impl NotifyChannel for StalledChannel {
        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn send(&self, _notification: &Notification) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[async_trait]
    impl NotifyChannel for RecordingChannel {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn send(&self, notification: &Notification) -> Result<()> {
            self.sent.lock().unwrap().push(notification.clone());
            if self.fail {
                return Err(DeckError::Notify("webhook unreachable".into()));
            }
            Ok(())
        }
    }
}
