//! Push notification dispatch
//!
//! Delivery is advisory: a missing token skips the recipient, a full queue
//! or gateway failure is logged and forgotten. Nothing here can roll back
//! alert or assignment state already persisted.
//!
//! The [`Notifier`] decouples pipeline latency from gateway latency with a
//! bounded channel feeding one worker task.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::types::{DispatchError, Result};

/// Android notification channel the mobile apps register for high-priority
/// emergency alerts.
pub const CRITICAL_CHANNEL: &str = "critical-alerts";

/// One outbound push message.
#[derive(Debug, Clone)]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

/// Delivery seam over the push gateway, mockable in tests.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<()>;
}

/// Expo push gateway client.
///
/// Expo accepts up to 100 messages per request; this client sends one at a
/// time, so that cap never binds and stays invisible to callers.
pub struct ExpoPush {
    client: Client,
    endpoint: String,
}

impl ExpoPush {
    pub fn new(endpoint: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self { client, endpoint }
    }
}

#[async_trait]
impl PushSender for ExpoPush {
    async fn send(&self, message: &PushMessage) -> Result<()> {
        let payload = json!({
            "to": message.to,
            "title": message.title,
            "body": message.body,
            "data": message.data,
            "sound": "default",
            "priority": "high",
            "channelId": CRITICAL_CHANNEL,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DispatchError::Push(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DispatchError::Push(format!(
                "push gateway returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// Bounded fire-and-forget notification queue.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<PushMessage>,
}

impl Notifier {
    /// Spawn the delivery worker and hand back the enqueue side.
    pub fn start(sender: Arc<dyn PushSender>, queue_size: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<PushMessage>(queue_size);

        tokio::spawn(async move {
            info!(queue_size, "notification worker started");
            while let Some(message) = rx.recv().await {
                match sender.send(&message).await {
                    Ok(()) => debug!(title = %message.title, "push delivered"),
                    Err(e) => warn!(error = %e, title = %message.title, "push delivery failed"),
                }
            }
            debug!("notification worker stopped");
        });

        Self { tx }
    }

    /// Queue a message for a recipient. A `None` token skips silently; a
    /// full queue drops the message with a warning. Never fails the caller.
    pub fn enqueue(&self, token: Option<&str>, title: &str, body: String, data: serde_json::Value) {
        let Some(token) = token else {
            debug!(title, "recipient has no push token, skipping");
            return;
        };

        let message = PushMessage {
            to: token.to_string(),
            title: title.to_string(),
            body,
            data,
        };

        if self.tx.try_send(message).is_err() {
            warn!(title, "notification queue full, dropping message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSender {
        sent: Mutex<Vec<PushMessage>>,
    }

    #[async_trait]
    impl PushSender for RecordingSender {
        async fn send(&self, message: &PushMessage) -> Result<()> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    struct FailingSender;

    #[async_trait]
    impl PushSender for FailingSender {
        async fn send(&self, _message: &PushMessage) -> Result<()> {
            Err(DispatchError::Push("gateway down".to_string()))
        }
    }

    #[tokio::test]
    async fn enqueued_messages_reach_the_sender() {
        let sender = Arc::new(RecordingSender {
            sent: Mutex::new(Vec::new()),
        });
        let notifier = Notifier::start(sender.clone(), 8);

        notifier.enqueue(
            Some("ExponentPushToken[x]"),
            "HIGH TEMP ALERT",
            "Reading 39.5".to_string(),
            json!({"alertId": 1}),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ExponentPushToken[x]");
    }

    #[tokio::test]
    async fn missing_token_skips_without_sending() {
        let sender = Arc::new(RecordingSender {
            sent: Mutex::new(Vec::new()),
        });
        let notifier = Notifier::start(sender.clone(), 8);

        notifier.enqueue(None, "HIGH TEMP ALERT", "Reading 39.5".to_string(), json!({}));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_does_not_stop_the_worker() {
        let notifier = Notifier::start(Arc::new(FailingSender), 8);

        notifier.enqueue(Some("t1"), "A", "a".to_string(), json!({}));
        notifier.enqueue(Some("t2"), "B", "b".to_string(), json!({}));

        // Worker must survive both failures; enqueue never errors
        tokio::time::sleep(Duration::from_millis(50)).await;
        notifier.enqueue(Some("t3"), "C", "c".to_string(), json!({}));
    }
}
