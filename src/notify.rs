//! Push fan-out for newly stored postings.
//!
//! Publishing is fire-and-forget from the crawler's side: the orchestrator
//! runs publishes alongside its store writes and logs any that fail.

use crate::error::NotifyError;
use crate::models::{Category, Posting, Source};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

/// Message sent to a category topic when a posting is first stored
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub item_id: String,
    #[serde(rename = "type")]
    pub kind: Category,
    pub source: Source,
}

impl Notification {
    pub fn for_posting(posting: &Posting) -> Self {
        let category = posting.category();
        let title = match category {
            Category::Job => "💼 새 일자리 정보",
            Category::House => "🏠 새 빈집 정보",
        };

        Self {
            title: title.to_string(),
            body: posting.title.clone(),
            item_id: posting.id.clone(),
            kind: category,
            source: posting.source,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, topic: &str, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of a push service
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, topic: &str, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            topic,
            item_id = %notification.item_id,
            source = ?notification.source,
            "🔔 {} {}",
            notification.title,
            notification.body
        );
        Ok(())
    }
}

/// Upper bound on one push request
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts topic messages as JSON to a push gateway
pub struct WebhookNotifier {
    client: Client,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(PUBLISH_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

/// Topic message body in the push gateway's shape
pub fn topic_message(topic: &str, notification: &Notification) -> serde_json::Value {
    json!({
        "topic": topic,
        "notification": {
            "title": notification.title,
            "body": notification.body,
        },
        "data": {
            "itemId": notification.item_id,
            "type": notification.kind,
            "source": notification.source,
        },
        "android": { "priority": "high" },
    })
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn publish(&self, topic: &str, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&topic_message(topic, notification))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

/// Keeps every published notification in memory, for dry runs and tests
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, Notification)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Published `(topic, notification)` pairs in order
    pub fn sent(&self) -> Vec<(String, Notification)> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, topic: &str, notification: &Notification) -> Result<(), NotifyError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((topic.to_string(), notification.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HouseDetails, PostingKind};
    use chrono::Utc;

    fn posting(source: Source, kind: PostingKind) -> Posting {
        Posting {
            id: format!("{}_sample_0011223344556677", source.tag()),
            source,
            source_name: source.display_name().to_string(),
            title: "창선면 농가주택 임대".to_string(),
            date: None,
            link: source.landing_url().to_string(),
            phones: vec![source.default_phone().to_string()],
            keywords: vec!["임대".to_string()],
            kind,
            crawled_at: Utc::now(),
        }
    }

    #[test]
    fn house_notification_uses_house_title_and_posting_fields() {
        let house = posting(Source::Refarm, PostingKind::House(HouseDetails::default()));
        let notification = Notification::for_posting(&house);

        assert_eq!(notification.title, "🏠 새 빈집 정보");
        assert_eq!(notification.body, "창선면 농가주택 임대");
        assert_eq!(notification.item_id, house.id);
        assert_eq!(notification.kind, Category::House);
    }

    #[test]
    fn topic_message_carries_data_and_priority() {
        let job = posting(Source::Board, PostingKind::Job);
        let message = topic_message("jobs", &Notification::for_posting(&job));

        assert_eq!(message["topic"], "jobs");
        assert_eq!(message["notification"]["title"], "💼 새 일자리 정보");
        assert_eq!(message["data"]["type"], "job");
        assert_eq!(message["data"]["source"], "board");
        assert_eq!(message["data"]["itemId"], job.id.as_str());
        assert_eq!(message["android"]["priority"], "high");
    }

    #[tokio::test]
    async fn recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        let job = Notification::for_posting(&posting(Source::Saeol, PostingKind::Job));
        notifier.publish("jobs", &job).await.unwrap();
        notifier.publish("jobs", &job).await.unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "jobs");
    }
}
