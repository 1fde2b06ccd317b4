use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use logger::{now_iso, EventLogger};
use match_tracker::{body_snippet, DeliverySink, Notification};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Serialize)]
struct DeliveredEvent<'a> {
    ts:           String,
    event:        &'static str,   // "NOTIFICATION"
    message_id:   &'a str,
    via:          &'static str,   // "journal" | "webhook"
    notification: &'a Notification,
}

/// Appends every notification to the JSONL event log.
pub struct JournalDelivery {
    logger: Arc<EventLogger>,
    seq:    AtomicU64,
}

impl JournalDelivery {
    pub fn new(logger: Arc<EventLogger>) -> Self {
        Self { logger, seq: AtomicU64::new(0) }
    }

    fn next_id(&self) -> String {
        let n = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        format!("journal-{}-{n}", Utc::now().timestamp_millis())
    }

    fn record(&self, message_id: &str, via: &'static str, notification: &Notification) -> Result<()> {
        self.logger.log(&DeliveredEvent {
            ts: now_iso(),
            event: "NOTIFICATION",
            message_id,
            via,
            notification,
        })
    }
}

#[async_trait]
impl DeliverySink for JournalDelivery {
    async fn deliver(&self, notification: &Notification) -> Result<String> {
        let id = self.next_id();
        self.record(&id, "journal", notification)?;
        Ok(id)
    }
}

/// Posts the notification JSON to a webhook and journals what was sent.
/// The message id is the response's `id` when present.
pub struct WebhookDelivery {
    http:    reqwest::Client,
    url:     String,
    journal: JournalDelivery,
}

impl WebhookDelivery {
    pub fn new(url: impl Into<String>, journal: JournalDelivery) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            url: url.into(),
            journal,
        }
    }
}

fn message_id_from(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    match &v["id"] {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl DeliverySink for WebhookDelivery {
    async fn deliver(&self, notification: &Notification) -> Result<String> {
        let resp = self
            .http
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .context("webhook request")?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("webhook HTTP {}: {}", status, body_snippet(&body, 200));
        }

        let id = message_id_from(&body).unwrap_or_else(|| self.journal.next_id());
        info!("webhook accepted {} for {}", notification.match_id, notification.destination);
        self.journal.record(&id, "webhook", notification)?;
        Ok(id)
    }
}
