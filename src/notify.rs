//! Notification delivery
//!
//! Notifications are advisory: the alarm state transition is committed
//! before delivery is attempted, and a failed delivery is logged but
//! never rolled back (at-most-once alarm semantics, best-effort
//! delivery).

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde_json::json;
use tracing::instrument;

use crate::alarm::AlarmAction;
use crate::config::Webhook;

/// Ephemeral description of a fired alarm action. Built per action and
/// handed to the notifier, never persisted.
#[derive(Debug, Clone)]
pub struct Notification {
    pub action: AlarmAction,
    pub ip: IpAddr,
    pub cpu_percent: Option<i64>,
    pub threshold: i64,
    pub snapshot_ts: DateTime<Utc>,
    pub cooldown_secs: u64,
}

impl Notification {
    fn cpu_text(&self) -> String {
        self.cpu_percent
            .map(|value| value.to_string())
            .unwrap_or_else(|| String::from("UNKNOWN"))
    }

    pub fn subject(&self) -> String {
        format!(
            "[SNMP CPU] {} ip={} cpu={} thr={}",
            self.action.as_str(),
            self.ip,
            self.cpu_text(),
            self.threshold
        )
    }

    pub fn body(&self) -> String {
        [
            format!("Action: {}", self.action.as_str()),
            format!("IP: {}", self.ip),
            format!(
                "Snapshot time (UTC): {}",
                self.snapshot_ts.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            format!("CPU (%): {}", self.cpu_text()),
            format!("Threshold (%): {}", self.threshold),
            format!("Cooldown (sec): {}", self.cooldown_secs),
        ]
        .join("\n")
    }
}

/// Sends a formatted message given a subject and body.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Delivers notifications by POSTing JSON to a configured webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    webhook: Webhook,
}

impl WebhookNotifier {
    pub fn new(webhook: Webhook) -> Self {
        Self {
            client: Client::new(),
            webhook,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[instrument(skip(self), fields(ip = %notification.ip))]
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        let payload = json!({
            "subject": notification.subject(),
            "body": notification.body(),
            "ip": notification.ip.to_string(),
            "action": notification.action.as_str(),
            "timestamp": Utc::now().to_rfc3339()
        });

        let response = self
            .client
            .post(&self.webhook.url)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("webhook returned status {}", response.status());
        }

        Ok(())
    }
}
