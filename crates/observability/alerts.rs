use anyhow::{Result, anyhow};
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde_json::json;
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tracing::warn;
use url::Url;

use crate::observability::config::ServiceContext;

/// One operator-facing alert. Reserved for conditions that need a human,
/// such as an invoice left pending after a confirmed on-chain payment.
#[derive(Clone, Debug)]
pub struct AlertEvent {
    pub summary: String,
    pub fields: BTreeMap<String, String>,
}

/// Fire-and-forget alert queue draining to a webhook. Posting never blocks
/// the caller; a full or closed queue drops the event with a warning.
#[derive(Clone)]
pub struct OpsAlerts {
    tx: Option<mpsc::Sender<AlertEvent>>,
}

impl OpsAlerts {
    pub fn new(webhook_url: Url, context: ServiceContext) -> Self {
        let (tx, mut rx) = mpsc::channel::<AlertEvent>(256);
        let sender = WebhookSender::new(webhook_url, context);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(error) = sender.send(&event).await {
                    warn!(error = %error, "Ops alert delivery failed");
                }
            }
        });

        Self { tx: Some(tx) }
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn try_notify(&self, event: AlertEvent) {
        let Some(tx) = &self.tx else {
            return;
        };

        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Ops alert queue full; dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Ops alert queue closed; dropping event");
            }
        }
    }
}

struct WebhookSender {
    webhook_url: Url,
    context: ServiceContext,
    client: Client,
}

impl WebhookSender {
    fn new(webhook_url: Url, context: ServiceContext) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(3))
            .build()
            .expect("reqwest client must build");

        Self {
            webhook_url,
            context,
            client,
        }
    }

    fn format_content(&self, event: &AlertEvent) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "**{}** `{}` `{}`",
            self.context.service_name, self.context.environment, self.context.component
        ));
        lines.push(format!(
            "`{}`",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
        lines.push(format!("> {}", event.summary.trim()));

        if !event.fields.is_empty() {
            lines.push("fields:".to_string());
            for (k, v) in &event.fields {
                lines.push(format!("- `{}` = `{}`", k, v));
            }
        }

        truncate_for_webhook(lines.join("\n"))
    }

    async fn send(&self, event: &AlertEvent) -> Result<()> {
        let content = self.format_content(event);

        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(sanitize_reqwest_error)?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(anyhow!(
            "ops webhook returned non-success status: {}",
            response.status()
        ))
    }
}

fn sanitize_reqwest_error(error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("ops webhook request timed out");
    }
    if error.is_connect() {
        return anyhow!("ops webhook connection failed");
    }
    anyhow!("ops webhook request failed")
}

fn truncate_for_webhook(mut content: String) -> String {
    const LIMIT: usize = 2000;
    const SUFFIX: &str = "\n… (truncated)";

    if content.chars().count() <= LIMIT {
        return content;
    }

    let allowed = LIMIT.saturating_sub(SUFFIX.chars().count());
    let truncated: String = content.chars().take(allowed).collect();
    content.clear();
    content.push_str(&truncated);
    content.push_str(SUFFIX);
    content
}
