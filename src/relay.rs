use crate::db::PreferenceStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// Name given to the webhooks this bot creates.
pub const WEBHOOK_NAME: &str = "Translation Webhook";

/// The chat-platform calls the relay pipeline depends on.
///
/// Kept to the two operations the core actually needs so tests can substitute
/// a scripted double for the Discord SDK.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Create a webhook in the channel and return its execute URL.
    async fn create_webhook(&self, channel_id: i64) -> Result<String>;

    /// Delete a message from a channel.
    async fn delete_message(&self, channel_id: i64, message_id: i64) -> Result<()>;
}

/// Outcome of the pre-send existence check on a webhook URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointHealth {
    /// The webhook exists and can be posted to.
    Healthy,
    /// The webhook is gone (deleted by an admin); a replacement is needed.
    Invalid,
    /// The check itself failed; treat as transient and skip this relay.
    Unknown,
}

/// Body of a webhook execute request impersonating the original author.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RelayPayload {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub content: String,
}

/// Check whether a webhook URL still points at a live webhook.
///
/// A GET on a webhook URL returns the webhook object while it exists and 404
/// once it has been deleted. Any other status, and any transport failure, is
/// classified as `Unknown` rather than triggering a repair.
pub async fn validate(client: &reqwest::Client, url: &str) -> EndpointHealth {
    match client.get(url).send().await {
        Ok(response) if response.status().is_success() => EndpointHealth::Healthy,
        Ok(response) if response.status() == reqwest::StatusCode::NOT_FOUND => {
            EndpointHealth::Invalid
        }
        Ok(_) => EndpointHealth::Unknown,
        Err(_) => EndpointHealth::Unknown,
    }
}

/// Create a replacement webhook for the channel and persist it over the old
/// URL, keeping the (server, channel) key.
///
/// Runs lazily on the relay path, never on a schedule. Two concurrent repairs
/// on one channel both succeed; the last persisted URL wins.
pub async fn repair(
    store: &PreferenceStore,
    platform: &dyn ChatPlatform,
    server_id: i64,
    channel_id: i64,
) -> Result<String> {
    let url = platform
        .create_webhook(channel_id)
        .await
        .context("Failed to create replacement webhook")?;

    store.set_webhook_url(server_id, channel_id, &url).await?;

    info!("Replaced webhook for channel {}", channel_id);
    Ok(url)
}

/// Post the relay payload to the webhook. One attempt, no retry.
pub async fn send(client: &reqwest::Client, url: &str, payload: &RelayPayload) -> Result<()> {
    let response = client
        .post(url)
        .json(payload)
        .send()
        .await
        .context("Failed to post to webhook")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
        anyhow::bail!("Webhook rejected relay payload ({}): {}", status, body);
    }

    Ok(())
}
