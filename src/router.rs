use crate::db::{ChannelPreference, PreferenceStore};
use crate::relay::{self, ChatPlatform, EndpointHealth, RelayPayload};
use crate::translate::Translator;
use anyhow::Result;
use tracing::{debug, info, warn};

/// A channel message as received from the chat platform. Never persisted.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub server_id: i64,
    pub channel_id: i64,
    pub message_id: i64,
    pub author_display_name: String,
    pub author_avatar_url: Option<String>,
    pub content: String,
    pub from_bot: bool,
}

/// Pick the destination language for a detected language, or `None` when the
/// message is in neither configured language.
pub fn destination<'a>(detected: &str, pref: &'a ChannelPreference) -> Option<&'a str> {
    if detected == pref.first_language {
        Some(&pref.second_language)
    } else if detected == pref.second_language {
        Some(&pref.first_language)
    } else {
        None
    }
}

/// Compose the relayed message body: the translation followed by the original
/// in quotes.
pub fn relay_body(translated: &str, original: &str) -> String {
    format!("{} (\"{}\")", translated, original)
}

/// Run one message through the bilingual routing pipeline.
///
/// Skips bot-authored and empty messages before any I/O, then: preference
/// lookup → language detection → destination pick → webhook validation (with
/// lazy repair) → translation → delete original → relay through the webhook.
/// Detection failures and transient webhook failures end the pipeline for
/// this message without touching it; a send failure after the original was
/// already deleted is logged and accepted.
pub async fn process_message(
    store: &PreferenceStore,
    translator: &Translator,
    client: &reqwest::Client,
    platform: &dyn ChatPlatform,
    message: &IncomingMessage,
) -> Result<()> {
    if message.from_bot || message.content.is_empty() {
        return Ok(());
    }

    // No preference row means translation is not configured here.
    let Some(pref) = store.get(message.server_id, message.channel_id).await? else {
        return Ok(());
    };

    let detected = match translator.detect(&message.content).await {
        Ok(lang) => lang,
        Err(e) => {
            warn!("Failed to detect language, skipping message: {:#}", e);
            return Ok(());
        }
    };

    let Some(dest) = destination(&detected, &pref) else {
        debug!(
            "Message in '{}' matches neither configured language, leaving as-is",
            detected
        );
        return Ok(());
    };

    let endpoint = match relay::validate(client, &pref.webhook_url).await {
        EndpointHealth::Healthy => pref.webhook_url.clone(),
        EndpointHealth::Invalid => {
            info!(
                "Webhook for channel {} is gone, creating a replacement",
                message.channel_id
            );
            relay::repair(store, platform, message.server_id, message.channel_id).await?
        }
        EndpointHealth::Unknown => {
            warn!(
                "Could not validate webhook for channel {}, skipping relay",
                message.channel_id
            );
            return Ok(());
        }
    };

    let translated = translator.translate(&message.content, dest).await?;

    let payload = RelayPayload {
        username: message.author_display_name.clone(),
        avatar_url: message.author_avatar_url.clone(),
        content: relay_body(&translated, &message.content),
    };

    // The original goes first; a failed send afterwards loses the message,
    // which is the accepted trade-off.
    platform
        .delete_message(message.channel_id, message.message_id)
        .await?;

    if let Err(e) = relay::send(client, &endpoint, &payload).await {
        warn!(
            "Relay send failed after the original message was deleted: {:#}",
            e
        );
    }

    Ok(())
}
