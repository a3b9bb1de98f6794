use crate::config::Config;
use crate::db::{ChannelPreference, PreferenceStore};
use crate::error::CommandError;
use crate::languages;
use crate::relay::{ChatPlatform, WEBHOOK_NAME};
use crate::router::{self, IncomingMessage};
use crate::translate::Translator;
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serenity::all::{
    ActivityData, ChannelId, Client, Colour, Command, CommandInteraction, CommandOptionType,
    Context, CreateCommand, CreateCommandOption, CreateEmbed, CreateEmbedFooter,
    CreateInteractionResponse, CreateInteractionResponseMessage, CreateWebhook,
    EditInteractionResponse, EventHandler,
    GatewayIntents, Interaction, Message, MessageId, Ready, ResolvedValue,
};
use std::sync::Arc;
use tracing::{error, info};

/// Process-wide handles, constructed once at startup and owned by the event
/// handler. The serenity HTTP handle arrives with each event context.
pub struct AppContext {
    pub store: PreferenceStore,
    pub translator: Translator,
    pub client: reqwest::Client,
}

/// `ChatPlatform` backed by the Discord REST API.
pub struct Discord {
    http: Arc<serenity::http::Http>,
}

impl Discord {
    pub fn new(http: Arc<serenity::http::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChatPlatform for Discord {
    async fn create_webhook(&self, channel_id: i64) -> Result<String> {
        let webhook = ChannelId::new(channel_id as u64)
            .create_webhook(&self.http, CreateWebhook::new(WEBHOOK_NAME))
            .await
            .context("Failed to create channel webhook")?;

        webhook
            .url()
            .context("Created webhook is missing its token")
    }

    async fn delete_message(&self, channel_id: i64, message_id: i64) -> Result<()> {
        self.http
            .delete_message(
                ChannelId::new(channel_id as u64),
                MessageId::new(message_id as u64),
                Some("Relayed as translation"),
            )
            .await
            .context("Failed to delete original message")
    }
}

// ==================== Command logic ====================
//
// The command bodies are plain functions over the store and the platform seam
// so they can be exercised without a Discord connection. The serenity glue
// below only extracts arguments and renders embeds.

/// Configure the language pair for a channel.
///
/// Requires channel-management authority. Reuses the channel's existing
/// webhook when one is already recorded, otherwise creates one.
pub async fn set_languages(
    store: &PreferenceStore,
    platform: &dyn ChatPlatform,
    server_id: i64,
    channel_id: i64,
    can_manage_channels: bool,
    first_name: &str,
    second_name: &str,
) -> Result<String, CommandError> {
    if !can_manage_channels {
        return Err(CommandError::MissingPermission);
    }

    let first = languages::code_for_name(first_name).ok_or(CommandError::UnknownLanguage)?;
    let second = languages::code_for_name(second_name).ok_or(CommandError::UnknownLanguage)?;

    // A pair of identical languages would make routing undefined.
    if first == second {
        return Err(CommandError::SameLanguage);
    }

    let webhook_url = match store.get(server_id, channel_id).await? {
        Some(existing) => existing.webhook_url,
        None => platform
            .create_webhook(channel_id)
            .await
            .map_err(CommandError::Internal)?,
    };

    store
        .upsert(&ChannelPreference {
            server_id,
            channel_id,
            first_language: first.to_string(),
            second_language: second.to_string(),
            webhook_url,
        })
        .await?;

    Ok(format!(
        "Language preferences set for this channel: First Language - `{}`, Second Language - `{}`",
        languages::name_for_code(first).unwrap_or(first),
        languages::name_for_code(second).unwrap_or(second),
    ))
}

/// Remove the language pair for a channel, if any.
pub async fn remove_languages(
    store: &PreferenceStore,
    server_id: i64,
    channel_id: i64,
    can_manage_channels: bool,
) -> Result<String, CommandError> {
    if !can_manage_channels {
        return Err(CommandError::MissingPermission);
    }

    if store.delete(server_id, channel_id).await? {
        Ok("Language preferences removed for this channel.".to_string())
    } else {
        Ok("No language preferences set for this channel.".to_string())
    }
}

/// Report the configured language pair for a channel.
pub async fn current_languages(
    store: &PreferenceStore,
    server_id: i64,
    channel_id: i64,
) -> Result<String, CommandError> {
    match store.get(server_id, channel_id).await? {
        Some(pref) => Ok(format!(
            "Current language preferences for this channel: First Language - `{}`, Second Language - `{}`",
            languages::name_for_code(&pref.first_language)
                .unwrap_or(pref.first_language.as_str()),
            languages::name_for_code(&pref.second_language)
                .unwrap_or(pref.second_language.as_str()),
        )),
        None => Ok("No language preferences set for this channel.".to_string()),
    }
}

// ==================== Serenity glue ====================

pub struct BotHandler {
    app: AppContext,
}

fn command_definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("ping").description("Check that the bot is responsive."),
        CreateCommand::new("set_languages")
            .description("Set the language pair to translate between in this channel.")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "first_language",
                    "Name of the first language, e.g. English",
                )
                .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "second_language",
                    "Name of the second language, e.g. French",
                )
                .required(true),
            ),
        CreateCommand::new("remove_languages")
            .description("Remove the language preferences from this channel."),
        CreateCommand::new("current_languages")
            .description("Show the language preferences for this channel."),
        CreateCommand::new("help").description("List the commands and what they do."),
    ]
}

fn embed(description: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new()
        .colour(Colour::LIGHTER_GREY)
        .description(description.into())
}

fn help_embed() -> CreateEmbed {
    CreateEmbed::new()
        .colour(Colour::LIGHTER_GREY)
        .title("Help")
        .field(
            "COMMANDS",
            "**/ping**\nCheck that the bot is responsive.\n\
             **/set_languages**\nSet the two languages to translate between in this channel.\n\
             **/remove_languages**\nRemove the language preferences from this channel, disabling translation.\n\
             **/current_languages**\nShow the current language preferences for this channel.\n\
             **/help**\nShow this list.",
            false,
        )
        .footer(CreateEmbedFooter::new(
            "Messages written in one configured language are reposted in the other under the author's name.",
        ))
}

fn invoker_can_manage_channels(command: &CommandInteraction) -> bool {
    command
        .member
        .as_ref()
        .and_then(|member| member.permissions)
        .map(|permissions| permissions.manage_channels())
        .unwrap_or(false)
}

fn string_options<'a>(command: &'a CommandInteraction) -> (Option<&'a str>, Option<&'a str>) {
    let mut first = None;
    let mut second = None;

    for option in command.data.options() {
        if let ResolvedValue::String(value) = option.value {
            match option.name {
                "first_language" => first = Some(value),
                "second_language" => second = Some(value),
                _ => {}
            }
        }
    }

    (first, second)
}

async fn respond(ctx: &Context, command: &CommandInteraction, embed: CreateEmbed) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().embed(embed),
            ),
        )
        .await
        .context("Failed to send interaction response")
}

async fn edit(ctx: &Context, command: &CommandInteraction, embed: CreateEmbed) -> Result<()> {
    command
        .edit_response(&ctx.http, EditInteractionResponse::new().embed(embed))
        .await
        .map(|_| ())
        .context("Failed to edit interaction response")
}

fn outcome_embed(outcome: Result<String, CommandError>, command_name: &str) -> CreateEmbed {
    match outcome {
        Ok(text) => embed(text),
        Err(e) => {
            if let CommandError::Internal(source) = &e {
                error!("/{} failed: {:#}", command_name, source);
            }
            embed(e.to_string())
        }
    }
}

impl BotHandler {
    pub fn new(app: AppContext) -> Self {
        Self { app }
    }

    /// Run a mutating command with the original bot's reply flow: an
    /// immediate progress embed, then an edit carrying the outcome.
    async fn run_deferred(
        &self,
        ctx: &Context,
        command: &CommandInteraction,
        progress: &str,
        outcome: Result<String, CommandError>,
    ) {
        if let Err(e) = respond(ctx, command, embed(progress)).await {
            error!("Failed to acknowledge /{}: {:#}", command.data.name, e);
            return;
        }

        let final_embed = outcome_embed(outcome, &command.data.name);
        if let Err(e) = edit(ctx, command, final_embed).await {
            error!("Failed to edit /{} response: {:#}", command.data.name, e);
        }
    }

    async fn dispatch_command(&self, ctx: &Context, command: &CommandInteraction) {
        let server_id = command.guild_id.map(|id| id.get() as i64);
        let channel_id = command.channel_id.get() as i64;

        match command.data.name.as_str() {
            "ping" => {
                if let Err(e) = respond(ctx, command, embed("Pong!")).await {
                    error!("Failed to respond to /ping: {:#}", e);
                }
            }
            "help" => {
                if let Err(e) = respond(ctx, command, help_embed()).await {
                    error!("Failed to respond to /help: {:#}", e);
                }
            }
            "set_languages" => {
                let outcome = match (server_id, string_options(command)) {
                    (Some(server_id), (Some(first), Some(second))) => {
                        let platform = Discord::new(ctx.http.clone());
                        set_languages(
                            &self.app.store,
                            &platform,
                            server_id,
                            channel_id,
                            invoker_can_manage_channels(command),
                            first,
                            second,
                        )
                        .await
                    }
                    (None, _) => Err(CommandError::GuildOnly),
                    _ => Err(CommandError::Internal(anyhow::anyhow!(
                        "missing required language option"
                    ))),
                };
                self.run_deferred(ctx, command, "Setting the language preferences...", outcome)
                    .await;
            }
            "remove_languages" => {
                let outcome = match server_id {
                    Some(server_id) => {
                        remove_languages(
                            &self.app.store,
                            server_id,
                            channel_id,
                            invoker_can_manage_channels(command),
                        )
                        .await
                    }
                    None => Err(CommandError::GuildOnly),
                };
                self.run_deferred(ctx, command, "Removing the language preferences...", outcome)
                    .await;
            }
            "current_languages" => {
                let outcome = match server_id {
                    Some(server_id) => {
                        current_languages(&self.app.store, server_id, channel_id).await
                    }
                    None => Err(CommandError::GuildOnly),
                };
                self.run_deferred(
                    ctx,
                    command,
                    "Fetching the current language preferences...",
                    outcome,
                )
                .await;
            }
            other => error!("Received unknown command /{}", other),
        }
    }
}

#[serenity::async_trait]
impl EventHandler for BotHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            "{} is connected to Discord, serving {} server(s)",
            ready.user.name,
            ready.guilds.len()
        );

        match Command::set_global_commands(&ctx.http, command_definitions()).await {
            Ok(commands) => info!("Synced {} slash command(s)", commands.len()),
            Err(e) => error!("Failed to register slash commands: {:?}", e),
        }

        let servers = ready.guilds.len();
        let activity = if servers == 1 {
            "1 Server".to_string()
        } else {
            format!("{} Servers", servers)
        };
        ctx.set_activity(Some(ActivityData::watching(activity)));
    }

    async fn message(&self, ctx: Context, msg: Message) {
        // Only guild channels can carry a preference; DMs are ignored.
        let Some(guild_id) = msg.guild_id else {
            return;
        };

        let incoming = IncomingMessage {
            server_id: guild_id.get() as i64,
            channel_id: msg.channel_id.get() as i64,
            message_id: msg.id.get() as i64,
            author_display_name: msg.author.display_name().to_string(),
            author_avatar_url: msg.author.avatar_url(),
            content: msg.content.clone(),
            from_bot: msg.author.bot,
        };

        let platform = Discord::new(ctx.http.clone());
        if let Err(e) = router::process_message(
            &self.app.store,
            &self.app.translator,
            &self.app.client,
            &platform,
            &incoming,
        )
        .await
        {
            error!("Failed to process message: {:#}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            self.dispatch_command(&ctx, &command).await;
        }
    }
}

/// Connect to the Discord gateway and run until the client stops.
pub async fn run(config: Config, store: PreferenceStore, translator: Translator) -> Result<()> {
    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;

    let handler = BotHandler::new(AppContext {
        store,
        translator,
        client: reqwest::Client::new(),
    });

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .context("Failed to build Discord client")?;

    client
        .start()
        .await
        .context("Discord client exited with an error")
}
