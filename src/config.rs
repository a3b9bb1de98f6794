use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,

    // Persistence
    pub database_path: String,

    // Translation provider
    pub translate_api_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // Discord bot authentication
            discord_token: std::env::var("DISCORD_BOT_TOKEN")
                .context("DISCORD_BOT_TOKEN not set")?,

            // SQLite file holding the per-channel language preferences
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "languages.db".to_string()),

            // Translation provider
            translate_api_url: std::env::var("TRANSLATE_API_URL")
                .unwrap_or_else(|_| "https://translate.googleapis.com".to_string()),
        })
    }
}
