use anyhow::Result;
use channel_translator::config::Config;
use channel_translator::db::PreferenceStore;
use channel_translator::discord;
use channel_translator::translate::Translator;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("channel_translator=info".parse()?),
        )
        .init();

    info!("Starting channel translator bot");

    // Load configuration from environment
    let config = Config::from_env()?;

    // Open the preference store
    let store = PreferenceStore::connect(&config.database_path).await?;
    info!("Preference store ready at {}", config.database_path);

    // Translation provider client
    let translator = Translator::new(config.translate_api_url.clone());

    // Connect to Discord and run until shutdown
    discord::run(config, store, translator).await
}
