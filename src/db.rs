use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

/// Per-channel translation configuration.
///
/// Keyed by (server_id, channel_id). Discord snowflakes are u64 on the wire
/// and are narrowed to i64 at the SDK boundary because SQLite integers are
/// signed.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ChannelPreference {
    pub server_id: i64,
    pub channel_id: i64,
    pub first_language: String,
    pub second_language: String,
    pub webhook_url: String,
}

/// Store for channel language preferences, backed by a single SQLite table.
///
/// Rows are always read fresh per message; nothing is cached across calls.
#[derive(Clone)]
pub struct PreferenceStore {
    pool: SqlitePool,
}

impl PreferenceStore {
    /// Open (creating if missing) the database and ensure the table exists.
    pub async fn connect(database_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database at {}", database_path))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS language_preferences (
                server_id INTEGER NOT NULL,
                channel_id INTEGER NOT NULL,
                first_language TEXT NOT NULL,
                second_language TEXT NOT NULL,
                webhook_url TEXT NOT NULL,
                PRIMARY KEY (server_id, channel_id)
            )",
        )
        .execute(&pool)
        .await
        .context("Failed to create language_preferences table")?;

        Ok(Self { pool })
    }

    /// Fetch the preference for a channel, if one is configured.
    pub async fn get(&self, server_id: i64, channel_id: i64) -> Result<Option<ChannelPreference>> {
        sqlx::query_as(
            "SELECT server_id, channel_id, first_language, second_language, webhook_url
             FROM language_preferences
             WHERE server_id = ?1 AND channel_id = ?2",
        )
        .bind(server_id)
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load channel preference")
    }

    /// Insert or replace the preference for a channel (last write wins).
    pub async fn upsert(&self, pref: &ChannelPreference) -> Result<()> {
        sqlx::query(
            "INSERT INTO language_preferences
                (server_id, channel_id, first_language, second_language, webhook_url)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (server_id, channel_id) DO UPDATE SET
                first_language = excluded.first_language,
                second_language = excluded.second_language,
                webhook_url = excluded.webhook_url",
        )
        .bind(pref.server_id)
        .bind(pref.channel_id)
        .bind(&pref.first_language)
        .bind(&pref.second_language)
        .bind(&pref.webhook_url)
        .execute(&self.pool)
        .await
        .context("Failed to save channel preference")?;

        Ok(())
    }

    /// Replace the stored webhook URL in place, keeping the language pair.
    pub async fn set_webhook_url(&self, server_id: i64, channel_id: i64, url: &str) -> Result<()> {
        sqlx::query(
            "UPDATE language_preferences SET webhook_url = ?1
             WHERE server_id = ?2 AND channel_id = ?3",
        )
        .bind(url)
        .bind(server_id)
        .bind(channel_id)
        .execute(&self.pool)
        .await
        .context("Failed to update webhook URL")?;

        Ok(())
    }

    /// Delete the preference for a channel. Returns true if a row existed.
    pub async fn delete(&self, server_id: i64, channel_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM language_preferences WHERE server_id = ?1 AND channel_id = ?2",
        )
        .bind(server_id)
        .bind(channel_id)
        .execute(&self.pool)
        .await
        .context("Failed to delete channel preference")?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ==================== Helper Functions ====================

    /// Create a temporary database for testing
    async fn create_test_store() -> (PreferenceStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test_languages.db");
        let store = PreferenceStore::connect(db_path.to_str().unwrap())
            .await
            .expect("Failed to create store");
        (store, temp_dir)
    }

    fn sample_pref() -> ChannelPreference {
        ChannelPreference {
            server_id: 100,
            channel_id: 200,
            first_language: "en".to_string(),
            second_language: "fr".to_string(),
            webhook_url: "https://discord.com/api/webhooks/1/abc".to_string(),
        }
    }

    // ==================== Initialization Tests ====================

    #[tokio::test]
    async fn test_store_creation() {
        let (store, _temp_dir) = create_test_store().await;

        let pref = store.get(1, 2).await.expect("Should query");
        assert!(pref.is_none());
    }

    #[tokio::test]
    async fn test_store_reopening() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let path_str = db_path.to_str().unwrap();

        // Create store and insert a preference
        {
            let store = PreferenceStore::connect(path_str)
                .await
                .expect("Failed to create store");
            store.upsert(&sample_pref()).await.expect("Should upsert");
        }

        // Reopen and check the row persisted
        {
            let store = PreferenceStore::connect(path_str)
                .await
                .expect("Failed to reopen store");
            let pref = store.get(100, 200).await.expect("Should query");
            assert_eq!(pref, Some(sample_pref()));
        }
    }

    #[tokio::test]
    async fn test_invalid_database_path() {
        let result = PreferenceStore::connect("/non/existent/path/db.db").await;
        assert!(result.is_err());
    }

    // ==================== get/upsert Tests ====================

    #[tokio::test]
    async fn test_get_absent() {
        let (store, _temp_dir) = create_test_store().await;

        let pref = store.get(100, 200).await.expect("Should query");
        assert!(pref.is_none());
    }

    #[tokio::test]
    async fn test_upsert_inserts() {
        let (store, _temp_dir) = create_test_store().await;

        store.upsert(&sample_pref()).await.expect("Should insert");

        let pref = store
            .get(100, 200)
            .await
            .expect("Should query")
            .expect("Row should exist");
        assert_eq!(pref.first_language, "en");
        assert_eq!(pref.second_language, "fr");
        assert_eq!(pref.webhook_url, "https://discord.com/api/webhooks/1/abc");
    }

    #[tokio::test]
    async fn test_upsert_updates_in_place() {
        let (store, _temp_dir) = create_test_store().await;

        store.upsert(&sample_pref()).await.expect("Should insert");

        // Same key, new language pair, same webhook
        let updated = ChannelPreference {
            first_language: "de".to_string(),
            second_language: "es".to_string(),
            ..sample_pref()
        };
        store.upsert(&updated).await.expect("Should update");

        let pref = store
            .get(100, 200)
            .await
            .expect("Should query")
            .expect("Row should exist");
        assert_eq!(pref.first_language, "de");
        assert_eq!(pref.second_language, "es");
        assert_eq!(pref.webhook_url, "https://discord.com/api/webhooks/1/abc");
    }

    #[tokio::test]
    async fn test_upsert_is_keyed_per_channel() {
        let (store, _temp_dir) = create_test_store().await;

        store.upsert(&sample_pref()).await.expect("Should insert");

        let other_channel = ChannelPreference {
            channel_id: 201,
            first_language: "ja".to_string(),
            second_language: "ko".to_string(),
            ..sample_pref()
        };
        store.upsert(&other_channel).await.expect("Should insert");

        let first = store.get(100, 200).await.unwrap().unwrap();
        let second = store.get(100, 201).await.unwrap().unwrap();
        assert_eq!(first.first_language, "en");
        assert_eq!(second.first_language, "ja");
    }

    #[tokio::test]
    async fn test_same_channel_id_in_different_servers() {
        let (store, _temp_dir) = create_test_store().await;

        store.upsert(&sample_pref()).await.expect("Should insert");

        let other_server = ChannelPreference {
            server_id: 101,
            first_language: "it".to_string(),
            ..sample_pref()
        };
        store.upsert(&other_server).await.expect("Should insert");

        assert_eq!(
            store.get(100, 200).await.unwrap().unwrap().first_language,
            "en"
        );
        assert_eq!(
            store.get(101, 200).await.unwrap().unwrap().first_language,
            "it"
        );
    }

    // ==================== set_webhook_url Tests ====================

    #[tokio::test]
    async fn test_set_webhook_url_replaces_in_place() {
        let (store, _temp_dir) = create_test_store().await;

        store.upsert(&sample_pref()).await.expect("Should insert");
        store
            .set_webhook_url(100, 200, "https://discord.com/api/webhooks/2/def")
            .await
            .expect("Should update");

        let pref = store.get(100, 200).await.unwrap().unwrap();
        assert_eq!(pref.webhook_url, "https://discord.com/api/webhooks/2/def");
        // Language pair untouched
        assert_eq!(pref.first_language, "en");
        assert_eq!(pref.second_language, "fr");
    }

    // ==================== delete Tests ====================

    #[tokio::test]
    async fn test_delete_existing_row() {
        let (store, _temp_dir) = create_test_store().await;

        store.upsert(&sample_pref()).await.expect("Should insert");

        let deleted = store.delete(100, 200).await.expect("Should delete");
        assert!(deleted);
        assert!(store.get(100, 200).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_twice_reports_nothing_to_remove() {
        let (store, _temp_dir) = create_test_store().await;

        store.upsert(&sample_pref()).await.expect("Should insert");

        assert!(store.delete(100, 200).await.expect("First delete"));
        assert!(!store.delete(100, 200).await.expect("Second delete"));
    }

    #[tokio::test]
    async fn test_delete_absent_row() {
        let (store, _temp_dir) = create_test_store().await;

        let deleted = store.delete(42, 43).await.expect("Should run");
        assert!(!deleted);
    }
}
