use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::config::Config;

/// Connection options for the registry database. Foreign keys are enforced
/// on every connection; relations are checked by SQLite, not by callers.
pub fn connect_options(config: &Config) -> Result<SqliteConnectOptions> {
    let url = format!("sqlite:{}", config.db.path.display());
    let options = SqliteConnectOptions::from_str(&url)
        .with_context(|| format!("Invalid database path: {}", config.db.path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(SqliteJournalMode::Wal);
    Ok(options)
}

pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options(config)?)
        .await?;

    tracing::debug!(path = %db_path.display(), "opened registry database");

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_connect_enforces_foreign_keys() {
        let tmp = TempDir::new().unwrap();
        let config = Config::for_database(tmp.path().join("nested/registry.sqlite"));
        let pool = connect(&config).await.unwrap();

        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(enabled, 1);
        assert!(config.db.path.exists());
    }
}
