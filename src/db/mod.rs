//! SQLite storage for fetched posts.

mod models;
mod repository;
mod schema;

pub use models::*;
pub use repository::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::debug;

/// One writer at a time plus a few readers for the lookup helpers.
const MAX_CONNECTIONS: u32 = 5;

/// How long a connection waits on another writer's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle on the post database file.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the post database at `path`, creating the file and its parent
    /// directory if they are missing.
    ///
    /// Foreign keys are enforced on every connection so deleting a post
    /// removes its thread, categories and entities. Tables are created by
    /// [`PostRepository::create_tables_if_not_exist`] at the start of each fetch.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the connection
    /// fails, or the file is read-only.
    pub async fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open post database: {}", path.display()))?;

        let db = Self { pool };
        db.check_writable(path).await?;
        debug!(path = %path.display(), "Post database ready");

        Ok(db)
    }

    // Saving a page needs a write transaction.
    async fn check_writable(&self, path: &Path) -> Result<()> {
        let tx = self.pool.begin().await.with_context(|| {
            format!(
                "Post database is not writable (path: {}). Check file permissions",
                path.display()
            )
        })?;
        tx.commit()
            .await
            .context("Failed to commit post database write check")?;
        Ok(())
    }

    /// A repository that saves posts through this database's pool.
    #[must_use]
    pub fn repository(&self) -> SqlitePostRepository {
        SqlitePostRepository::new(self.pool.clone())
    }

    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for every pooled connection to close, checkpointing the WAL.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_new_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data").join("webz_data.sqlite");

        let db = Database::new(&path).await.unwrap();
        assert!(path.exists());
        db.close().await;
    }

    #[tokio::test]
    async fn test_foreign_keys_are_enforced() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(&temp_dir.path().join("fk.sqlite"))
            .await
            .unwrap();

        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_repository_shares_the_pool() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(&temp_dir.path().join("shared.sqlite"))
            .await
            .unwrap();

        db.repository().create_tables_if_not_exist().await.unwrap();
        assert_eq!(count_posts(db.pool()).await.unwrap(), 0);
    }
}
