//! Deduplicating, transactional persistence of fetched posts.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, error, info, warn};

use super::models::{StoredEntity, StoredPost};
use super::schema;
use crate::webz::{Post, Thread};

/// Storage for posts fetched from the API.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Ensure every table exists. Safe to call on every run.
    async fn create_tables_if_not_exist(&self) -> Result<()>;

    /// Store the posts not already present, all in one transaction.
    ///
    /// Returns how many posts were newly inserted. Posts whose uuid is
    /// already stored are skipped and not counted. If anything fails, none
    /// of the batch is committed.
    async fn save_posts(&self, posts: &[Post]) -> Result<u64>;
}

/// [`PostRepository`] backed by a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct SqlitePostRepository {
    pool: SqlitePool,
}

impl SqlitePostRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl PostRepository for SqlitePostRepository {
    async fn create_tables_if_not_exist(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire database connection")?;

        info!("Creating database tables if they don't exist");

        let tables = [
            ("posts", schema::CREATE_POSTS_TABLE),
            ("threads", schema::CREATE_THREADS_TABLE),
            ("categories", schema::CREATE_CATEGORIES_TABLE),
            ("entities", schema::CREATE_ENTITIES_TABLE),
        ];
        for (name, sql) in tables {
            sqlx::query(sql)
                .execute(&mut *conn)
                .await
                .with_context(|| format!("Failed to create {name} table"))?;
        }

        for sql in schema::CREATE_INDEXES {
            sqlx::query(*sql)
                .execute(&mut *conn)
                .await
                .context("Failed to create index")?;
        }

        debug!("Database tables ready");
        Ok(())
    }

    async fn save_posts(&self, posts: &[Post]) -> Result<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin save transaction")?;

        match insert_new_posts(&mut *tx, posts).await {
            Ok(saved) => {
                tx.commit().await.context("Failed to commit saved posts")?;
                Ok(saved)
            }
            Err(e) => {
                error!("Error saving posts to database: {e:#}");
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Failed to roll back save transaction: {rollback_err}");
                }
                Err(e)
            }
        }
    }
}

async fn insert_new_posts(conn: &mut SqliteConnection, posts: &[Post]) -> Result<u64> {
    let mut saved = 0;

    for post in posts {
        if post_exists(conn, &post.uuid).await? {
            debug!(uuid = %post.uuid, "Post already exists, skipping");
            continue;
        }

        insert_post(conn, post).await?;

        if let Some(thread) = &post.thread {
            insert_thread(conn, &post.uuid, thread).await?;
        }

        for category in &post.categories {
            sqlx::query("INSERT INTO categories (post_uuid, category) VALUES (?, ?)")
                .bind(&post.uuid)
                .bind(category)
                .execute(&mut *conn)
                .await
                .context("Failed to insert category")?;
        }

        if let Some(entities) = &post.entities {
            for (kind, entity) in entities.tagged() {
                sqlx::query(
                    "INSERT INTO entities (post_uuid, type, name, sentiment) VALUES (?, ?, ?, ?)",
                )
                .bind(&post.uuid)
                .bind(kind.as_str())
                .bind(&entity.name)
                .bind(&entity.sentiment)
                .execute(&mut *conn)
                .await
                .context("Failed to insert entity")?;
            }
        }

        saved += 1;
    }

    Ok(saved)
}

async fn post_exists(conn: &mut SqliteConnection, uuid: &str) -> Result<bool> {
    let row: Option<i64> = sqlx::query_scalar("SELECT 1 FROM posts WHERE uuid = ?")
        .bind(uuid)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to check for existing post")?;

    Ok(row.is_some())
}

async fn insert_post(conn: &mut SqliteConnection, post: &Post) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO posts (
            uuid, url, author, published, title, text, language,
            sentiment, ord_in_thread, parent_url, highlight_text,
            highlight_title, highlight_thread_title, crawled, updated
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(&post.uuid)
    .bind(&post.url)
    .bind(&post.author)
    .bind(normalize_timestamp(post.published.as_deref()))
    .bind(&post.title)
    .bind(&post.text)
    .bind(&post.language)
    .bind(&post.sentiment)
    .bind(post.ord_in_thread)
    .bind(&post.parent_url)
    .bind(&post.highlight_text)
    .bind(&post.highlight_title)
    .bind(&post.highlight_thread_title)
    .bind(normalize_timestamp(post.crawled.as_deref()))
    .bind(normalize_timestamp(post.updated.as_deref()))
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Failed to insert post {}", post.uuid))?;

    Ok(())
}

async fn insert_thread(
    conn: &mut SqliteConnection,
    post_uuid: &str,
    thread: &Thread,
) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO threads (
            uuid, url, site_full, site, site_section, title,
            title_full, published, country, main_image,
            performance_score, domain_rank, post_uuid
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(&thread.uuid)
    .bind(&thread.url)
    .bind(&thread.site_full)
    .bind(&thread.site)
    .bind(&thread.site_section)
    .bind(&thread.title)
    .bind(&thread.title_full)
    .bind(normalize_timestamp(thread.published.as_deref()))
    .bind(&thread.country)
    .bind(&thread.main_image)
    .bind(thread.performance_score)
    .bind(thread.domain_rank)
    .bind(post_uuid)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Failed to insert thread for post {post_uuid}"))?;

    Ok(())
}

/// Normalize an API timestamp to UTC RFC 3339.
///
/// Unparseable values are kept as-is; empty values become `None`.
fn normalize_timestamp(value: Option<&str>) -> Option<String> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    match DateTime::parse_from_rfc3339(value) {
        Ok(ts) => Some(
            ts.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
        Err(_) => Some(value.to_string()),
    }
}

/// Get a stored post by its uuid.
pub async fn get_post_by_uuid(pool: &SqlitePool, uuid: &str) -> Result<Option<StoredPost>> {
    sqlx::query_as("SELECT * FROM posts WHERE uuid = ?")
        .bind(uuid)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch post by uuid")
}

/// Count all stored posts.
pub async fn count_posts(pool: &SqlitePool) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await
        .context("Failed to count posts")
}

/// Get the categories of a post, in insertion order.
pub async fn get_categories_for_post(pool: &SqlitePool, post_uuid: &str) -> Result<Vec<String>> {
    sqlx::query_scalar("SELECT category FROM categories WHERE post_uuid = ? ORDER BY id")
        .bind(post_uuid)
        .fetch_all(pool)
        .await
        .context("Failed to fetch categories")
}

/// Get the entities of a post, in insertion order.
pub async fn get_entities_for_post(
    pool: &SqlitePool,
    post_uuid: &str,
) -> Result<Vec<StoredEntity>> {
    sqlx::query_as(
        "SELECT id, post_uuid, type, name, sentiment FROM entities WHERE post_uuid = ? ORDER BY id",
    )
    .bind(post_uuid)
    .fetch_all(pool)
    .await
    .context("Failed to fetch entities")
}
