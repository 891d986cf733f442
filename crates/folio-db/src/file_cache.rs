//! PostgreSQL implementation of the searchable file-content cache.
//!
//! One row per remote file id. Rows are only ever created or replaced
//! whole; staleness is decided by the synchronizer comparing the remote
//! modification time against `snapshot_timestamp`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use folio_core::{CachedFileMeta, Error, FileCacheRepository, Result};

use crate::escape_like;

/// PostgreSQL-backed file content cache.
#[derive(Clone)]
pub struct PgFileCacheRepository {
    pool: Pool<Postgres>,
}

impl PgFileCacheRepository {
    /// Create a new PgFileCacheRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileCacheRepository for PgFileCacheRepository {
    async fn snapshot(&self) -> Result<HashMap<String, CachedFileMeta>> {
        let rows = sqlx::query("SELECT id, title, snapshot_timestamp FROM file_cache")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let mut entries = HashMap::with_capacity(rows.len());
        for row in rows {
            let meta = CachedFileMeta {
                file_id: row.get("id"),
                title: row.get("title"),
                snapshot_timestamp: row.get("snapshot_timestamp"),
            };
            entries.insert(meta.file_id.clone(), meta);
        }

        debug!(
            subsystem = "database",
            component = "file_cache",
            op = "snapshot",
            entry_count = entries.len(),
            "Loaded cache snapshot"
        );
        Ok(entries)
    }

    async fn replace(&self, file_id: &str, title: &str, contents: &str) -> Result<()> {
        let now = Utc::now();

        // Delete + insert as one transaction so a failure never leaves the
        // entry missing or half-written.
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM file_cache WHERE id = $1")
            .bind(file_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query(
            "INSERT INTO file_cache (id, title, contents, snapshot_timestamp) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(file_id)
        .bind(title)
        .bind(contents)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "file_cache",
            op = "replace",
            file_id = %file_id,
            content_len = contents.len(),
            "Replaced cache entry"
        );
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<String>> {
        let escaped_query = escape_like(query);

        let rows = sqlx::query(
            r#"
            SELECT id FROM file_cache
            WHERE title ILIKE '%' || $1 || '%' ESCAPE '\'
               OR contents ILIKE '%' || $1 || '%' ESCAPE '\'
            "#,
        )
        .bind(&escaped_query)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(|row| row.get("id")).collect())
    }
}
