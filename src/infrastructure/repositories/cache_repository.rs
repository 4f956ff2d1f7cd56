use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use sqlx::FromRow;
use std::sync::Arc;

/// Persisted synthesis cache entry: content hash -> audio artifact on disk
#[derive(Debug, Clone, FromRow)]
pub struct CacheRecord {
    pub hash: String,
    pub artifact_path: String,
    /// Unix timestamp (seconds)
    pub created_at: i64,
}

pub struct CacheRepository {
    pool: Arc<DbPool>,
}

impl CacheRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Find a cache entry by content hash
    pub async fn find(&self, hash: &str) -> AppResult<Option<CacheRecord>> {
        let record = sqlx::query_as::<_, CacheRecord>(
            r#"
            SELECT hash, artifact_path, created_at
            FROM synthesis_cache
            WHERE hash = ?
            "#,
        )
        .bind(hash)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(record)
    }

    /// Insert an entry unless the hash is already present.
    ///
    /// Each insert is its own transaction. Returns `false` when another
    /// writer got there first, which is not an error.
    pub async fn insert_if_absent(
        &self,
        hash: &str,
        artifact_path: &str,
        created_at: i64,
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO synthesis_cache (hash, artifact_path, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(hash) DO NOTHING
            "#,
        )
        .bind(hash)
        .bind(artifact_path)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete every entry created before `cutoff` and return what was deleted
    pub async fn delete_older_than(&self, cutoff: i64) -> AppResult<Vec<CacheRecord>> {
        let deleted = sqlx::query_as::<_, CacheRecord>(
            r#"
            DELETE FROM synthesis_cache
            WHERE created_at < ?
            RETURNING hash, artifact_path, created_at
            "#,
        )
        .bind(cutoff)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(deleted)
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM synthesis_cache")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }
}
