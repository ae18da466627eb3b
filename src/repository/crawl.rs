//! Crawl source and crawl file repository.

use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use super::{parse_datetime, RepositoryError, Result};
use crate::models::{CrawlFile, CrawlFileKind, CrawlFileStatus, CrawlSource};

pub struct CrawlRepository {
    pool: SqlitePool,
}

impl CrawlRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_source(&self, key: &str) -> Result<Option<CrawlSource>> {
        let row = sqlx::query("SELECT id, key FROM crawl_sources WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| CrawlSource {
            id: r.get(0),
            key: r.get(1),
        }))
    }

    pub async fn get_source_by_id(&self, id: i64) -> Result<Option<CrawlSource>> {
        let row = sqlx::query("SELECT id, key FROM crawl_sources WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| CrawlSource {
            id: r.get(0),
            key: r.get(1),
        }))
    }

    /// Fetch a crawl source, creating it when absent.
    pub async fn get_or_create_source(&self, key: &str) -> Result<CrawlSource> {
        if let Some(source) = self.get_source(key).await? {
            return Ok(source);
        }

        sqlx::query("INSERT OR IGNORE INTO crawl_sources (key) VALUES (?)")
            .bind(key)
            .execute(&self.pool)
            .await?;

        self.get_source(key)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("crawl source {}", key)))
    }

    pub async fn create_file(
        &self,
        key: &str,
        source_id: i64,
        kind: CrawlFileKind,
    ) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO crawl_files (key, status, kind, source_id, date_loaded, date_update)
             VALUES (?, 'Incomplete', ?, ?, ?, ?)",
        )
        .bind(key)
        .bind(kind.as_str())
        .bind(source_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_file(&self, id: i64) -> Result<Option<CrawlFile>> {
        let row = sqlx::query(
            "SELECT id, key, status, kind, source_id, date_loaded, date_update
             FROM crawl_files WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let status: String = r.get(2);
            let kind: String = r.get(3);
            Ok(CrawlFile {
                id: r.get(0),
                key: r.get(1),
                status: CrawlFileStatus::parse(&status)
                    .ok_or_else(|| RepositoryError::InvalidRow(format!("status {}", status)))?,
                kind: CrawlFileKind::parse(&kind)
                    .ok_or_else(|| RepositoryError::InvalidRow(format!("kind {}", kind)))?,
                source_id: r.get(4),
                date_loaded: parse_datetime(&r.get::<String, _>(5)),
                date_update: parse_datetime(&r.get::<String, _>(6)),
            })
        })
        .transpose()
    }

    pub async fn set_file_status(&self, id: i64, status: CrawlFileStatus) -> Result<()> {
        sqlx::query("UPDATE crawl_files SET status = ?, date_update = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Random Incomplete crawl file ids for queue replenishment, skipping
    /// keys containing `skip_substring`.
    pub async fn random_incomplete_ids(
        &self,
        limit: i64,
        skip_substring: Option<&str>,
    ) -> Result<Vec<i64>> {
        let rows = sqlx::query(
            "SELECT id, key FROM crawl_files WHERE status = 'Incomplete'
             ORDER BY RANDOM() LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter(|r| {
                let key: String = r.get(1);
                skip_substring.map_or(true, |skip| !key.contains(skip))
            })
            .map(|r| r.get(0))
            .collect())
    }

    /// Remove duplicate crawl files, keeping the lowest id per (key, source).
    pub async fn deduplicate(&self) -> Result<u64> {
        tracing::debug!("Deduplicating crawl files...");
        let result = sqlx::query(
            "DELETE FROM crawl_files WHERE id NOT IN (
                 SELECT MIN(id) FROM crawl_files GROUP BY key, source_id
             )",
        )
        .execute(&self.pool)
        .await?;
        tracing::debug!("Deduplication finished.");
        Ok(result.rows_affected())
    }
}
