//! Raw article repository: ingest-side rows and their dedup keys.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use super::{parse_datetime, RepositoryError, Result};
use crate::models::{RawArticle, RawArticleStatus};

pub struct RawArticleRepository {
    pool: SqlitePool,
}

impl RawArticleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Whether a raw article with this dedup key already exists.
    pub async fn exists(
        &self,
        crawl_id: i64,
        url: &str,
        date_crawled: DateTime<Utc>,
    ) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM raw_articles WHERE crawl_id = ? AND url = ? AND date_crawled = ?",
        )
        .bind(crawl_id)
        .bind(url)
        .bind(date_crawled.to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    /// Insert one raw record; returns None when the dedup key already exists.
    pub async fn insert(
        &self,
        crawl_id: i64,
        url: &str,
        content_type: &str,
        date_crawled: DateTime<Utc>,
        headers: Option<&str>,
        body: Option<&str>,
    ) -> Result<Option<i64>> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO raw_articles
                 (crawl_id, url, content_type, date_crawled, headers, body, status)
             VALUES (?, ?, ?, ?, ?, ?, 'Unprocessed')",
        )
        .bind(crawl_id)
        .bind(url)
        .bind(content_type)
        .bind(date_crawled.to_rfc3339())
        .bind(headers)
        .bind(body)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(result.last_insert_rowid()))
    }

    pub async fn get(&self, id: i64) -> Result<Option<RawArticle>> {
        let row = sqlx::query(
            "SELECT id, crawl_id, url, content_type, date_crawled, headers, body, status
             FROM raw_articles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let status: String = r.get(7);
            Ok(RawArticle {
                id: r.get(0),
                crawl_id: r.get(1),
                url: r.get(2),
                content_type: r.get(3),
                date_crawled: parse_datetime(&r.get::<String, _>(4)),
                headers: r.get(5),
                body: r.get(6),
                status: RawArticleStatus::parse(&status)
                    .ok_or_else(|| RepositoryError::InvalidRow(format!("status {}", status)))?,
            })
        })
        .transpose()
    }

    /// Result status recorded for a raw article, if any.
    pub async fn result_status(&self, raw_article_id: i64) -> Result<Option<RawArticleStatus>> {
        let row = sqlx::query("SELECT status FROM raw_article_results WHERE raw_article_id = ?")
            .bind(raw_article_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| {
            let status: String = r.get(0);
            RawArticleStatus::parse(&status)
                .ok_or_else(|| RepositoryError::InvalidRow(format!("status {}", status)))
        })
        .transpose()
    }

    /// Record a skip for work that already has its article committed.
    pub async fn mark_skipped(&self, raw_article_id: i64) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO raw_article_results (raw_article_id, status)
             VALUES (?, 'Processed')",
        )
        .bind(raw_article_id)
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "UPDATE raw_articles SET status = 'Processed', headers = NULL, body = NULL
             WHERE id = ?",
        )
        .bind(raw_article_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record a failed pass. Used outside the main commit transaction.
    pub async fn mark_error(&self, raw_article_id: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO raw_article_results (raw_article_id, status) VALUES (?, 'Error')
             ON CONFLICT(raw_article_id) DO UPDATE SET status = 'Error'",
        )
        .bind(raw_article_id)
        .execute(&self.pool)
        .await?;
        sqlx::query("UPDATE raw_articles SET status = 'Error' WHERE id = ?")
            .bind(raw_article_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Ids of raw articles with the given status.
    pub async fn ids_with_status(&self, status: RawArticleStatus) -> Result<Vec<i64>> {
        let rows = sqlx::query_scalar::<_, i64>("SELECT id FROM raw_articles WHERE status = ?")
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Ids of raw articles never recorded in raw_article_results.
    pub async fn ids_without_results(&self) -> Result<Vec<i64>> {
        let rows = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM raw_articles
             WHERE id NOT IN (SELECT raw_article_id FROM raw_article_results)",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
