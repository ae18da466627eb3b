//! Domain and article repository.

use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use super::{parse_datetime, RepositoryError, Result};
use crate::models::{Article, ArticleStatus, Domain};

pub struct ArticleRepository {
    pool: SqlitePool,
}

impl ArticleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_domain(&self, key: &str) -> Result<Option<Domain>> {
        let row = sqlx::query("SELECT id, key, date FROM domains WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Domain {
            id: r.get(0),
            key: r.get(1),
            date: parse_datetime(&r.get::<String, _>(2)),
        }))
    }

    pub async fn get_domain_by_id(&self, id: i64) -> Result<Option<Domain>> {
        let row = sqlx::query("SELECT id, key, date FROM domains WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Domain {
            id: r.get(0),
            key: r.get(1),
            date: parse_datetime(&r.get::<String, _>(2)),
        }))
    }

    /// Insert a domain row unless one already exists. Losing a race is fine:
    /// the caller re-reads afterwards.
    pub async fn insert_domain_ignore(&self, key: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO domains (key, date) VALUES (?, ?)")
            .bind(key)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// All (key, id) domain pairs, for cache warming.
    pub async fn all_domains(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query("SELECT key, id FROM domains")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| (r.get(0), r.get(1))).collect())
    }

    /// Whether an article already exists for (domain, path, crawl).
    pub async fn exists(&self, domain_id: i64, path: &str, crawl_id: i64) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM articles WHERE domain_id = ? AND path = ? AND crawl_id = ?",
        )
        .bind(domain_id)
        .bind(path)
        .bind(crawl_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Article>> {
        let row = sqlx::query(
            "SELECT id, path, crawled, inserted, crawl_id, domain_id, status
             FROM articles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let status: String = r.get(6);
            Ok(Article {
                id: r.get(0),
                path: r.get(1),
                crawled: parse_datetime(&r.get::<String, _>(2)),
                inserted: parse_datetime(&r.get::<String, _>(3)),
                crawl_id: r.get(4),
                domain_id: r.get(5),
                status: ArticleStatus::parse(&status)
                    .ok_or_else(|| RepositoryError::InvalidRow(format!("status {}", status)))?,
            })
        })
        .transpose()
    }

    /// Paths of all articles under a domain (for coverage computation).
    pub async fn paths_for_domain(&self, domain_id: i64) -> Result<Vec<String>> {
        let rows =
            sqlx::query_scalar::<_, String>("SELECT path FROM articles WHERE domain_id = ?")
                .bind(domain_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }
}
