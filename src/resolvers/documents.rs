//! Candidate document enumeration and adjacency membership tests.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;

use super::Resolver;
use crate::repository::Result;

/// Every document id whose article belongs to a domain.
pub struct DocumentsByDomain {
    pool: SqlitePool,
}

impl DocumentsByDomain {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Resolver<i64, i64> for DocumentsByDomain {
    async fn resolve(&self, domain_id: &i64) -> Result<Vec<i64>> {
        let rows = sqlx::query_scalar::<_, i64>(
            "SELECT DISTINCT documents.id
             FROM articles
                 JOIN documents ON articles.id = documents.article_id
             WHERE articles.domain_id = ?",
        )
        .bind(domain_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Every document id with any adjacency mentioning a keyword.
pub struct DocumentsByKeyword {
    pool: SqlitePool,
}

impl DocumentsByKeyword {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Resolver<i64, i64> for DocumentsByKeyword {
    async fn resolve(&self, keyword_id: &i64) -> Result<Vec<i64>> {
        let rows = sqlx::query_scalar::<_, i64>(
            "SELECT DISTINCT doc_id
             FROM keyword_adjacencies
             WHERE key1_id = ?1 OR key2_id = ?1",
        )
        .bind(keyword_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Adjacency membership tests for one document.
pub struct AdjacencyIndex {
    pool: SqlitePool,
}

impl AdjacencyIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Strict: both keywords appear in one adjacency row (either order).
    pub async fn strict(&self, key1: i64, key2: i64, doc_id: i64) -> Result<bool> {
        let row = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM keyword_adjacencies
             WHERE doc_id = ?1
               AND ((key1_id = ?2 AND key2_id = ?3) OR (key1_id = ?3 AND key2_id = ?2))
             LIMIT 1",
        )
        .bind(doc_id)
        .bind(key1)
        .bind(key2)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    /// Loose: the keyword appears in any adjacency row of the document.
    pub async fn loose(&self, keyword_id: i64, doc_id: i64) -> Result<bool> {
        let row = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM keyword_adjacencies
             WHERE doc_id = ?1 AND (key1_id = ?2 OR key2_id = ?2)
             LIMIT 1",
        )
        .bind(doc_id)
        .bind(keyword_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    /// Top domains hosting documents whose adjacencies mention any of the
    /// given keywords. Used to auto-seed keyword-only queries.
    pub async fn top_domains_for_keywords(
        &self,
        keyword_ids: &HashSet<i64>,
        limit: i64,
    ) -> Result<Vec<i64>> {
        if keyword_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; keyword_ids.len()].join(", ");
        let sql = format!(
            "SELECT articles.domain_id
             FROM keyword_adjacencies
                 JOIN documents ON keyword_adjacencies.doc_id = documents.id
                 JOIN articles ON documents.article_id = articles.id
             WHERE keyword_adjacencies.key1_id IN ({ph})
                OR keyword_adjacencies.key2_id IN ({ph})
             GROUP BY articles.domain_id
             ORDER BY COUNT(DISTINCT documents.id) DESC
             LIMIT ?",
            ph = placeholders
        );

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for id in keyword_ids {
            query = query.bind(id);
        }
        for id in keyword_ids {
            query = query.bind(id);
        }
        query = query.bind(limit);

        Ok(query.fetch_all(&self.pool).await?)
    }
}
