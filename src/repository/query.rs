//! User query records and their resolution audit rows.

use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use super::{parse_datetime, parse_datetime_opt, Result};
use crate::models::UserQuery;

pub struct UserQueryRepository {
    pool: SqlitePool,
}

impl UserQueryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Queries are unique by text: resubmission reuses the existing row.
    pub async fn get_or_create(&self, text: &str, email: Option<&str>) -> Result<UserQuery> {
        sqlx::query("INSERT OR IGNORE INTO user_queries (text, created, email) VALUES (?, ?, ?)")
            .bind(text)
            .bind(Utc::now().to_rfc3339())
            .bind(email)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query(
            "SELECT id, text, created, fulfilled, email, message, cancelled
             FROM user_queries WHERE text = ?",
        )
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserQuery {
            id: row.get(0),
            text: row.get(1),
            created: parse_datetime(&row.get::<String, _>(2)),
            fulfilled: parse_datetime_opt(row.get(3)),
            email: row.get(4),
            message: row.get(5),
            cancelled: row.get::<i64, _>(6) != 0,
        })
    }

    pub async fn get(&self, id: i64) -> Result<Option<UserQuery>> {
        let row = sqlx::query(
            "SELECT id, text, created, fulfilled, email, message, cancelled
             FROM user_queries WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| UserQuery {
            id: row.get(0),
            text: row.get(1),
            created: parse_datetime(&row.get::<String, _>(2)),
            fulfilled: parse_datetime_opt(row.get(3)),
            email: row.get(4),
            message: row.get(5),
            cancelled: row.get::<i64, _>(6) != 0,
        }))
    }

    pub async fn set_fulfilled(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE user_queries SET fulfilled = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record a presentation failure on the query.
    pub async fn set_failure(&self, id: i64, message: &str, cancelled: bool) -> Result<()> {
        sqlx::query("UPDATE user_queries SET message = ?, cancelled = ? WHERE id = ?")
            .bind(message)
            .bind(cancelled as i64)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_message(&self, id: i64, message: &str) -> Result<()> {
        sqlx::query("UPDATE user_queries SET message = ? WHERE id = ?")
            .bind(message)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Append resolution audit rows for a query run.
    pub async fn record_resolution(
        &self,
        query_id: i64,
        keyword_ids: &[i64],
        domain_ids: &[i64],
        document_ids: &[i64],
    ) -> Result<()> {
        for keyword_id in keyword_ids {
            sqlx::query("INSERT INTO user_query_keywords (query_id, keyword_id) VALUES (?, ?)")
                .bind(query_id)
                .bind(keyword_id)
                .execute(&self.pool)
                .await?;
        }
        for domain_id in domain_ids {
            sqlx::query("INSERT INTO user_query_domains (query_id, domain_id) VALUES (?, ?)")
                .bind(query_id)
                .bind(domain_id)
                .execute(&self.pool)
                .await?;
        }
        for document_id in document_ids {
            sqlx::query("INSERT INTO user_query_articles (query_id, document_id) VALUES (?, ?)")
                .bind(query_id)
                .bind(document_id)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }
}
