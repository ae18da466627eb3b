//! Keyword interning: batch upsert and id resolution.

use std::collections::HashMap;

use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use super::Result;
use crate::models::validate_keyword;

pub struct KeywordRepository {
    pool: SqlitePool,
}

impl KeywordRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Batch-upsert words into the keyword table. Invalid words are dropped
    /// with a log line; the batch continues.
    pub async fn upsert_words(&self, words: &[String]) -> Result<()> {
        for word in words {
            let word = match validate_keyword(word) {
                Ok(word) => word,
                Err(err) => {
                    tracing::debug!("Dropping keyword {:?}: {}", word, err);
                    continue;
                }
            };
            sqlx::query("INSERT OR IGNORE INTO keywords (word) VALUES (?)")
                .bind(&word)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    /// Resolve words to ids. Unknown words are absent from the result.
    pub async fn resolve_ids(&self, words: &[String]) -> Result<HashMap<String, i64>> {
        let mut out = HashMap::with_capacity(words.len());
        for word in words {
            let row = sqlx::query("SELECT id FROM keywords WHERE word = ?")
                .bind(word)
                .fetch_optional(&self.pool)
                .await?;
            if let Some(row) = row {
                out.insert(word.clone(), row.get(0));
            }
        }
        Ok(out)
    }

    pub async fn id_for(&self, word: &str) -> Result<Option<i64>> {
        let row = sqlx::query("SELECT id FROM keywords WHERE word = ?")
            .bind(word)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get(0)))
    }

    /// All (word, id) pairs, for cache warming.
    pub async fn all(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query("SELECT word, id FROM keywords")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| (r.get(0), r.get(1))).collect())
    }

    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM keywords")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;

    #[tokio::test]
    async fn upsert_interns_each_word_once() {
        let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
        let repo = ctx.keywords();

        let words = vec!["apple".to_string(), "store".to_string(), "apple".to_string()];
        repo.upsert_words(&words).await.unwrap();
        repo.upsert_words(&words).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 2);

        let ids = repo.resolve_ids(&words).await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains_key("apple"));
    }

    #[tokio::test]
    async fn invalid_words_are_dropped_not_fatal() {
        let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
        let repo = ctx.keywords();

        let words = vec!["ok".to_string(), "bad\u{e9}word".to_string(), "a..b".to_string()];
        repo.upsert_words(&words).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
