//! Phrase loading and keyword relevance.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use super::Resolver;
use crate::models::{Label, Phrase};
use crate::repository::{RepositoryError, Result};

/// Every phrase of a document, via its sentences.
pub struct PhrasesForDocument {
    pool: SqlitePool,
}

impl PhrasesForDocument {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Resolver<i64, Phrase> for PhrasesForDocument {
    async fn resolve(&self, doc_id: &i64) -> Result<Vec<Phrase>> {
        let rows = sqlx::query(
            "SELECT phrases.id, phrases.sentence, phrases.score, phrases.prob, phrases.label
             FROM phrases
                 JOIN sentences ON phrases.sentence = sentences.id
             WHERE sentences.document = ?",
        )
        .bind(doc_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let label: String = r.get(4);
                Ok(Phrase {
                    id: r.get(0),
                    sentence: r.get(1),
                    score: r.get(2),
                    prob: r.get(3),
                    label: Label::parse(&label)
                        .ok_or_else(|| RepositoryError::InvalidRow(format!("label {}", label)))?,
                })
            })
            .collect()
    }
}

/// Whether a phrase mentions any keyword of the resolved set.
pub struct PhraseRelevance {
    pool: SqlitePool,
}

impl PhraseRelevance {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn relevant(&self, phrase_id: i64, keyword_set: &HashSet<i64>) -> Result<bool> {
        let rows = sqlx::query_scalar::<_, i64>(
            "SELECT keyword_id FROM keyword_incidences WHERE phrase_id = ?",
        )
        .bind(phrase_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().any(|id| keyword_set.contains(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;

    async fn seed(ctx: &DbContext) -> (i64, i64, i64) {
        sqlx::query("INSERT INTO domains (key, date) VALUES ('cnn.com', '2008-01-01T00:00:00Z')")
            .execute(ctx.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO articles (path, crawled, inserted, crawl_id, domain_id, status)
             VALUES ('/story', '2008-01-01T00:00:00Z', '2008-01-01T00:00:00Z', NULL, 1, 'Processed')",
        )
        .execute(ctx.pool())
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO documents
                 (article_id, label, length, headline, pos_phrases, neg_phrases, pos_sentences, neg_sentences)
             VALUES (1, 'Unknown', 10, 'Headline', 0, 0, 0, 0)",
        )
        .execute(ctx.pool())
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO sentences (document, score, prob, label, level)
             VALUES (1, 0.5, 0.8, 'Positive', 'P')",
        )
        .execute(ctx.pool())
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO phrases (sentence, score, prob, label) VALUES (1, 0.5, 0.8, 'Positive')",
        )
        .execute(ctx.pool())
        .await
        .unwrap();
        ctx.keywords().upsert_words(&["apple".to_string()]).await.unwrap();
        let apple = ctx.keywords().id_for("apple").await.unwrap().unwrap();
        sqlx::query("INSERT INTO keyword_incidences (keyword_id, phrase_id) VALUES (?, 1)")
            .bind(apple)
            .execute(ctx.pool())
            .await
            .unwrap();
        (1, 1, apple)
    }

    #[tokio::test]
    async fn loads_phrases_for_document() {
        let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
        let (doc_id, phrase_id, _) = seed(&ctx).await;

        let resolver = PhrasesForDocument::new(ctx.pool().clone());
        let phrases = resolver.resolve(&doc_id).await.unwrap();
        assert_eq!(phrases.len(), 1);
        assert_eq!(phrases[0].id, phrase_id);
        assert_eq!(phrases[0].label, Label::Positive);
    }

    #[tokio::test]
    async fn relevance_checks_incidences_against_set() {
        let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
        let (_, phrase_id, apple) = seed(&ctx).await;

        let relevance = PhraseRelevance::new(ctx.pool().clone());
        assert!(relevance
            .relevant(phrase_id, &HashSet::from([apple]))
            .await
            .unwrap());
        assert!(!relevance
            .relevant(phrase_id, &HashSet::from([apple + 100]))
            .await
            .unwrap());
    }
}
