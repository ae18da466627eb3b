//! Result presentation.
//!
//! Serializes a query outcome to JSON under a deterministic object-store
//! key, stamps the query fulfilled, and optionally notifies the submitter.
//! Presentation failures are recorded on the query row instead of being
//! swallowed.

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;

use crate::notify::Notifier;
use crate::query::QueryOutcome;
use crate::repository::{DbContext, RepositoryError};
use crate::store::{ObjectStore, StoreError};

#[derive(Debug, Error)]
pub enum PresentError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Result serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PresentError>;

pub struct ResultPresenter {
    ctx: DbContext,
    store: Arc<dyn ObjectStore>,
    notifier: Arc<dyn Notifier>,
    bucket: String,
}

impl ResultPresenter {
    pub fn new(
        ctx: DbContext,
        store: Arc<dyn ObjectStore>,
        notifier: Arc<dyn Notifier>,
        bucket: &str,
    ) -> Self {
        Self {
            ctx,
            store,
            notifier,
            bucket: bucket.to_string(),
        }
    }

    /// Serialize and store a result, marking the query fulfilled.
    ///
    /// On failure the error is recorded on the query row and returned.
    pub async fn present(&self, outcome: &QueryOutcome) -> Result<String> {
        let key = format!("results/{}", outcome.query.id);

        match self.try_present(outcome, &key).await {
            Ok(()) => Ok(key),
            Err(err) => {
                let queries = self.ctx.user_queries();
                if let Err(record_err) = queries
                    .set_failure(outcome.query.id, &err.to_string(), true)
                    .await
                {
                    tracing::error!("Failed to record presentation failure: {}", record_err);
                }
                Err(err)
            }
        }
    }

    async fn try_present(&self, outcome: &QueryOutcome, key: &str) -> Result<()> {
        let document = render(outcome);
        let bytes = serde_json::to_vec(&document)?;

        self.store.put(&self.bucket, key, &bytes).await?;

        let queries = self.ctx.user_queries();
        if let Some(message) = outcome.messages.first() {
            queries.set_message(outcome.query.id, &message.to_string()).await?;
        }
        queries.set_fulfilled(outcome.query.id).await?;

        if let Some(email) = &outcome.query.email {
            let subject = format!("Your query '{}' has finished", outcome.query.text);
            let body = format!("{} documents matched; results at {}", outcome.documents.len(), key);
            if let Err(err) = self.notifier.notify(email, &subject, &body).await {
                tracing::warn!("Notification for query {} failed: {}", outcome.query.id, err);
            }
        }

        Ok(())
    }
}

/// Render the externally visible result document.
///
/// Labels map to {-1, 0, 1}, dates to unix milliseconds, date methods to
/// {Certain: 0, Uncertain: 1, Crawled: 2}.
pub fn render(outcome: &QueryOutcome) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = outcome
        .documents
        .iter()
        .map(|score| {
            json!({
                "id": score.document.id,
                "label": score.document.label.to_int(),
                "method": score.method.to_int(),
                "date": score.date.timestamp_millis(),
                "pos_phrases": score.document.pos_phrases,
                "neg_phrases": score.document.neg_phrases,
                "pos_sentences": score.document.pos_sentences,
                "neg_sentences": score.document.neg_sentences,
                "pos_relevant_phrases": score.relevant_pos,
                "neg_relevant_phrases": score.relevant_neg,
                "phrase_prob_sum": score.phrase_prob_sum,
                "phrase_count": score.phrase_count,
            })
        })
        .collect();

    json!({
        "result_version": 2,
        "query_text": outcome.query.text.clone(),
        "keywords_returned": outcome.keywords.len(),
        "using_keywords": i32::from(!outcome.keywords.is_empty()),
        "used_loose_match": outcome.used_loose,
        "documents_returned": outcome.documents.len(),
        "domains_returned": outcome.summaries.len(),
        "phrases_returned": outcome.documents.iter().map(|d| d.phrase_count).sum::<usize>(),
        "keyword_set": outcome.keywords.iter().map(|(_, w)| w.clone()).collect::<Vec<_>>(),
        "domains": &outcome.summaries,
        "documents": rows,
        "messages": outcome.messages.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, Label, UserQuery};
    use crate::query::{DocumentScore, StatusMessage};
    use crate::resolvers::DateMethod;
    use chrono::TimeZone;

    fn outcome() -> QueryOutcome {
        let date = chrono::Utc.with_ymd_and_hms(2008, 3, 1, 0, 0, 0).unwrap();
        QueryOutcome {
            query: UserQuery {
                id: 17,
                text: "apple store cnn.com".to_string(),
                created: date,
                fulfilled: None,
                email: None,
                message: None,
                cancelled: false,
            },
            messages: vec![StatusMessage::ExpandingLoose { strict_count: 1 }],
            keywords: vec![(1, "apple".to_string()), (2, "store".to_string())],
            domains: vec![(1, "cnn.com".to_string())],
            used_loose: true,
            documents: vec![DocumentScore {
                document: Document {
                    id: 9,
                    article_id: 4,
                    label: Label::Negative,
                    length: 120,
                    headline: "Hello".to_string(),
                    pos_phrases: 2,
                    neg_phrases: 5,
                    pos_sentences: 1,
                    neg_sentences: 3,
                },
                method: DateMethod::Certain,
                date,
                relevant_pos: 1,
                relevant_neg: 2,
                phrase_prob_sum: 1.5,
                phrase_count: 7,
            }],
            summaries: vec![],
        }
    }

    #[test]
    fn renders_normalized_values() {
        let value = render(&outcome());
        assert_eq!(value["result_version"], 2);
        assert_eq!(value["using_keywords"], 1);
        assert_eq!(value["documents"][0]["label"], -1);
        assert_eq!(value["documents"][0]["method"], 0);
        assert_eq!(value["documents"][0]["date"], 1204329600000i64);
        assert_eq!(value["keyword_set"][0], "apple");
    }

    #[tokio::test]
    async fn presents_to_store_and_fulfills() {
        use crate::notify::LogNotifier;
        use crate::store::FsObjectStore;

        let dir = tempfile::tempdir().unwrap();
        let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
        let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(dir.path()));

        // The query row must exist to be fulfilled.
        let query = ctx
            .user_queries()
            .get_or_create("apple store cnn.com", None)
            .await
            .unwrap();
        let mut data = outcome();
        data.query = query;

        let presenter = ResultPresenter::new(
            ctx.clone(),
            Arc::clone(&store),
            Arc::new(LogNotifier),
            "results.sentimentron.co.uk",
        );
        let key = presenter.present(&data).await.unwrap();
        assert_eq!(key, format!("results/{}", data.query.id));

        let bytes = store.fetch("results.sentimentron.co.uk", &key).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["query_text"], "apple store cnn.com");

        let stored = ctx.user_queries().get(data.query.id).await.unwrap().unwrap();
        assert!(stored.fulfilled.is_some());
    }
}
