//! Document graph persistence.
//!
//! One article's enrichment output commits atomically: the article row, the
//! document and its children, and the raw-article bookkeeping all become
//! visible together or not at all.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::{Row, SqliteConnection};

use super::{RepositoryError, Result};
use crate::models::{
    validate_software_version, ArticleStatus, DateInterpretation, Document, KeywordAdjacency,
    Label, SentenceLevel, SoftwareAction,
};

/// One phrase trace destined for the phrases table, with the keyword words
/// found inside it (resolved to ids at commit time).
#[derive(Debug, Clone)]
pub struct PhraseRow {
    pub label: Label,
    pub score: f64,
    pub prob: f64,
    pub keywords: Vec<String>,
}

/// One sentence trace and its phrases.
#[derive(Debug, Clone)]
pub struct SentenceRow {
    pub label: Label,
    pub score: f64,
    pub prob: f64,
    pub level: SentenceLevel,
    pub phrases: Vec<PhraseRow>,
}

#[derive(Debug, Clone)]
pub struct AmbiguousDateRow {
    pub date: DateTime<Utc>,
    pub interpreted_with: DateInterpretation,
    pub matched_text: String,
    pub position: i64,
}

/// Everything the pipeline persists for a Processed article.
#[derive(Debug, Clone, Default)]
pub struct DocumentPayload {
    pub label: Label,
    pub length: i64,
    pub headline: String,
    pub pos_phrases: i64,
    pub neg_phrases: i64,
    pub pos_sentences: i64,
    pub neg_sentences: i64,
    pub sentences: Vec<SentenceRow>,
    /// Adjacency pairs as words; resolved through `keyword_ids`.
    pub adjacencies: Vec<KeywordAdjacency>,
    pub certain_dates: Vec<(DateTime<Utc>, i64)>,
    pub ambiguous_dates: Vec<AmbiguousDateRow>,
    pub relative_links: Vec<String>,
    pub absolute_links: Vec<(i64, String)>,
    /// Component version strings and what each one did.
    pub provenance: Vec<(String, SoftwareAction)>,
    /// Pre-resolved keyword ids (cache + batch upsert output).
    pub keyword_ids: HashMap<String, i64>,
}

/// The unit of one pipeline commit.
#[derive(Debug, Clone)]
pub struct DocumentGraph {
    pub raw_article_id: i64,
    pub crawl_id: i64,
    pub domain_id: i64,
    pub path: String,
    pub crawled: DateTime<Utc>,
    pub status: ArticleStatus,
    /// Present iff status is Processed.
    pub document: Option<DocumentPayload>,
}

pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, article_id, label, length, headline,
                    pos_phrases, neg_phrases, pos_sentences, neg_sentences
             FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let label: String = r.get(2);
            Ok(Document {
                id: r.get(0),
                article_id: r.get(1),
                label: Label::parse(&label)
                    .ok_or_else(|| RepositoryError::InvalidRow(format!("label {}", label)))?,
                length: r.get(3),
                headline: r.get(4),
                pos_phrases: r.get(5),
                neg_phrases: r.get(6),
                pos_sentences: r.get(7),
                neg_sentences: r.get(8),
            })
        })
        .transpose()
    }

    /// Commit one article's enrichment output in a single transaction.
    ///
    /// Returns (article_id, document_id). A primary-key conflict on
    /// raw_article_results means another worker finished first; the
    /// transaction rolls back and the error propagates.
    pub async fn commit_graph(&self, graph: &DocumentGraph) -> Result<(i64, Option<i64>)> {
        let mut tx = self.pool.begin().await?;

        let article_id = {
            let result = sqlx::query(
                "INSERT INTO articles (path, crawled, inserted, crawl_id, domain_id, status)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&graph.path)
            .bind(graph.crawled.to_rfc3339())
            .bind(Utc::now().to_rfc3339())
            .bind(graph.crawl_id)
            .bind(graph.domain_id)
            .bind(graph.status.as_str())
            .execute(&mut *tx)
            .await?;
            result.last_insert_rowid()
        };

        let mut document_id = None;
        if graph.status.produces_document() {
            if let Some(payload) = &graph.document {
                document_id = Some(insert_payload(&mut tx, article_id, payload).await?);
            }
        }

        // Exactly-once: the primary key refuses a second result row.
        sqlx::query("INSERT INTO raw_article_results (raw_article_id, status) VALUES (?, 'Processed')")
            .bind(graph.raw_article_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO raw_article_conversions (raw_article_id, inserted_id) VALUES (?, ?)",
        )
        .bind(graph.raw_article_id)
        .bind(article_id)
        .execute(&mut *tx)
        .await?;

        // Raw bodies are only kept for transfer; drop them once consumed.
        sqlx::query(
            "UPDATE raw_articles SET status = 'Processed', headers = NULL, body = NULL
             WHERE id = ?",
        )
        .bind(graph.raw_article_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((article_id, document_id))
    }
}

async fn insert_payload(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    article_id: i64,
    payload: &DocumentPayload,
) -> Result<i64> {
    let document_id = sqlx::query(
        "INSERT INTO documents
             (article_id, label, length, headline,
              pos_phrases, neg_phrases, pos_sentences, neg_sentences)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(article_id)
    .bind(payload.label.as_str())
    .bind(payload.length)
    .bind(&payload.headline)
    .bind(payload.pos_phrases)
    .bind(payload.neg_phrases)
    .bind(payload.pos_sentences)
    .bind(payload.neg_sentences)
    .execute(&mut **tx)
    .await?
    .last_insert_rowid();

    for sentence in &payload.sentences {
        let sentence_id = sqlx::query(
            "INSERT INTO sentences (document, score, prob, label, level) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(document_id)
        .bind(sentence.score)
        .bind(sentence.prob)
        .bind(sentence.label.as_str())
        .bind(sentence.level.as_str())
        .execute(&mut **tx)
        .await?
        .last_insert_rowid();

        for phrase in &sentence.phrases {
            let phrase_id = sqlx::query(
                "INSERT INTO phrases (sentence, score, prob, label) VALUES (?, ?, ?, ?)",
            )
            .bind(sentence_id)
            .bind(phrase.score)
            .bind(phrase.prob)
            .bind(phrase.label.as_str())
            .execute(&mut **tx)
            .await?
            .last_insert_rowid();

            for word in &phrase.keywords {
                let Some(keyword_id) = payload.keyword_ids.get(word) else {
                    continue;
                };
                sqlx::query(
                    "INSERT INTO keyword_incidences (keyword_id, phrase_id) VALUES (?, ?)",
                )
                .bind(keyword_id)
                .bind(phrase_id)
                .execute(&mut **tx)
                .await?;
            }
        }
    }

    for pair in &payload.adjacencies {
        let Some(key1_id) = payload.keyword_ids.get(&pair.key1) else {
            continue;
        };
        let key2_id = match &pair.key2 {
            Some(word) => match payload.keyword_ids.get(word) {
                Some(id) => Some(*id),
                // An unresolvable second keyword drops the pair, not the run.
                None => continue,
            },
            None => None,
        };
        sqlx::query("INSERT INTO keyword_adjacencies (doc_id, key1_id, key2_id) VALUES (?, ?, ?)")
            .bind(document_id)
            .bind(key1_id)
            .bind(key2_id)
            .execute(&mut **tx)
            .await?;
    }

    for (date, position) in &payload.certain_dates {
        sqlx::query("INSERT INTO certain_dates (doc_id, date, position) VALUES (?, ?, ?)")
            .bind(document_id)
            .bind(date.to_rfc3339())
            .bind(position)
            .execute(&mut **tx)
            .await?;
    }

    for row in &payload.ambiguous_dates {
        sqlx::query(
            "INSERT INTO uncertain_dates (doc_id, date, interpreted_with, matched_text, position)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(document_id)
        .bind(row.date.to_rfc3339())
        .bind(row.interpreted_with.as_str())
        .bind(&row.matched_text)
        .bind(row.position)
        .execute(&mut **tx)
        .await?;
    }

    for path in &payload.relative_links {
        sqlx::query("INSERT INTO links_relative (document_id, path) VALUES (?, ?)")
            .bind(document_id)
            .bind(path)
            .execute(&mut **tx)
            .await?;
    }

    for (domain_id, path) in &payload.absolute_links {
        sqlx::query("INSERT INTO links_absolute (document_id, domain_id, path) VALUES (?, ?, ?)")
            .bind(document_id)
            .bind(domain_id)
            .bind(path)
            .execute(&mut **tx)
            .await?;
    }

    for (version, action) in &payload.provenance {
        // Versions can come from external services; a bad one drops the
        // provenance row, not the document.
        let Some(version) = validate_software_version(version) else {
            tracing::debug!("Dropping provenance row with empty version");
            continue;
        };
        let software_id = upsert_software(&mut **tx, &version).await?;
        sqlx::query(
            "INSERT INTO software_involvements (document_id, software_id, action) VALUES (?, ?, ?)",
        )
        .bind(document_id)
        .bind(software_id)
        .bind(action.as_str())
        .execute(&mut **tx)
        .await?;
    }

    Ok(document_id)
}

/// Insert-or-find a software version row. No duplicate rows per version.
async fn upsert_software(conn: &mut SqliteConnection, version: &str) -> Result<i64> {
    sqlx::query("INSERT OR IGNORE INTO software (software) VALUES (?)")
        .bind(version)
        .execute(&mut *conn)
        .await?;
    let id = sqlx::query_scalar::<_, i64>("SELECT id FROM software WHERE software = ?")
        .bind(version)
        .fetch_one(&mut *conn)
        .await?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawArticleStatus;
    use crate::repository::DbContext;

    async fn seed(ctx: &DbContext) -> (i64, i64) {
        let crawl = ctx.crawl();
        let source = crawl.get_or_create_source("bucket").await.unwrap();
        let crawl_id = crawl
            .create_file("archive.sql.xz", source.id, crate::models::CrawlFileKind::Sql)
            .await
            .unwrap();

        let articles = ctx.articles();
        articles.insert_domain_ignore("example.com").await.unwrap();
        let domain = articles.get_domain("example.com").await.unwrap().unwrap();

        let raw_id = ctx
            .raw_articles()
            .insert(
                crawl_id,
                "http://example.com/story",
                "text/html",
                Utc::now(),
                None,
                Some("<p>body</p>"),
            )
            .await
            .unwrap()
            .unwrap();

        (crawl_id, raw_id)
    }

    fn simple_graph(raw_article_id: i64, crawl_id: i64, domain_id: i64) -> DocumentGraph {
        let mut keyword_ids = HashMap::new();
        keyword_ids.insert("apple".to_string(), 0);

        DocumentGraph {
            raw_article_id,
            crawl_id,
            domain_id,
            path: "/story".to_string(),
            crawled: Utc::now(),
            status: ArticleStatus::Processed,
            document: Some(DocumentPayload {
                label: Label::Positive,
                length: 11,
                headline: "Hello".to_string(),
                pos_phrases: 1,
                neg_phrases: 0,
                pos_sentences: 1,
                neg_sentences: 0,
                sentences: vec![SentenceRow {
                    label: Label::Positive,
                    score: 0.5,
                    prob: 0.9,
                    level: SentenceLevel::P,
                    phrases: vec![PhraseRow {
                        label: Label::Positive,
                        score: 0.5,
                        prob: 0.9,
                        keywords: vec![],
                    }],
                }],
                ..Default::default()
            }),
        }
    }

    #[tokio::test]
    async fn commit_writes_whole_graph() {
        let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
        let (crawl_id, raw_id) = seed(&ctx).await;
        let domain = ctx.articles().get_domain("example.com").await.unwrap().unwrap();

        let repo = ctx.documents();
        let (article_id, document_id) = repo
            .commit_graph(&simple_graph(raw_id, crawl_id, domain.id))
            .await
            .unwrap();

        let document_id = document_id.unwrap();
        let document = repo.get(document_id).await.unwrap().unwrap();
        assert_eq!(document.article_id, article_id);
        assert_eq!(document.label, Label::Positive);

        let raw = ctx.raw_articles();
        assert_eq!(
            raw.result_status(raw_id).await.unwrap(),
            Some(RawArticleStatus::Processed)
        );
        // Bodies are cleared once processed.
        let article = raw.get(raw_id).await.unwrap().unwrap();
        assert_eq!(article.body, None);
    }

    #[tokio::test]
    async fn second_commit_for_same_raw_article_fails() {
        let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
        let (crawl_id, raw_id) = seed(&ctx).await;
        let domain = ctx.articles().get_domain("example.com").await.unwrap().unwrap();

        let repo = ctx.documents();
        let graph = simple_graph(raw_id, crawl_id, domain.id);
        repo.commit_graph(&graph).await.unwrap();

        let mut again = graph.clone();
        again.path = "/story-2".to_string();
        assert!(repo.commit_graph(&again).await.is_err());
    }

    #[tokio::test]
    async fn provenance_versions_are_bounded_not_fatal() {
        let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
        let (crawl_id, raw_id) = seed(&ctx).await;
        let domain = ctx.articles().get_domain("example.com").await.unwrap().unwrap();

        let mut graph = simple_graph(raw_id, crawl_id, domain.id);
        if let Some(payload) = graph.document.as_mut() {
            payload.provenance = vec![
                ("  ".to_string(), SoftwareAction::Other),
                ("e".repeat(400), SoftwareAction::Extracted),
            ];
        }

        let repo = ctx.documents();
        let (_, document_id) = repo.commit_graph(&graph).await.unwrap();
        let document_id = document_id.unwrap();

        // The blank version was dropped; the long one was truncated.
        let versions: Vec<String> = sqlx::query_scalar(
            "SELECT software.software
             FROM software_involvements
                 JOIN software ON software_involvements.software_id = software.id
             WHERE software_involvements.document_id = ?",
        )
        .bind(document_id)
        .fetch_all(ctx.pool())
        .await
        .unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].len(), 256);
    }

    #[tokio::test]
    async fn terminal_status_commits_no_document() {
        let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
        let (crawl_id, raw_id) = seed(&ctx).await;
        let domain = ctx.articles().get_domain("example.com").await.unwrap().unwrap();

        let repo = ctx.documents();
        let graph = DocumentGraph {
            raw_article_id: raw_id,
            crawl_id,
            domain_id: domain.id,
            path: "/story".to_string(),
            crawled: Utc::now(),
            status: ArticleStatus::UnsupportedType,
            document: None,
        };
        let (article_id, document_id) = repo.commit_graph(&graph).await.unwrap();
        assert!(document_id.is_none());

        let article = ctx.articles().get(article_id).await.unwrap().unwrap();
        assert_eq!(article.status, ArticleStatus::UnsupportedType);
    }
}
