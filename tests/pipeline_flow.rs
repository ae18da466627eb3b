//! End-to-end pipeline tests over an in-memory store with deterministic
//! collaborator fakes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use sentropy::cache::Caches;
use sentropy::classify::LexiconClassifier;
use sentropy::config::Settings;
use sentropy::extract::{ExtractError, Extraction, TextExtractor};
use sentropy::models::{ArticleStatus, CrawlFileKind, RawArticleStatus};
use sentropy::nlp::{FrequencyTermExtractor, HeuristicTagger, RegexDateMiner, StopList};
use sentropy::pipeline::{drain_queue, ArticleProcessor, PipelineServices, ProcessOutcome};
use sentropy::queue::{DbQueue, MessageQueue, PROCESS_QUEUE};
use sentropy::repository::DbContext;

/// Deterministic extractor: text nodes of the markup joined with spaces,
/// ASCII-filtered like the real service.
struct TagStripExtractor;

#[async_trait::async_trait]
impl TextExtractor for TagStripExtractor {
    async fn extract(&self, content: &str) -> Result<Extraction, ExtractError> {
        let text = {
            let document = scraper::Html::parse_document(content);
            let joined = document
                .root_element()
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            joined.chars().filter(char::is_ascii).collect::<String>()
        };
        Ok(Extraction {
            text: if text.is_empty() { None } else { Some(text) },
            version: "test-extractor/1.0".to_string(),
        })
    }
}

fn services() -> PipelineServices {
    PipelineServices {
        extractor: Arc::new(TagStripExtractor),
        classifier: Arc::new(LexiconClassifier::new()),
        language: Arc::new(sentropy::nlp::WhatlangDetector::new()),
        tagger: Arc::new(HeuristicTagger::new()),
        terms: Arc::new(FrequencyTermExtractor::new()),
        miner: Arc::new(RegexDateMiner::new()),
        stoplist: Arc::new(StopList::empty()),
    }
}

async fn processor(ctx: &DbContext) -> ArticleProcessor {
    ArticleProcessor::new(ctx.clone(), Caches::new(), services(), &Settings::default())
}

async fn seed_raw(ctx: &DbContext, url: &str, content_type: &str, body: Option<&str>) -> i64 {
    let crawl = ctx.crawl();
    let source = crawl.get_or_create_source("bucket").await.unwrap();
    let crawl_id = crawl
        .create_file("archive.sql.xz", source.id, CrawlFileKind::Sql)
        .await
        .unwrap();
    ctx.raw_articles()
        .insert(
            crawl_id,
            url,
            content_type,
            Utc.with_ymd_and_hms(2008, 6, 1, 12, 0, 0).unwrap(),
            Some("Server: test"),
            body,
        )
        .await
        .unwrap()
        .unwrap()
}

/// English article body with a headline, a certain date, links and enough
/// prose for language identification.
const ARTICLE_BODY: &str = r#"<html><body>
<h2>Apple Store Opening</h2>
<p>The new Apple Store opened in London on March 1, 2008 and the launch was
a great success. Customers praised the store and its excellent staff, and
analysts expect strong growth across the United Kingdom this year.</p>
<p>Read more at <a href="/business/retail">retail coverage</a> or
<a href="http://example.org/tech">the technology desk</a>.</p>
</body></html>"#;

#[tokio::test]
async fn processes_article_into_document_graph() {
    let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
    let raw_id = seed_raw(&ctx, "http://example.com/story?id=1#frag", "text/html", Some(ARTICLE_BODY)).await;

    let outcome = processor(&ctx).await.process(raw_id).await.unwrap();
    let ProcessOutcome::Committed {
        article_id,
        document_id,
        status,
    } = outcome
    else {
        panic!("expected a commit, got {:?}", outcome);
    };
    assert_eq!(status, ArticleStatus::Processed);
    let document_id = document_id.expect("processed article must have a document");

    // Fragment stripped, query preserved, host lowercased.
    let article = ctx.articles().get(article_id).await.unwrap().unwrap();
    assert_eq!(article.path, "/story?id=1");
    let domain = ctx
        .articles()
        .get_domain("example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(article.domain_id, domain.id);

    // The h2 text survived extraction, so it is the headline.
    let document = ctx.documents().get(document_id).await.unwrap().unwrap();
    assert_eq!(document.headline, "Apple Store Opening");
    assert!(document.length > 0);

    // A certain date row for March 1, 2008.
    let dates: Vec<String> =
        sqlx::query_scalar("SELECT date FROM certain_dates WHERE doc_id = ?")
            .bind(document_id)
            .fetch_all(ctx.pool())
            .await
            .unwrap();
    assert!(dates.iter().any(|d| d.starts_with("2008-03-01")));

    // Both link flavors extracted; the absolute one grew a domain row.
    let relative: Vec<String> =
        sqlx::query_scalar("SELECT path FROM links_relative WHERE document_id = ?")
            .bind(document_id)
            .fetch_all(ctx.pool())
            .await
            .unwrap();
    assert_eq!(relative, vec!["/business/retail"]);
    let absolute: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM links_absolute WHERE document_id = ?")
            .bind(document_id)
            .fetch_one(ctx.pool())
            .await
            .unwrap();
    assert_eq!(absolute, 1);
    assert!(ctx
        .articles()
        .get_domain("example.org")
        .await
        .unwrap()
        .is_some());

    // Keyword adjacencies exist and reference interned keywords.
    let adjacencies: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM keyword_adjacencies WHERE doc_id = ?")
            .bind(document_id)
            .fetch_one(ctx.pool())
            .await
            .unwrap();
    assert!(adjacencies > 0);
    let dangling: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM keyword_adjacencies
         WHERE doc_id = ?
           AND key1_id NOT IN (SELECT id FROM keywords)",
    )
    .bind(document_id)
    .fetch_one(ctx.pool())
    .await
    .unwrap();
    assert_eq!(dangling, 0);

    // Provenance covers all four participating components.
    let actions: Vec<String> =
        sqlx::query_scalar("SELECT action FROM software_involvements WHERE document_id = ?")
            .bind(document_id)
            .fetch_all(ctx.pool())
            .await
            .unwrap();
    for expected in ["Processed", "Dated", "Classified", "Extracted"] {
        assert!(actions.iter().any(|a| a == expected), "missing {}", expected);
    }

    // Raw body is gone once processed.
    let raw = ctx.raw_articles().get(raw_id).await.unwrap().unwrap();
    assert_eq!(raw.status, RawArticleStatus::Processed);
    assert_eq!(raw.body, None);
}

#[tokio::test]
async fn redelivery_is_a_no_op() {
    let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
    let raw_id = seed_raw(&ctx, "http://example.com/story", "text/html", Some(ARTICLE_BODY)).await;
    let processor = processor(&ctx).await;

    let first = processor.process(raw_id).await.unwrap();
    assert!(matches!(first, ProcessOutcome::Committed { .. }));

    let second = processor.process(raw_id).await.unwrap();
    assert_eq!(second, ProcessOutcome::SkippedExisting);

    let results: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM raw_article_results")
        .fetch_one(ctx.pool())
        .await
        .unwrap();
    assert_eq!(results, 1);
    let articles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
        .fetch_one(ctx.pool())
        .await
        .unwrap();
    assert_eq!(articles, 1);
}

#[tokio::test]
async fn unsupported_content_type_terminates_without_document() {
    let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
    let raw_id = seed_raw(&ctx, "http://example.com/report.pdf", "application/pdf", Some("%PDF-1.4")).await;

    let outcome = processor(&ctx).await.process(raw_id).await.unwrap();
    let ProcessOutcome::Committed {
        document_id, status, ..
    } = outcome
    else {
        panic!("expected a commit");
    };
    assert_eq!(status, ArticleStatus::UnsupportedType);
    assert_eq!(document_id, None);

    let documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(ctx.pool())
        .await
        .unwrap();
    assert_eq!(documents, 0);
}

#[tokio::test]
async fn non_english_body_terminates_with_language_error() {
    let body = r#"<html><body><h2>Ouverture</h2>
<p>Le nouveau magasin a ouvert ses portes a Londres le March 1, 2008 et les
clients ont beaucoup apprecie la boutique et son personnel pendant toute la
journee d'ouverture.</p></body></html>"#;

    let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
    let raw_id = seed_raw(&ctx, "http://example.com/histoire", "text/html", Some(body)).await;

    let outcome = processor(&ctx).await.process(raw_id).await.unwrap();
    let ProcessOutcome::Committed {
        document_id, status, ..
    } = outcome
    else {
        panic!("expected a commit");
    };
    assert_eq!(status, ArticleStatus::LanguageError);
    assert_eq!(document_id, None);
}

#[tokio::test]
async fn dateless_article_commits_as_no_dates() {
    let body = r#"<html><body><h2>Apple Store Opening</h2>
<p>The new Apple Store opened in London and the launch was a great success.
Customers praised the store and its excellent staff throughout the day.</p>
</body></html>"#;

    let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
    let raw_id = seed_raw(&ctx, "http://example.com/undated", "text/html", Some(body)).await;

    let outcome = processor(&ctx).await.process(raw_id).await.unwrap();
    let ProcessOutcome::Committed {
        document_id, status, ..
    } = outcome
    else {
        panic!("expected a commit");
    };
    assert_eq!(status, ArticleStatus::NoDates);
    assert_eq!(document_id, None);

    // The work is not redone on redelivery.
    assert_eq!(
        ctx.raw_articles().result_status(raw_id).await.unwrap(),
        Some(RawArticleStatus::Processed)
    );
}

#[tokio::test]
async fn dates_hidden_from_cleaned_body_are_dropped() {
    // The only date lives in an attribute; it never reaches the cleaned
    // text, so the context is discarded and the article has no dates.
    let body = r#"<html><body><h2>Apple Store Opening</h2>
<p>The new Apple Store opened in London and the launch was a great success.
Customers praised the store and its excellent staff throughout the day.
See <a href="/archive/2008-03-01/index.html">the archive</a> for more.</p>
</body></html>"#;

    let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
    let raw_id = seed_raw(&ctx, "http://example.com/hidden-date", "text/html", Some(body)).await;

    let outcome = processor(&ctx).await.process(raw_id).await.unwrap();
    let ProcessOutcome::Committed { status, .. } = outcome else {
        panic!("expected a commit");
    };
    assert_eq!(status, ArticleStatus::NoDates);

    let uncertain: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM uncertain_dates")
        .fetch_one(ctx.pool())
        .await
        .unwrap();
    assert_eq!(uncertain, 0);
}

#[tokio::test]
async fn denylisted_host_bypasses_pipeline() {
    let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
    let raw_id = seed_raw(&ctx, "http://www.nasa.gov/mission", "text/html", Some(ARTICLE_BODY)).await;

    let outcome = processor(&ctx).await.process(raw_id).await.unwrap();
    assert_eq!(outcome, ProcessOutcome::SkippedDenylisted);

    // Nothing persisted at all.
    let articles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
        .fetch_one(ctx.pool())
        .await
        .unwrap();
    assert_eq!(articles, 0);
    let results: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM raw_article_results")
        .fetch_one(ctx.pool())
        .await
        .unwrap();
    assert_eq!(results, 0);
}

#[tokio::test]
async fn drain_queue_acknowledges_done_work() {
    let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
    let raw_id = seed_raw(&ctx, "http://example.com/story", "text/html", Some(ARTICLE_BODY)).await;

    let queue: Arc<dyn MessageQueue> = Arc::new(DbQueue::new(
        ctx.pool().clone(),
        PROCESS_QUEUE,
        Duration::from_secs(120),
    ));
    queue.send(raw_id).await.unwrap();

    let stats = drain_queue(
        Arc::new(processor(&ctx).await),
        Arc::clone(&queue),
        Duration::from_secs(120),
    )
    .await
    .unwrap();

    assert_eq!(stats.committed, 1);
    assert_eq!(queue.count().await.unwrap(), 0);
}
