//! The document-enrichment pipeline.
//!
//! One raw article flows through the stages sequentially; the text-extractor
//! call runs alongside the HTML analysis, and the keyword batch-upsert runs
//! alongside sentiment classification. Everything an article produces
//! commits in a single transaction, and a raw article is processed exactly
//! once: redelivery finds the result row and stops.

mod keywords;
mod page;

pub use keywords::{extract as extract_keywords, KeywordExtraction};
pub use page::{analyze as analyze_page, pick_headline, sentence_level, Anchor, PageAnalysis};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::cache::Caches;
use crate::classify::SentimentClassifier;
use crate::config::Settings;
use crate::domains::DomainResolver;
use crate::extract::TextExtractor;
use crate::models::{validate_link_path, validate_matched_text, validate_prob, validate_score};
use crate::models::{ArticleStatus, Label};
use crate::nlp::{DateMiner, LanguageDetector, PosTagger, StopList, TermExtractor};
use crate::queue::MessageQueue;
use crate::repository::{
    is_transient, AmbiguousDateRow, DbContext, DocumentGraph, DocumentPayload, PhraseRow,
    RepositoryError, SentenceRow,
};
use crate::urls;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Domain(#[from] crate::domains::DomainResolveError),
    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// What one delivery of a raw article id amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Rows were committed (possibly with a terminal status and no document).
    Committed {
        article_id: i64,
        document_id: Option<i64>,
        status: ArticleStatus,
    },
    /// Work already done (result row or article present). No-op.
    SkippedExisting,
    /// Host is denylisted. Nothing persisted.
    SkippedDenylisted,
    /// Retry budget exhausted; an Error result row was recorded.
    Failed,
}

/// External collaborators the pipeline drives.
pub struct PipelineServices {
    pub extractor: Arc<dyn TextExtractor>,
    pub classifier: Arc<dyn SentimentClassifier>,
    pub language: Arc<dyn LanguageDetector>,
    pub tagger: Arc<dyn PosTagger>,
    pub terms: Arc<dyn TermExtractor>,
    pub miner: Arc<dyn DateMiner>,
    pub stoplist: Arc<StopList>,
}

pub struct ArticleProcessor {
    ctx: DbContext,
    caches: Caches,
    services: PipelineServices,
    denylist: Vec<String>,
    retries: u32,
    own_version: String,
}

impl ArticleProcessor {
    pub fn new(
        ctx: DbContext,
        caches: Caches,
        services: PipelineServices,
        settings: &Settings,
    ) -> Self {
        Self {
            ctx,
            caches,
            services,
            denylist: settings.host_denylist.clone(),
            retries: settings.article_retries,
            own_version: format!("sentropy/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Process one raw article id from the queue.
    pub async fn process(&self, raw_article_id: i64) -> Result<ProcessOutcome> {
        let raw_repo = self.ctx.raw_articles();

        let Some(raw) = raw_repo.get(raw_article_id).await? else {
            tracing::warn!("Raw article {} does not exist; skipping", raw_article_id);
            return Ok(ProcessOutcome::SkippedExisting);
        };

        // Exactly-once: a result row means this id has been handled.
        if raw_repo.result_status(raw_article_id).await?.is_some() {
            tracing::debug!("Raw article {} already has a result", raw_article_id);
            return Ok(ProcessOutcome::SkippedExisting);
        }

        let Some(host) = urls::domain_of(&raw.url) else {
            tracing::info!("Raw article {} has no usable host: {}", raw.id, raw.url);
            raw_repo.mark_error(raw.id).await?;
            return Ok(ProcessOutcome::Failed);
        };

        if self.denylist.iter().any(|entry| host.contains(entry)) {
            tracing::info!("Host {} is denylisted; bypassing pipeline", host);
            return Ok(ProcessOutcome::SkippedDenylisted);
        }

        let mut attempt = 0;
        loop {
            match self.run_once(&raw, &host).await {
                Ok(outcome) => return Ok(outcome),
                Err(err) if attempt < self.retries && is_retryable(&err) => {
                    attempt += 1;
                    tracing::warn!(
                        "Attempt {} for raw article {} failed: {}; retrying",
                        attempt,
                        raw.id,
                        err
                    );
                }
                Err(err) if is_retryable(&err) => {
                    tracing::error!(
                        "Raw article {} failed after {} retries: {}",
                        raw.id,
                        self.retries,
                        err
                    );
                    raw_repo.mark_error(raw.id).await?;
                    return Ok(ProcessOutcome::Failed);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One pass over the stages. Terminal statuses commit; retryable errors
    /// surface as `Err`.
    async fn run_once(&self, raw: &crate::models::RawArticle, host: &str) -> Result<ProcessOutcome> {
        let path = urls::path_of(&raw.url);

        // Pre-check: one article per (domain, path, crawl). A missing domain
        // row means no article can exist yet.
        let articles = self.ctx.articles();
        if let Some(domain) = articles.get_domain(host).await? {
            if articles.exists(domain.id, &path, raw.crawl_id).await? {
                tracing::debug!("Article already exists for {}{}", host, path);
                self.ctx.raw_articles().mark_skipped(raw.id).await?;
                return Ok(ProcessOutcome::SkippedExisting);
            }
        }

        // Resolve or create the domain row.
        let resolver = DomainResolver::new(self.ctx.articles(), self.caches.clone());
        let domain_id = match resolver.resolve(host).await {
            Ok(id) => id,
            Err(crate::domains::DomainResolveError::Invalid(err)) => {
                tracing::info!("Rejecting article from invalid domain {}: {}", host, err);
                self.ctx.raw_articles().mark_error(raw.id).await?;
                return Ok(ProcessOutcome::Failed);
            }
            Err(err) => return Err(err.into()),
        };

        let commit_terminal = |status: ArticleStatus| DocumentGraph {
            raw_article_id: raw.id,
            crawl_id: raw.crawl_id,
            domain_id,
            path: path.clone(),
            crawled: raw.date_crawled,
            status,
            document: None,
        };

        // Content-type gate.
        let media_type = raw
            .content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        if media_type != "text/html" {
            tracing::info!("Unsupported content type for {}: {}", raw.url, raw.content_type);
            return self.commit(commit_terminal(ArticleStatus::UnsupportedType)).await;
        }

        let Some(body) = raw.body.clone() else {
            return self.commit(commit_terminal(ArticleStatus::NoContent)).await;
        };

        // Text extraction over HTTP runs alongside the local HTML analysis
        // (header scan, anchors, date mining).
        let extractor = Arc::clone(&self.services.extractor);
        let extractor_body = body.clone();
        let extract_handle =
            tokio::spawn(async move { extractor.extract(&extractor_body).await });

        let miner = Arc::clone(&self.services.miner);
        let analysis_body = body.clone();
        let analysis =
            tokio::task::spawn_blocking(move || page::analyze(&analysis_body, miner.as_ref()))
                .await?;

        // The one wait for the extractor.
        let cleaned = match extract_handle.await? {
            Ok(extraction) => match extraction.text {
                Some(text) if !text.trim().is_empty() => (text, extraction.version),
                _ => {
                    return self.commit(commit_terminal(ArticleStatus::NoContent)).await;
                }
            },
            Err(err) => {
                tracing::info!("Text extraction failed for {}: {}", raw.url, err);
                return self.commit(commit_terminal(ArticleStatus::NoContent)).await;
            }
        };
        let (cleaned, extractor_version) = cleaned;

        // Language gate runs on the original body.
        match self.services.language.detect(&body) {
            Some((code, _)) if code == "en" => {}
            other => {
                tracing::info!("Language gate rejected {} ({:?})", raw.url, other);
                return self.commit(commit_terminal(ArticleStatus::LanguageError)).await;
            }
        }

        let headline = page::pick_headline(&analysis.headers, &cleaned)
            .unwrap_or_else(|| cleaned.chars().take(256).collect::<String>().trim().to_string());
        let headline: String = headline.chars().take(256).collect();

        // Keyword extraction over the cleaned text.
        let extraction = keywords::extract(
            &cleaned,
            self.services.terms.as_ref(),
            self.services.tagger.as_ref(),
            self.services.stoplist.as_ref(),
        );

        // Sentiment classification and the keyword batch-upsert share no
        // state; run them concurrently.
        let classifier = Arc::clone(&self.services.classifier);
        let classify_text = cleaned.clone();
        let classify_handle =
            tokio::task::spawn_blocking(move || classifier.classify(&classify_text));

        self.ctx.keywords().upsert_words(&extraction.all_words).await?;

        let sentiment = match classify_handle.await? {
            Ok(sentiment) => sentiment,
            Err(err) => {
                tracing::info!("Classification failed for {}: {}", raw.url, err);
                return self
                    .commit(commit_terminal(ArticleStatus::ClassificationError))
                    .await;
            }
        };

        // Date rows: drop contexts whose matched text never made it into the
        // cleaned body.
        let mut certain_dates = Vec::new();
        let mut ambiguous_dates = Vec::new();
        for context in &analysis.date_contexts {
            if !cleaned.contains(context.text.trim()) {
                continue;
            }
            if context.is_certain() {
                certain_dates.push((context.dates[0].date, context.position));
            } else {
                let Some(matched_text) = validate_matched_text(&context.text) else {
                    continue;
                };
                for date in &context.dates {
                    ambiguous_dates.push(AmbiguousDateRow {
                        date: date.date,
                        interpreted_with: crate::models::DateInterpretation::from_flags(
                            date.day_first,
                            date.year_first,
                        ),
                        matched_text: matched_text.clone(),
                        position: context.position,
                    });
                }
            }
        }

        // Link extraction: anchors whose visible text survived cleaning.
        let mut relative_links = Vec::new();
        let mut absolute_links = Vec::new();
        for anchor in &analysis.anchors {
            if !cleaned.contains(&anchor.text) {
                continue;
            }
            if anchor.href.starts_with("http://") {
                let Some(link_host) = urls::domain_of(&anchor.href) else {
                    continue;
                };
                let link_domain = match resolver.resolve(&link_host).await {
                    Ok(id) => id,
                    Err(crate::domains::DomainResolveError::Invalid(_)) => continue,
                    Err(err) => return Err(err.into()),
                };
                match validate_link_path(&urls::path_of(&anchor.href)) {
                    Ok(link_path) => absolute_links.push((link_domain, link_path)),
                    Err(err) => {
                        tracing::debug!("Dropping absolute link {:?}: {}", anchor.href, err);
                    }
                }
            } else {
                match validate_link_path(&anchor.href) {
                    Ok(link_path) => relative_links.push(link_path),
                    Err(err) => {
                        tracing::debug!("Dropping relative link {:?}: {}", anchor.href, err);
                    }
                }
            }
        }

        // Resolve keyword ids through the cache, falling back to the table
        // the batch-upsert just filled.
        let keyword_repo = self.ctx.keywords();
        let mut keyword_ids: HashMap<String, i64> = HashMap::new();
        for word in &extraction.all_words {
            if let Some(id) = self.caches.keywords.resolve(word) {
                keyword_ids.insert(word.clone(), id);
                continue;
            }
            if let Some(id) = keyword_repo.id_for(word).await? {
                self.caches.keywords.put(word, id);
                keyword_ids.insert(word.clone(), id);
            }
        }

        // Sentence and phrase rows, with keyword incidences attached to
        // every phrase containing a keyword.
        let sentences = build_sentence_rows(&sentiment, &analysis, &extraction);

        let status = if certain_dates.is_empty() && ambiguous_dates.is_empty() {
            ArticleStatus::NoDates
        } else {
            ArticleStatus::Processed
        };

        let document = status.produces_document().then(|| DocumentPayload {
            label: Label::from_int(sentiment.label).unwrap_or(Label::Unknown),
            length: sentiment.length,
            headline,
            pos_phrases: sentiment.pos_phrases,
            neg_phrases: sentiment.neg_phrases,
            pos_sentences: sentiment.pos_sentences,
            neg_sentences: sentiment.neg_sentences,
            sentences,
            adjacencies: extraction.adjacencies.clone(),
            certain_dates,
            ambiguous_dates,
            relative_links,
            absolute_links,
            provenance: vec![
                (self.own_version.clone(), crate::models::SoftwareAction::Processed),
                (
                    self.services.miner.version().to_string(),
                    crate::models::SoftwareAction::Dated,
                ),
                (
                    self.services.classifier.version().to_string(),
                    crate::models::SoftwareAction::Classified,
                ),
                (
                    // The service's self-reported version is untrusted.
                    format!(
                        "boilerpipe/{}",
                        crate::models::validate_software_version(&extractor_version)
                            .unwrap_or_else(|| "Unknown".to_string())
                    ),
                    crate::models::SoftwareAction::Extracted,
                ),
            ],
            keyword_ids,
        });

        self.commit(DocumentGraph {
            raw_article_id: raw.id,
            crawl_id: raw.crawl_id,
            domain_id,
            path,
            crawled: raw.date_crawled,
            status,
            document,
        })
        .await
    }

    async fn commit(&self, graph: DocumentGraph) -> Result<ProcessOutcome> {
        match self.ctx.documents().commit_graph(&graph).await {
            Ok((article_id, document_id)) => Ok(ProcessOutcome::Committed {
                article_id,
                document_id,
                status: graph.status,
            }),
            Err(err) if lost_commit_race(&err) => {
                tracing::debug!(
                    "Raw article {} was committed by another worker",
                    graph.raw_article_id
                );
                Ok(ProcessOutcome::SkippedExisting)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// A unique violation on the result or article keys means another worker
/// finished the same raw article first.
fn lost_commit_race(err: &RepositoryError) -> bool {
    match err {
        RepositoryError::Database(sqlx::Error::Database(db)) => {
            let message = db.message();
            message.contains("raw_article_results") || message.contains("articles.domain_id")
        }
        _ => false,
    }
}

fn is_retryable(err: &PipelineError) -> bool {
    match err {
        PipelineError::Repository(err) => is_transient(err),
        PipelineError::Domain(crate::domains::DomainResolveError::NotVisible(_)) => true,
        PipelineError::Domain(crate::domains::DomainResolveError::Repository(err)) => {
            is_transient(err)
        }
        _ => false,
    }
}

fn build_sentence_rows(
    sentiment: &crate::classify::DocumentSentiment,
    analysis: &PageAnalysis,
    extraction: &KeywordExtraction,
) -> Vec<SentenceRow> {
    let mut rows = Vec::with_capacity(sentiment.sentences.len());
    for sentence in &sentiment.sentences {
        // Out-of-range values drop the offending entity only.
        let (Ok(score), Ok(prob)) = (validate_score(sentence.score), validate_prob(sentence.prob))
        else {
            tracing::debug!("Dropping sentence with out-of-range trace");
            continue;
        };

        let mut phrases = Vec::with_capacity(sentence.phrases.len());
        for phrase in &sentence.phrases {
            let (Ok(phrase_score), Ok(phrase_prob)) =
                (validate_score(phrase.score), validate_prob(phrase.prob))
            else {
                tracing::debug!("Dropping phrase with out-of-range trace");
                continue;
            };

            let folded = phrase.text.to_lowercase();
            let keywords = extraction
                .keyword_set
                .words()
                .iter()
                .filter(|word| folded.contains(&word.to_lowercase()))
                .cloned()
                .collect();

            phrases.push(PhraseRow {
                label: Label::from_int(phrase.label).unwrap_or(Label::Unknown),
                score: phrase_score,
                prob: phrase_prob,
                keywords,
            });
        }

        rows.push(SentenceRow {
            label: Label::from_int(sentence.label).unwrap_or(Label::Unknown),
            score,
            prob,
            level: page::sentence_level(&analysis.headers, &sentence.text),
            phrases,
        });
    }
    rows
}

/// Statistics from draining the process queue.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessStats {
    pub committed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Consume the process queue until it runs dry.
///
/// Committed and skipped articles acknowledge their message; failures leave
/// it to redeliver after the visibility timeout.
pub async fn drain_queue(
    processor: Arc<ArticleProcessor>,
    queue: Arc<dyn MessageQueue>,
    article_timeout: Duration,
) -> anyhow::Result<ProcessStats> {
    let mut stats = ProcessStats::default();

    loop {
        let messages = queue.receive(10).await?;
        if messages.is_empty() {
            break;
        }

        for message in messages {
            match tokio::time::timeout(article_timeout, processor.process(message.id)).await {
                Ok(Ok(outcome)) => {
                    match &outcome {
                        ProcessOutcome::Committed { status, .. } => {
                            tracing::info!("Committed raw article {} ({})", message.id, status.as_str());
                            stats.committed += 1;
                        }
                        ProcessOutcome::SkippedExisting | ProcessOutcome::SkippedDenylisted => {
                            stats.skipped += 1;
                        }
                        ProcessOutcome::Failed => {
                            stats.failed += 1;
                        }
                    }
                    if matches!(outcome, ProcessOutcome::Failed) {
                        // The Error row is recorded; redelivery will skip.
                        continue;
                    }
                    queue.delete(&message).await?;
                }
                Ok(Err(err)) => {
                    tracing::error!("Raw article {} errored: {:?}", message.id, err);
                    stats.failed += 1;
                }
                Err(_) => {
                    tracing::warn!(
                        "Raw article {} timed out after {:?}; leaving for redelivery",
                        message.id,
                        article_timeout
                    );
                    stats.failed += 1;
                }
            }
        }
    }

    Ok(stats)
}
