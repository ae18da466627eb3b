//! The query executor.
//!
//! Resolves a natural-language query string into a scored, dated,
//! sentiment-annotated document set with per-domain summaries, using the
//! resolution services over the enriched store and in-memory working sets.

mod aggregate;

pub use aggregate::{chain_ngrams, DomainSummary};

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};

use crate::cache::Caches;
use crate::config::Settings;
use crate::models::{Document, UserQuery};
use crate::repository::{DbContext, Result};
use crate::resolvers::{
    AdjacencyIndex, DateMethod, DatePicker, DocumentsByDomain, DomainByPattern, KeywordByPattern,
    MetaCombo, PatternFormat, PhraseRelevance, PhrasesForDocument, Resolver,
};

/// Strict-bigram results below this size trigger the loose fallback.
const STRICT_FALLBACK_THRESHOLD: usize = 100;
/// Domains auto-seeded for keyword-only queries.
const AUTO_SEED_DOMAINS: i64 = 5;

/// Typed progress/status messages interleaved with result production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    UnresolvedKeyword(String),
    UnresolvedDomain(String),
    NothingToResolve,
    AutoSeededDomains(usize),
    ExpandingLoose { strict_count: usize },
    NoCandidates,
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedKeyword(word) => write!(f, "couldn't resolve keyword '{}'", word),
            Self::UnresolvedDomain(host) => write!(f, "couldn't resolve domain '{}'", host),
            Self::NothingToResolve => write!(f, "nothing in the query could be resolved"),
            Self::AutoSeededDomains(count) => {
                write!(f, "no domains given; seeded the top {} by keyword activity", count)
            }
            Self::ExpandingLoose { strict_count } => write!(
                f,
                "expanding from exact bigrams ({} strict matches) to loose keyword matches",
                strict_count
            ),
            Self::NoCandidates => write!(f, "no matching documents"),
        }
    }
}

/// One scored candidate document.
#[derive(Debug, Clone)]
pub struct DocumentScore {
    pub document: Document,
    pub method: DateMethod,
    pub date: DateTime<Utc>,
    pub relevant_pos: usize,
    pub relevant_neg: usize,
    pub phrase_prob_sum: f64,
    pub phrase_count: usize,
}

/// Everything one query run produced.
#[derive(Debug)]
pub struct QueryOutcome {
    pub query: UserQuery,
    pub messages: Vec<StatusMessage>,
    pub keywords: Vec<(i64, String)>,
    pub domains: Vec<(i64, String)>,
    pub used_loose: bool,
    pub documents: Vec<DocumentScore>,
    pub summaries: Vec<DomainSummary>,
}

/// Split a query into keyword and domain tokens.
///
/// A token is a domain when it contains a dot and is all lowercase letters
/// and dots; a keyword when it is alphanumeric only.
pub fn parse_tokens(text: &str) -> (Vec<String>, Vec<String>) {
    let mut keywords = Vec::new();
    let mut domains = Vec::new();
    for chunk in text.split_whitespace() {
        if chunk.contains('.')
            && chunk.chars().all(|c| c.is_ascii_lowercase() || c == '.')
        {
            domains.push(chunk.to_string());
        } else if !chunk.is_empty() && chunk.chars().all(|c| c.is_ascii_alphanumeric()) {
            keywords.push(chunk.to_string());
        }
    }
    (keywords, domains)
}

pub struct QueryExecutor {
    ctx: DbContext,
    caches: Caches,
    settings: Settings,
}

impl QueryExecutor {
    pub fn new(ctx: DbContext, caches: Caches, settings: Settings) -> Self {
        Self {
            ctx,
            caches,
            settings,
        }
    }

    /// Run one query end to end, recording resolution audit rows.
    pub async fn execute(&self, text: &str, email: Option<&str>) -> Result<QueryOutcome> {
        let query = self.ctx.user_queries().get_or_create(text, email).await?;
        let mut messages = Vec::new();

        let (keyword_tokens, domain_tokens) = parse_tokens(&query.text);
        if keyword_tokens.is_empty() && domain_tokens.is_empty() {
            messages.push(StatusMessage::NothingToResolve);
        }

        // Expansion: each token plus its fuzzy matches.
        let keywords = self.expand_keywords(&keyword_tokens, &mut messages).await?;
        let mut domains = self.expand_domains(&domain_tokens, &mut messages).await?;

        let keyword_ids: HashSet<i64> = keywords.iter().map(|(id, _)| *id).collect();

        // Strategy: keyword-only queries seed the most active domains.
        let adjacency = AdjacencyIndex::new(self.ctx.pool().clone());
        if domains.is_empty() && !keyword_ids.is_empty() {
            let seeded = adjacency
                .top_domains_for_keywords(&keyword_ids, AUTO_SEED_DOMAINS)
                .await?;
            messages.push(StatusMessage::AutoSeededDomains(seeded.len()));
            let articles = self.ctx.articles();
            for domain_id in seeded {
                if let Some(domain) = articles.get_domain_by_id(domain_id).await? {
                    domains.push((domain.id, domain.key));
                }
            }
        }

        // Candidate universe: every document under the resolved domains.
        let by_domain = DocumentsByDomain::new(self.ctx.pool().clone());
        let mut universe: Vec<i64> = Vec::new();
        let mut universe_seen = HashSet::new();
        for (domain_id, _) in &domains {
            for doc_id in by_domain.resolve(domain_id).await? {
                if universe_seen.insert(doc_id) {
                    universe.push(doc_id);
                }
            }
        }

        let (candidates, used_loose) = self
            .build_candidates(&adjacency, &universe, &keyword_ids, &mut messages)
            .await?;
        if candidates.is_empty() {
            messages.push(StatusMessage::NoCandidates);
        }

        // Score.
        let picker = DatePicker::new(self.ctx.pool().clone(), &self.settings);
        let phrases = PhrasesForDocument::new(self.ctx.pool().clone());
        let relevance = PhraseRelevance::new(self.ctx.pool().clone());
        let documents_repo = self.ctx.documents();

        let mut documents = Vec::new();
        for doc_id in &candidates {
            let Some(document) = documents_repo.get(*doc_id).await? else {
                continue;
            };
            let Some((method, date)) = picker.pick(*doc_id).await? else {
                continue;
            };

            let mut relevant_pos = 0;
            let mut relevant_neg = 0;
            let mut phrase_prob_sum = 0.0;
            let mut phrase_count = 0;
            for phrase in phrases.resolve(doc_id).await? {
                phrase_count += 1;
                if relevance.relevant(phrase.id, &keyword_ids).await? {
                    match phrase.label {
                        crate::models::Label::Positive => relevant_pos += 1,
                        crate::models::Label::Negative => relevant_neg += 1,
                        crate::models::Label::Unknown => {}
                    }
                    phrase_prob_sum += phrase.prob;
                }
            }

            documents.push(DocumentScore {
                document,
                method,
                date,
                relevant_pos,
                relevant_neg,
                phrase_prob_sum,
                phrase_count,
            });
        }

        // Aggregate per domain, only for domains present in the candidates.
        let grouped = aggregate::documents_by_domain(self.ctx.pool(), &candidates).await?;
        let label_by_doc: HashMap<i64, crate::models::Label> = documents
            .iter()
            .map(|score| (score.document.id, score.document.label))
            .collect();

        let mut summaries = Vec::new();
        let articles = self.ctx.articles();
        for (domain_id, doc_ids) in &grouped {
            let Some(domain) = articles.get_domain_by_id(*domain_id).await? else {
                continue;
            };
            let (link_histogram, internal_links) =
                aggregate::link_histogram(self.ctx.pool(), doc_ids, *domain_id).await?;
            let coverage = aggregate::coverage(self.ctx.pool(), doc_ids, *domain_id).await?;
            let keyword_samples = aggregate::ngram_samples(self.ctx.pool(), doc_ids).await?;

            let positive_documents = doc_ids
                .iter()
                .filter(|id| label_by_doc.get(*id) == Some(&crate::models::Label::Positive))
                .count();
            let negative_documents = doc_ids
                .iter()
                .filter(|id| label_by_doc.get(*id) == Some(&crate::models::Label::Negative))
                .count();

            summaries.push(DomainSummary {
                domain_id: *domain_id,
                key: domain.key,
                documents: doc_ids.len(),
                positive_documents,
                negative_documents,
                link_histogram,
                internal_links,
                coverage,
                keyword_samples,
            });
        }
        summaries.sort_by(|a, b| b.documents.cmp(&a.documents).then(a.key.cmp(&b.key)));

        // Resolution audit trail.
        let keyword_id_list: Vec<i64> = keywords.iter().map(|(id, _)| *id).collect();
        let domain_id_list: Vec<i64> = domains.iter().map(|(id, _)| *id).collect();
        self.ctx
            .user_queries()
            .record_resolution(query.id, &keyword_id_list, &domain_id_list, &candidates)
            .await?;

        Ok(QueryOutcome {
            query,
            messages,
            keywords,
            domains,
            used_loose,
            documents,
            summaries,
        })
    }

    async fn expand_keywords(
        &self,
        tokens: &[String],
        messages: &mut Vec<StatusMessage>,
    ) -> Result<Vec<(i64, String)>> {
        let combo = MetaCombo::new(
            PatternFormat::ALL
                .iter()
                .map(|format| {
                    Box::new(KeywordByPattern::new(self.ctx.pool().clone(), *format))
                        as Box<dyn Resolver<str, (i64, String)>>
                })
                .collect(),
        );

        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for token in tokens {
            let matches = combo.resolve(token).await?;
            if matches.is_empty() {
                messages.push(StatusMessage::UnresolvedKeyword(token.clone()));
                continue;
            }
            for (id, word) in matches {
                self.caches.keywords.put(&word, id);
                if seen.insert(id) {
                    out.push((id, word));
                }
            }
        }
        Ok(out)
    }

    async fn expand_domains(
        &self,
        tokens: &[String],
        messages: &mut Vec<StatusMessage>,
    ) -> Result<Vec<(i64, String)>> {
        let pattern = DomainByPattern::new(self.ctx.pool().clone());
        let articles = self.ctx.articles();

        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for token in tokens {
            let mut matched = false;

            // The token itself, resolved through cache then store.
            let exact = match self.caches.domains.resolve(token) {
                Some(id) => Some((id, token.clone())),
                None => articles
                    .get_domain(token)
                    .await?
                    .map(|domain| (domain.id, domain.key)),
            };
            if let Some((id, key)) = exact {
                self.caches.domains.put(&key, id);
                matched = true;
                if seen.insert(id) {
                    out.push((id, key));
                }
            }

            // Plus every subdomain.
            for (id, key) in pattern.resolve(token).await? {
                self.caches.domains.put(&key, id);
                matched = true;
                if seen.insert(id) {
                    out.push((id, key));
                }
            }

            if !matched {
                messages.push(StatusMessage::UnresolvedDomain(token.clone()));
            }
        }
        Ok(out)
    }

    /// Strict bigrams first; loose fallback when they are thin on the
    /// ground. Returns (candidates, used_loose).
    async fn build_candidates(
        &self,
        adjacency: &AdjacencyIndex,
        universe: &[i64],
        keyword_ids: &HashSet<i64>,
        messages: &mut Vec<StatusMessage>,
    ) -> Result<(Vec<i64>, bool)> {
        if keyword_ids.is_empty() {
            // Domain-only query: the whole universe qualifies.
            return Ok((universe.to_vec(), false));
        }

        let ids: Vec<i64> = keyword_ids.iter().copied().collect();
        let mut strict = Vec::new();
        'docs: for doc_id in universe {
            for (i, key1) in ids.iter().enumerate() {
                for key2 in &ids[i + 1..] {
                    if adjacency.strict(*key1, *key2, *doc_id).await? {
                        strict.push(*doc_id);
                        continue 'docs;
                    }
                }
            }
        }

        if strict.len() >= STRICT_FALLBACK_THRESHOLD {
            return Ok((strict, false));
        }

        messages.push(StatusMessage::ExpandingLoose {
            strict_count: strict.len(),
        });

        let mut candidates = strict;
        let mut seen: HashSet<i64> = candidates.iter().copied().collect();
        'fallback: for doc_id in universe {
            if seen.contains(doc_id) {
                continue;
            }
            for keyword_id in &ids {
                if adjacency.loose(*keyword_id, *doc_id).await? {
                    seen.insert(*doc_id);
                    candidates.push(*doc_id);
                    continue 'fallback;
                }
            }
        }

        Ok((candidates, true))
    }
}
