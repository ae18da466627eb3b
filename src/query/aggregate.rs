//! Per-domain summaries for query results.

use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::repository::Result;

/// How many link targets are listed before the "others" bucket.
const LINK_HISTOGRAM_TOP: usize = 5;
/// Adjacency pool the n-gram sample is drawn from.
const NGRAM_POOL: usize = 50;
/// Sample size shown per domain.
const NGRAM_SAMPLE: usize = 15;

/// Summary of one domain's slice of the candidate set.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DomainSummary {
    pub domain_id: i64,
    pub key: String,
    pub documents: usize,
    pub positive_documents: usize,
    pub negative_documents: usize,
    /// Top outbound link targets plus an "others" bucket.
    pub link_histogram: Vec<(String, i64)>,
    /// Absolute links pointing back at this domain.
    pub internal_links: i64,
    /// Rounded Jaccard percentage of internal link paths against known
    /// article paths.
    pub coverage: i64,
    /// Randomly sampled keyword n-grams. Deliberately nondeterministic.
    pub keyword_samples: Vec<String>,
}

/// Outbound-link histogram over a document set. Same-domain links count as
/// internal rather than external.
pub async fn link_histogram(
    pool: &SqlitePool,
    doc_ids: &[i64],
    own_domain: i64,
) -> Result<(Vec<(String, i64)>, i64)> {
    if doc_ids.is_empty() {
        return Ok((Vec::new(), 0));
    }

    let placeholders = vec!["?"; doc_ids.len()].join(", ");
    let sql = format!(
        "SELECT links_absolute.domain_id, domains.key, COUNT(*)
         FROM links_absolute
             JOIN domains ON links_absolute.domain_id = domains.id
         WHERE links_absolute.document_id IN ({})
         GROUP BY links_absolute.domain_id
         ORDER BY COUNT(*) DESC",
        placeholders
    );
    let mut query = sqlx::query(&sql);
    for id in doc_ids {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;

    let mut internal = 0i64;
    let mut external: Vec<(String, i64)> = Vec::new();
    for row in rows {
        let domain_id: i64 = row.get(0);
        let key: String = row.get(1);
        let count: i64 = row.get(2);
        if domain_id == own_domain {
            internal += count;
        } else {
            external.push((key, count));
        }
    }

    let mut histogram: Vec<(String, i64)> = external.iter().take(LINK_HISTOGRAM_TOP).cloned().collect();
    let others: i64 = external.iter().skip(LINK_HISTOGRAM_TOP).map(|(_, c)| c).sum();
    if others > 0 {
        histogram.push(("others".to_string(), others));
    }

    Ok((histogram, internal))
}

/// Coverage: |internal-paths ∩ article-paths| / |union| × 100, rounded.
pub async fn coverage(pool: &SqlitePool, doc_ids: &[i64], own_domain: i64) -> Result<i64> {
    let mut internal_paths: HashSet<String> = HashSet::new();

    if !doc_ids.is_empty() {
        let placeholders = vec!["?"; doc_ids.len()].join(", ");

        let sql = format!(
            "SELECT path FROM links_relative WHERE document_id IN ({})",
            placeholders
        );
        let mut query = sqlx::query_scalar::<_, String>(&sql);
        for id in doc_ids {
            query = query.bind(id);
        }
        internal_paths.extend(query.fetch_all(pool).await?);

        // Absolute links back to the same domain are internal too.
        let sql = format!(
            "SELECT path FROM links_absolute WHERE domain_id = ? AND document_id IN ({})",
            placeholders
        );
        let mut query = sqlx::query_scalar::<_, String>(&sql).bind(own_domain);
        for id in doc_ids {
            query = query.bind(id);
        }
        internal_paths.extend(query.fetch_all(pool).await?);
    }

    let article_paths: HashSet<String> =
        sqlx::query_scalar::<_, String>("SELECT path FROM articles WHERE domain_id = ?")
            .bind(own_domain)
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect();

    let intersection = internal_paths.intersection(&article_paths).count();
    let union = internal_paths.union(&article_paths).count();
    if union == 0 {
        return Ok(0);
    }
    Ok(((intersection as f64 / union as f64) * 100.0).round() as i64)
}

/// Chain adjacency pairs into n-grams: when a new pair's head equals an
/// existing chain's tail, the chain grows.
pub fn chain_ngrams(pairs: &[(String, Option<String>)]) -> Vec<String> {
    let mut chains: Vec<Vec<String>> = Vec::new();

    for (head, tail) in pairs {
        let extended = chains.iter_mut().find(|chain| chain.last() == Some(head));
        match (extended, tail) {
            (Some(chain), Some(tail)) => chain.push(tail.clone()),
            (Some(_), None) => {}
            (None, Some(tail)) => chains.push(vec![head.clone(), tail.clone()]),
            (None, None) => chains.push(vec![head.clone()]),
        }
    }

    chains.into_iter().map(|chain| chain.join(" ")).collect()
}

/// Draw the random n-gram sample for one domain's documents.
pub async fn ngram_samples(pool: &SqlitePool, doc_ids: &[i64]) -> Result<Vec<String>> {
    if doc_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; doc_ids.len()].join(", ");
    let sql = format!(
        "SELECT k1.word, k2.word, COUNT(*)
         FROM keyword_adjacencies
             JOIN keywords k1 ON keyword_adjacencies.key1_id = k1.id
             LEFT JOIN keywords k2 ON keyword_adjacencies.key2_id = k2.id
         WHERE keyword_adjacencies.doc_id IN ({})
         GROUP BY k1.word, k2.word
         ORDER BY COUNT(*) DESC
         LIMIT {}",
        placeholders, NGRAM_POOL
    );
    let mut query = sqlx::query(&sql);
    for id in doc_ids {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;

    let pairs: Vec<(String, Option<String>)> = rows
        .into_iter()
        .map(|r| (r.get::<String, _>(0), r.get::<Option<String>, _>(1)))
        .collect();

    let mut ngrams = chain_ngrams(&pairs);
    ngrams.shuffle(&mut rand::thread_rng());
    ngrams.truncate(NGRAM_SAMPLE);
    Ok(ngrams)
}

/// Group candidate documents by their article's domain.
pub async fn documents_by_domain(
    pool: &SqlitePool,
    doc_ids: &[i64],
) -> Result<HashMap<i64, Vec<i64>>> {
    let mut grouped: HashMap<i64, Vec<i64>> = HashMap::new();
    if doc_ids.is_empty() {
        return Ok(grouped);
    }

    let placeholders = vec!["?"; doc_ids.len()].join(", ");
    let sql = format!(
        "SELECT documents.id, articles.domain_id
         FROM documents
             JOIN articles ON documents.article_id = articles.id
         WHERE documents.id IN ({})",
        placeholders
    );
    let mut query = sqlx::query(&sql);
    for id in doc_ids {
        query = query.bind(id);
    }
    for row in query.fetch_all(pool).await? {
        let doc_id: i64 = row.get(0);
        let domain_id: i64 = row.get(1);
        grouped.entry(domain_id).or_default().push(doc_id);
    }
    Ok(grouped)
}
