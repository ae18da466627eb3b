//! Fuzzy pattern expansion for domains and keywords.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use super::Resolver;
use crate::repository::Result;

/// Expands a bare host to every known subdomain: `%.host`.
pub struct DomainByPattern {
    pool: SqlitePool,
}

impl DomainByPattern {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Resolver<str, (i64, String)> for DomainByPattern {
    async fn resolve(&self, host: &str) -> Result<Vec<(i64, String)>> {
        let pattern = format!("%.{}", host);
        let rows = sqlx::query("SELECT id, key FROM domains WHERE key LIKE ?")
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| (r.get(0), r.get(1))).collect())
    }
}

/// The four keyword glob shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternFormat {
    /// `X`
    Exact,
    /// `% X`
    LeftSpace,
    /// `X %`
    RightSpace,
    /// `% X %`
    BothSpace,
}

impl PatternFormat {
    pub const ALL: [PatternFormat; 4] = [
        PatternFormat::Exact,
        PatternFormat::LeftSpace,
        PatternFormat::RightSpace,
        PatternFormat::BothSpace,
    ];

    pub fn apply(&self, word: &str) -> String {
        match self {
            Self::Exact => word.to_string(),
            Self::LeftSpace => format!("% {}", word),
            Self::RightSpace => format!("{} %", word),
            Self::BothSpace => format!("% {} %", word),
        }
    }
}

/// Expands a keyword token against the keyword table with one glob shape.
pub struct KeywordByPattern {
    pool: SqlitePool,
    format: PatternFormat,
}

impl KeywordByPattern {
    pub fn new(pool: SqlitePool, format: PatternFormat) -> Self {
        Self { pool, format }
    }
}

#[async_trait]
impl Resolver<str, (i64, String)> for KeywordByPattern {
    async fn resolve(&self, word: &str) -> Result<Vec<(i64, String)>> {
        let pattern = self.format.apply(word);
        let rows = sqlx::query("SELECT id, word FROM keywords WHERE word LIKE ?")
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| (r.get(0), r.get(1))).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;
    use crate::resolvers::{MetaCombo, Resolver};

    async fn seeded() -> DbContext {
        let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
        ctx.keywords()
            .upsert_words(&[
                "apple".to_string(),
                "apple store".to_string(),
                "big apple".to_string(),
                "apples".to_string(),
            ])
            .await
            .unwrap();
        ctx.articles().insert_domain_ignore("cnn.com").await.unwrap();
        ctx.articles()
            .insert_domain_ignore("edition.cnn.com")
            .await
            .unwrap();
        ctx
    }

    #[test]
    fn formats_produce_expected_globs() {
        assert_eq!(PatternFormat::Exact.apply("apple"), "apple");
        assert_eq!(PatternFormat::LeftSpace.apply("apple"), "% apple");
        assert_eq!(PatternFormat::RightSpace.apply("apple"), "apple %");
        assert_eq!(PatternFormat::BothSpace.apply("apple"), "% apple %");
    }

    #[tokio::test]
    async fn domain_pattern_finds_subdomains_only() {
        let ctx = seeded().await;
        let resolver = DomainByPattern::new(ctx.pool().clone());
        let matches = resolver.resolve("cnn.com").await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].1, "edition.cnn.com");
    }

    #[tokio::test]
    async fn keyword_patterns_expand_differently() {
        let ctx = seeded().await;

        let exact = KeywordByPattern::new(ctx.pool().clone(), PatternFormat::Exact);
        let words: Vec<String> = exact
            .resolve("apple")
            .await
            .unwrap()
            .into_iter()
            .map(|(_, w)| w)
            .collect();
        assert_eq!(words, vec!["apple"]);

        let left = KeywordByPattern::new(ctx.pool().clone(), PatternFormat::LeftSpace);
        let words: Vec<String> = left
            .resolve("apple")
            .await
            .unwrap()
            .into_iter()
            .map(|(_, w)| w)
            .collect();
        assert_eq!(words, vec!["big apple"]);

        let right = KeywordByPattern::new(ctx.pool().clone(), PatternFormat::RightSpace);
        let words: Vec<String> = right
            .resolve("apple")
            .await
            .unwrap()
            .into_iter()
            .map(|(_, w)| w)
            .collect();
        assert_eq!(words, vec!["apple store"]);
    }

    #[tokio::test]
    async fn combo_of_formats_unions_matches() {
        let ctx = seeded().await;
        let combo = MetaCombo::new(
            PatternFormat::ALL
                .iter()
                .map(|format| {
                    Box::new(KeywordByPattern::new(ctx.pool().clone(), *format))
                        as Box<dyn Resolver<str, (i64, String)>>
                })
                .collect(),
        );
        let words: Vec<String> = combo
            .resolve("apple")
            .await
            .unwrap()
            .into_iter()
            .map(|(_, w)| w)
            .collect();
        assert!(words.contains(&"apple".to_string()));
        assert!(words.contains(&"apple store".to_string()));
        assert!(words.contains(&"big apple".to_string()));
    }
}
