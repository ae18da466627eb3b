//! Resolution services for the query engine.
//!
//! Everything is a `Resolver`: input in, zero or more outputs back. Two
//! combinators compose the leaves — `MetaCombo` unions every inner result,
//! `MetaStack` returns the first non-empty answer.

mod dates;
mod documents;
mod patterns;
mod phrases;

pub use dates::{
    CertainDatePicker, CrawledDatePicker, DateMethod, DatePicker, UncertainDatePicker,
};
pub use documents::{AdjacencyIndex, DocumentsByDomain, DocumentsByKeyword};
pub use patterns::{DomainByPattern, KeywordByPattern, PatternFormat};
pub use phrases::{PhraseRelevance, PhrasesForDocument};

use async_trait::async_trait;

use crate::repository::Result;

#[async_trait]
pub trait Resolver<I, O>: Send + Sync
where
    I: Send + Sync + ?Sized,
    O: Send,
{
    async fn resolve(&self, input: &I) -> Result<Vec<O>>;
}

/// Runs every inner resolver and unions the results, preserving first-seen
/// order.
pub struct MetaCombo<I, O>
where
    I: Send + Sync + ?Sized,
    O: Send,
{
    resolvers: Vec<Box<dyn Resolver<I, O>>>,
}

impl<I, O> MetaCombo<I, O>
where
    I: Send + Sync + ?Sized,
    O: Send + Clone + Eq + std::hash::Hash,
{
    pub fn new(resolvers: Vec<Box<dyn Resolver<I, O>>>) -> Self {
        Self { resolvers }
    }
}

#[async_trait]
impl<I, O> Resolver<I, O> for MetaCombo<I, O>
where
    I: Send + Sync + ?Sized,
    O: Send + Clone + Eq + std::hash::Hash,
{
    async fn resolve(&self, input: &I) -> Result<Vec<O>> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for resolver in &self.resolvers {
            for item in resolver.resolve(input).await? {
                if seen.insert(item.clone()) {
                    out.push(item);
                }
            }
        }
        Ok(out)
    }
}

/// Runs the inner resolvers in order and returns the first non-empty result.
pub struct MetaStack<I, O>
where
    I: Send + Sync + ?Sized,
    O: Send,
{
    resolvers: Vec<Box<dyn Resolver<I, O>>>,
}

impl<I, O> MetaStack<I, O>
where
    I: Send + Sync + ?Sized,
    O: Send,
{
    pub fn new(resolvers: Vec<Box<dyn Resolver<I, O>>>) -> Self {
        Self { resolvers }
    }
}

#[async_trait]
impl<I, O> Resolver<I, O> for MetaStack<I, O>
where
    I: Send + Sync + ?Sized,
    O: Send,
{
    async fn resolve(&self, input: &I) -> Result<Vec<O>> {
        for resolver in &self.resolvers {
            let result = resolver.resolve(input).await?;
            if !result.is_empty() {
                return Ok(result);
            }
        }
        Ok(Vec::new())
    }
}
