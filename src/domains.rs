//! Domain resolution: host string → domain id.
//!
//! The database is the sole id authority. Resolution is cache first, then a
//! read, then `INSERT OR IGNORE` and a bounded re-read loop: when two racers
//! insert, one sees its own row and the other sees the winner's.

use thiserror::Error;

use crate::cache::Caches;
use crate::models::{validate_domain_key, DomainError};
use crate::repository::{ArticleRepository, RepositoryError};

/// Re-read attempts before giving up on a freshly inserted row.
const MAX_SPIN: usize = 5;

#[derive(Debug, Error)]
pub enum DomainResolveError {
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error("Domain {0} did not become visible after insert")]
    NotVisible(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct DomainResolver {
    repo: ArticleRepository,
    caches: Caches,
}

impl DomainResolver {
    pub fn new(repo: ArticleRepository, caches: Caches) -> Self {
        Self { repo, caches }
    }

    /// Resolve a host to its domain id, creating the row if needed.
    pub async fn resolve(&self, host: &str) -> Result<i64, DomainResolveError> {
        let key = validate_domain_key(host)?;

        if let Some(id) = self.caches.domains.resolve(&key) {
            return Ok(id);
        }

        if let Some(domain) = self.lookup(&key).await? {
            self.caches.domains.put(&key, domain);
            return Ok(domain);
        }

        self.repo.insert_domain_ignore(&key).await?;

        for _ in 0..MAX_SPIN {
            if let Some(id) = self.lookup(&key).await? {
                self.caches.domains.put(&key, id);
                return Ok(id);
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }

        Err(DomainResolveError::NotVisible(key))
    }

    /// Read-only resolution: never creates a row.
    pub async fn resolve_existing(&self, host: &str) -> Result<Option<i64>, DomainResolveError> {
        let key = validate_domain_key(host)?;
        if let Some(id) = self.caches.domains.resolve(&key) {
            return Ok(Some(id));
        }
        let id = self.lookup(&key).await?;
        if let Some(id) = id {
            self.caches.domains.put(&key, id);
        }
        Ok(id)
    }

    async fn lookup(&self, key: &str) -> Result<Option<i64>, RepositoryError> {
        // One retry on a transient failure before reporting upwards.
        match self.repo.get_domain(key).await {
            Ok(domain) => Ok(domain.map(|d| d.id)),
            Err(err) if crate::repository::is_transient(&err) => {
                tracing::warn!("Transient failure resolving {}: {}; retrying", key, err);
                Ok(self.repo.get_domain(key).await?.map(|d| d.id))
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;

    #[tokio::test]
    async fn resolves_and_caches_new_domains() {
        let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
        let caches = Caches::new();
        let resolver = DomainResolver::new(ctx.articles(), caches.clone());

        let id = resolver.resolve("example.com").await.unwrap();
        assert_eq!(caches.domains.resolve("example.com"), Some(id));

        // Second resolution returns the same id.
        assert_eq!(resolver.resolve("example.com").await.unwrap(), id);
    }

    #[tokio::test]
    async fn two_racers_agree_on_one_id() {
        let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
        let a = DomainResolver::new(ctx.articles(), Caches::new());
        let b = DomainResolver::new(ctx.articles(), Caches::new());

        let (left, right) = tokio::join!(a.resolve("example.com"), b.resolve("example.com"));
        assert_eq!(left.unwrap(), right.unwrap());
    }

    #[tokio::test]
    async fn invalid_hosts_are_rejected() {
        let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
        let resolver = DomainResolver::new(ctx.articles(), Caches::new());
        assert!(matches!(
            resolver.resolve("not_a_domain").await,
            Err(DomainResolveError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn read_only_resolution_never_creates() {
        let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
        let resolver = DomainResolver::new(ctx.articles(), Caches::new());
        assert_eq!(resolver.resolve_existing("example.com").await.unwrap(), None);
        assert!(ctx.articles().get_domain("example.com").await.unwrap().is_none());
    }
}
