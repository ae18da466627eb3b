//! Crawl transfer: archive-queue → raw articles + process-queue.
//!
//! One crawl file at a time: fetch from object storage, decompress, read the
//! embedded rows, insert each new raw article and enqueue its id. Finishing
//! a file marks it Complete and acknowledges the queue message, so retries
//! at any point are safe.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::archive::{self, ArchiveError};
use crate::models::{CrawlFileKind, CrawlFileStatus};
use crate::queue::{MessageQueue, QueueError, CRAWL_QUEUE_ITEMS_LIMIT};
use crate::repository::{DbContext, RepositoryError};
use crate::store::{ObjectStore, StoreError};

#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("Archive task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Unimplemented crawl file kind: {0}")]
    UnimplementedKind(&'static str),
}

pub type Result<T> = std::result::Result<T, TransferError>;

#[derive(Debug, Default, Clone, Copy)]
pub struct TransferStats {
    pub files: usize,
    pub inserted: usize,
    pub skipped: usize,
}

pub struct TransferService {
    ctx: DbContext,
    store: Arc<dyn ObjectStore>,
    crawl_queue: Arc<dyn MessageQueue>,
    process_queue: Arc<dyn MessageQueue>,
    skip_substring: Option<String>,
}

impl TransferService {
    pub fn new(
        ctx: DbContext,
        store: Arc<dyn ObjectStore>,
        crawl_queue: Arc<dyn MessageQueue>,
        process_queue: Arc<dyn MessageQueue>,
        skip_substring: Option<String>,
    ) -> Self {
        Self {
            ctx,
            store,
            crawl_queue,
            process_queue,
            skip_substring,
        }
    }

    /// Drain the crawl queue, replenishing it from Incomplete crawl files
    /// when it runs low.
    pub async fn run_files(&self) -> Result<TransferStats> {
        let mut stats = TransferStats::default();

        loop {
            if self.crawl_queue.count().await? <= CRAWL_QUEUE_ITEMS_LIMIT
                && !self.replenish_queue().await?
            {
                tracing::info!("Crawl queue is dry");
            }

            let messages = self.crawl_queue.receive(10).await?;
            if messages.is_empty() {
                break;
            }

            for message in messages {
                match self.transfer_file(message.id, &mut stats).await {
                    Ok(()) => {
                        self.crawl_queue.delete(&message).await?;
                        stats.files += 1;
                    }
                    Err(err) => {
                        tracing::error!("Transfer of crawl file {} failed: {}", message.id, err);
                    }
                }
            }
        }

        Ok(stats)
    }

    /// Refill the crawl queue with random Incomplete crawl file ids.
    /// Returns whether anything was enqueued.
    async fn replenish_queue(&self) -> Result<bool> {
        tracing::info!("Replenishing crawl queue...");
        let ids = self
            .ctx
            .crawl()
            .random_incomplete_ids(CRAWL_QUEUE_ITEMS_LIMIT, self.skip_substring.as_deref())
            .await?;
        if ids.is_empty() {
            return Ok(false);
        }
        for id in &ids {
            self.crawl_queue.send(*id).await?;
        }
        tracing::info!("Crawl queue replenished with {} items", ids.len());
        Ok(true)
    }

    /// Transfer every record of one crawl file.
    async fn transfer_file(&self, crawl_file_id: i64, stats: &mut TransferStats) -> Result<()> {
        let crawl = self.ctx.crawl();
        let Some(file) = crawl.get_file(crawl_file_id).await? else {
            tracing::warn!("Crawl file {} does not exist", crawl_file_id);
            return Ok(());
        };
        if file.status != CrawlFileStatus::Incomplete {
            tracing::info!("Crawl file {} is already {}", file.id, file.status.as_str());
            return Ok(());
        }
        if file.kind != CrawlFileKind::Sql {
            return Err(TransferError::UnimplementedKind(file.kind.as_str()));
        }

        let Some(source) = crawl.get_source_by_id(file.source_id).await? else {
            return Err(RepositoryError::NotFound(format!("crawl source {}", file.source_id)).into());
        };

        tracing::info!("Downloading {} from bucket {}", file.key, source.key);
        let compressed = match self.store.fetch(&source.key, &file.key).await {
            Ok(bytes) => bytes,
            Err(StoreError::NotFound { .. }) => {
                tracing::info!(
                    "Key {} doesn't exist in {}, marking as Error",
                    file.key,
                    source.key
                );
                crawl.set_file_status(file.id, CrawlFileStatus::Error).await?;
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        // Decompression and the embedded reader are synchronous.
        let records =
            tokio::task::spawn_blocking(move || archive::read_sql_archive(&compressed)).await??;

        let raw = self.ctx.raw_articles();
        for record in records {
            let inserted = raw
                .insert(
                    file.id,
                    &record.url,
                    &record.content_type,
                    record.date_crawled,
                    record.headers.as_deref(),
                    record.body.as_deref(),
                )
                .await?;

            match inserted {
                Some(raw_id) => {
                    self.process_queue.send(raw_id).await?;
                    stats.inserted += 1;
                }
                None => {
                    tracing::debug!("Raw article already exists: {}", record.url);
                    stats.skipped += 1;
                }
            }
        }

        crawl.set_file_status(file.id, CrawlFileStatus::Complete).await?;
        Ok(())
    }

    /// Enqueue every raw article that never produced a result row.
    pub async fn run_documents(&self) -> Result<usize> {
        let ids = self.ctx.raw_articles().ids_without_results().await?;
        for id in &ids {
            self.process_queue.send(*id).await?;
        }
        Ok(ids.len())
    }
}

/// Seed crawl files from an exported key manifest.
///
/// Reads `SELECT key FROM keys` from a local SQLite file, creates the crawl
/// source for the bucket prefix when missing, inserts each key as an
/// Incomplete crawl file, and deduplicates afterwards.
pub async fn transfer_keys(
    ctx: &DbContext,
    manifest: &Path,
    key_prefix: &str,
    kind: CrawlFileKind,
) -> Result<usize> {
    let manifest = manifest.to_path_buf();
    let keys = tokio::task::spawn_blocking(move || archive::read_key_manifest(&manifest)).await??;

    let crawl = ctx.crawl();
    let source = crawl.get_or_create_source(key_prefix).await?;

    let mut inserted = 0;
    for key in &keys {
        crawl.create_file(key, source.id, kind).await?;
        inserted += 1;
    }
    crawl.deduplicate().await?;

    Ok(inserted)
}
