//! Process-queue consumption.

use std::sync::Arc;
use std::time::Duration;

use console::style;

use super::helpers;
use crate::cache::Caches;
use crate::config::Settings;
use crate::models::RawArticleStatus;
use crate::pipeline::{drain_queue, ArticleProcessor, ProcessStats};
use crate::queue::PROCESS_QUEUE;

pub async fn cmd_process(settings: &Settings, workers: usize) -> anyhow::Result<()> {
    let ctx = helpers::db_context(settings).await?;
    let caches = Caches::new();
    let queue = helpers::queue(&ctx, settings, PROCESS_QUEUE);

    let processor = Arc::new(ArticleProcessor::new(
        ctx,
        caches,
        helpers::pipeline_services(settings)?,
        settings,
    ));
    let article_timeout = Duration::from_secs(settings.article_timeout);

    let workers = workers.max(1);
    println!(
        "{} Processing with {} worker(s)...",
        style("→").cyan(),
        workers
    );

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let processor = Arc::clone(&processor);
        let queue = Arc::clone(&queue);
        handles.push(tokio::spawn(async move {
            drain_queue(processor, queue, article_timeout).await
        }));
    }

    let mut totals = ProcessStats::default();
    for result in futures::future::try_join_all(handles).await? {
        let stats = result?;
        totals.committed += stats.committed;
        totals.skipped += stats.skipped;
        totals.failed += stats.failed;
    }

    println!(
        "{} Processing complete: {} committed, {} skipped, {} failed",
        style("✓").green(),
        style(totals.committed).green(),
        style(totals.skipped).yellow(),
        style(totals.failed).red()
    );
    Ok(())
}

/// Re-enqueue every raw article still marked Unprocessed.
pub async fn cmd_reprocess(settings: &Settings) -> anyhow::Result<()> {
    let ctx = helpers::db_context(settings).await?;
    let queue = helpers::queue(&ctx, settings, PROCESS_QUEUE);

    let ids = ctx
        .raw_articles()
        .ids_with_status(RawArticleStatus::Unprocessed)
        .await?;
    for id in &ids {
        queue.send(*id).await?;
    }

    println!(
        "{} Re-enqueued {} unprocessed raw articles",
        style("✓").green(),
        ids.len()
    );
    Ok(())
}
