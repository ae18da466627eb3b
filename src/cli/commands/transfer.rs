//! Transfer commands: crawl archives in, raw articles out.

use std::path::Path;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use super::helpers;
use crate::config::Settings;
use crate::models::CrawlFileKind;
use crate::queue::{CRAWL_QUEUE, PROCESS_QUEUE};
use crate::transfer::{transfer_keys, TransferService};

pub async fn cmd_transfer(settings: &Settings, files: bool, documents: bool) -> anyhow::Result<()> {
    if !files && !documents {
        anyhow::bail!("nothing to do: pass --files and/or --documents");
    }

    let ctx = helpers::db_context(settings).await?;
    let service = TransferService::new(
        ctx.clone(),
        helpers::object_store(settings),
        helpers::queue(&ctx, settings, CRAWL_QUEUE),
        helpers::queue(&ctx, settings, PROCESS_QUEUE),
        settings.crawl_skip_substring.clone(),
    );

    if files {
        println!("{} Transferring crawl files...", style("→").cyan());
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        pb.set_message("Reading crawl archives...");
        pb.enable_steady_tick(Duration::from_millis(100));
        let stats = service.run_files().await?;
        pb.finish_and_clear();
        println!(
            "{} Transfer complete: {} files, {} articles inserted, {} skipped (existing)",
            style("✓").green(),
            stats.files,
            style(stats.inserted).green(),
            style(stats.skipped).yellow()
        );
    }

    if documents {
        println!(
            "{} Enqueueing raw articles without results...",
            style("→").cyan()
        );
        let enqueued = service.run_documents().await?;
        println!("{} Enqueued {} raw articles", style("✓").green(), enqueued);
    }

    tracing::info!("Crawl transfer completed.");
    Ok(())
}

pub async fn cmd_transfer_keys(
    settings: &Settings,
    file: &Path,
    prefix: &str,
    kind: &str,
) -> anyhow::Result<()> {
    let Some(kind) = CrawlFileKind::parse(kind) else {
        anyhow::bail!("not a valid kind: {} (expected SQL, Text or ARFF)", kind);
    };

    let ctx = helpers::db_context(settings).await?;
    println!(
        "{} Importing crawl keys from {} for prefix '{}'...",
        style("→").cyan(),
        file.display(),
        prefix
    );
    let inserted = transfer_keys(&ctx, file, prefix, kind).await?;
    println!("{} Imported {} crawl keys", style("✓").green(), inserted);
    Ok(())
}
