//! Query execution: queue consumer and one-off interactive mode.

use std::io::BufRead;
use std::sync::Arc;

use console::style;

use super::helpers;
use crate::cache::Caches;
use crate::config::Settings;
use crate::notify::LogNotifier;
use crate::presenter::{render, ResultPresenter};
use crate::query::QueryExecutor;
use crate::queue::QUERY_QUEUE;

/// Consume the query queue until it runs dry.
pub async fn cmd_query_queue(settings: &Settings) -> anyhow::Result<()> {
    let ctx = helpers::db_context(settings).await?;
    let caches = Caches::new();
    caches.warm_keywords(&ctx).await?;
    caches.warm_domains(&ctx).await?;

    let queue = helpers::queue(&ctx, settings, QUERY_QUEUE);
    let executor = QueryExecutor::new(ctx.clone(), caches, settings.clone());
    let presenter = ResultPresenter::new(
        ctx.clone(),
        helpers::object_store(settings),
        Arc::new(LogNotifier),
        &settings.results_bucket,
    );

    let queries = ctx.user_queries();
    let mut fulfilled = 0usize;

    loop {
        let messages = queue.receive(10).await?;
        if messages.is_empty() {
            break;
        }

        for message in messages {
            let Some(query) = queries.get(message.id).await? else {
                tracing::warn!("User query {} does not exist", message.id);
                queue.delete(&message).await?;
                continue;
            };

            tracing::info!("Resolving query {}: {}", query.id, query.text);
            match executor.execute(&query.text, query.email.as_deref()).await {
                Ok(outcome) => {
                    match presenter.present(&outcome).await {
                        Ok(key) => {
                            tracing::info!("Query {} fulfilled at {}", query.id, key);
                            fulfilled += 1;
                            queue.delete(&message).await?;
                        }
                        Err(err) => {
                            // Failure is recorded on the query row; don't
                            // redeliver forever.
                            tracing::error!("Presentation of query {} failed: {}", query.id, err);
                            queue.delete(&message).await?;
                        }
                    }
                }
                Err(err) => {
                    tracing::error!("Query {} failed: {:?}", query.id, err);
                    queries
                        .set_failure(query.id, &err.to_string(), false)
                        .await?;
                }
            }
        }
    }

    println!("{} Fulfilled {} queries", style("✓").green(), fulfilled);
    Ok(())
}

/// Read one query from stdin, resolve it, and print the rendered result.
pub async fn cmd_query_interactive(settings: &Settings) -> anyhow::Result<()> {
    let ctx = helpers::db_context(settings).await?;
    let caches = Caches::new();
    caches.warm_keywords(&ctx).await?;
    caches.warm_domains(&ctx).await?;

    eprint!("Enter query: ");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let text = line.trim();
    if text.is_empty() {
        anyhow::bail!("empty query");
    }

    let executor = QueryExecutor::new(ctx, caches, settings.clone());
    let outcome = executor.execute(text, None).await?;

    for message in &outcome.messages {
        eprintln!("{} {}", style("!").yellow(), message);
    }
    println!("{}", serde_json::to_string_pretty(&render(&outcome))?);
    Ok(())
}
