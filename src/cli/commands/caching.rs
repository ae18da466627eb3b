//! Cache warming commands.

use console::style;

use super::helpers;
use crate::cache::Caches;
use crate::config::Settings;

pub async fn cmd_cache_keywords(settings: &Settings) -> anyhow::Result<()> {
    let ctx = helpers::db_context(settings).await?;
    let caches = Caches::new();
    let total = caches.warm_keywords(&ctx).await?;
    println!("{} Cached {} keywords", style("✓").green(), total);
    Ok(())
}

pub async fn cmd_cache_domains(settings: &Settings) -> anyhow::Result<()> {
    let ctx = helpers::db_context(settings).await?;
    let caches = Caches::new();
    let total = caches.warm_domains(&ctx).await?;
    println!("{} Cached {} domains", style("✓").green(), total);
    Ok(())
}
