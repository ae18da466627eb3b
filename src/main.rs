//! Sentropy - web-crawl sentiment analysis pipeline and query engine.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sentropy::cli;
use sentropy::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configuration is environment-only; a .env file may supply it.
    let _ = dotenvy::dotenv();
    let settings = Settings::from_env();
    settings.ensure_directories()?;

    init_logging(cli::is_verbose());

    cli::run(settings).await
}

/// RUST_LOG wins when set; otherwise the --verbose flag picks the level.
fn init_logging(verbose: bool) {
    let fallback = if verbose {
        "sentropy=info"
    } else {
        "sentropy=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
