//! Gavel CLI binary.
//!
//! Entry point for the `gavel` command.

use clap::Parser;
use gavel_cli::{App, Args};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gavel_sdk=debug,gavel_cli=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = args.config();
    config.validate()?;

    tracing::debug!(api_url = %config.api_url, hub_url = %config.hub_url, "starting gavel");

    App::new(config)?.run(args.command).await
}
