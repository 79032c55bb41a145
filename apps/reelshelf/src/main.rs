use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reelshelf::cli::{Cli, Command, FetchArgs};
use reelshelf::config::Config;
use reelshelf::error::{AppError, Result};
use reelshelf::services;
use tmdb_fetch::MetadataFetcher;

fn init_tracing() {
    // RUST_LOG controls log levels.
    // Default: debug for our crates, warn for dependencies
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("reelshelf=debug,tmdb_fetch=debug,warn"));

    // Logs go to stderr so stdout carries only the report.
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn fetch(args: FetchArgs) -> Result<()> {
    let config = Config::load_from(&args.config)?;
    tracing::debug!(?config, "Configuration loaded");

    let fetcher = MetadataFetcher::new_shared(config.to_fetcher_config()?)?;
    let logger = services::spawn_event_logger(fetcher.subscribe());

    let cancel = fetcher.cancellation_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupt received, cancelling");
                cancel.cancel();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    let report = reelshelf::run_fetch(&config, &args, Arc::clone(&fetcher)).await?;

    // A cancelled job never sends JobDone.
    if report.cancelled {
        logger.abort();
    } else if let Err(e) = logger.await {
        tracing::debug!(error = %e, "Event logger ended abnormally");
    }

    services::write_report(&report, args.output.as_deref()).await?;

    if report.cancelled {
        return Err(AppError::Fetch(tmdb_fetch::FetchError::Cancelled));
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();

    tracing::info!("Starting reelshelf v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Fetch(args) => fetch(args).await,
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(e.exit_code());
    }
}
