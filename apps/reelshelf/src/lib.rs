//! reelshelf
//!
//! Command-line front end for the `tmdb-fetch` pipeline: configuration,
//! candidate selection and job reports. Exposed as a library for tests.

use std::sync::Arc;

use tmdb_fetch::{FetchQueue, JobReport, MetadataFetcher};

pub mod cli;
pub mod config;
pub mod error;
pub mod services;

use cli::FetchArgs;
use config::Config;
use error::Result;

/// Run one fetch job for the given arguments.
///
/// The fetcher is created by the caller so it can hook up cancellation and
/// event subscribers first.
pub async fn run_fetch(
    config: &Config,
    args: &FetchArgs,
    fetcher: Arc<MetadataFetcher>,
) -> Result<JobReport> {
    let selection = args.select.unwrap_or(config.fetch.selection);
    let fetch_people = config.fetch.fetch_people && !args.no_people;

    tracing::info!(
        titles = args.titles.len(),
        selection = %selection,
        fetch_people,
        "Starting fetch job"
    );

    let mut queue = FetchQueue::new(fetcher, services::chooser_for(selection, args.year))
        .fetch_people(fetch_people);
    queue.enqueue(args.titles.iter().cloned());

    let report = queue.run().await?;

    if report.cancelled {
        tracing::warn!(
            resolved = report.resolved.len(),
            "Fetch job cancelled, report is partial"
        );
    }

    Ok(report)
}
