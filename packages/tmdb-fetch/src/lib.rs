//! TMDb metadata fetch pipeline.
//!
//! Resolves movie titles against The Movie Database one request at a time:
//! title search, candidate selection, movie detail with credits, person
//! detail and poster download. Rate-limit responses (`status_code` 25)
//! pause the whole pipeline for a fixed delay and the request is resent.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tmdb_fetch::{FetchQueue, FetcherConfig, MetadataFetcher, TitleMatch};
//!
//! # async fn run() -> tmdb_fetch::Result<()> {
//! let config = FetcherConfig::new("api-key")?.poster_dir("./posters");
//! let fetcher = MetadataFetcher::new_shared(config)?;
//!
//! let mut queue = FetchQueue::new(Arc::clone(&fetcher), Arc::new(TitleMatch::new()));
//! queue.enqueue(["Heat", "Alien"]);
//! let report = queue.run().await?;
//! println!("{} resolved", report.resolved.len());
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod payload;
pub mod poster;
pub mod queue;
pub mod records;
pub mod transport;

pub use backoff::{BackoffGate, GateState};
pub use config::FetcherConfig;
pub use endpoint::{Category, Endpoint};
pub use error::{FetchError, Result};
pub use events::FetchEvent;
pub use fetcher::MetadataFetcher;
pub use poster::PosterStore;
pub use queue::{
    CandidateChooser, FetchQueue, FirstCandidate, JobReport, QueueHandle, ResolvedMovie,
    TitleMatch, UnresolvedTitle,
};
pub use records::{Candidate, Credit, MovieRecord, PersonRecord, PersonRole, SearchResults};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportError, TransportErrorKind};
