//! Request sequencer.
//!
//! [`MetadataFetcher`] issues the configuration, search, movie, person and
//! poster requests. Each call takes its in-flight record by value, fills it
//! from the response and hands it back, so no scratch state lives on the
//! fetcher itself. Requests of one category are serialized through a lane
//! lock; all requests go through the shared [`BackoffGate`].

use reqwest::Url;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::backoff::BackoffGate;
use crate::config::FetcherConfig;
use crate::endpoint::{Category, Endpoint};
use crate::error::{FetchError, Result};
use crate::events::FetchEvent;
use crate::payload::{self, Payload, PersonOutcome};
use crate::poster::PosterStore;
use crate::records::{Candidate, MovieRecord, PersonRecord, SearchResults};
use crate::transport::{HttpResponse, HttpTransport, ReqwestTransport};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One lock per request category.
#[derive(Debug, Default)]
struct Lanes {
    movies: Mutex<()>,
    people: Mutex<()>,
    posters: Mutex<()>,
}

impl Lanes {
    fn get(&self, category: Category) -> &Mutex<()> {
        match category {
            Category::Movies => &self.movies,
            Category::People => &self.people,
            Category::Posters => &self.posters,
        }
    }
}

/// What came back for one request after rate-limit retries.
enum Reply {
    Payload(Payload),
    Raw(HttpResponse),
    Failed,
}

/// TMDb metadata fetcher.
pub struct MetadataFetcher {
    config: FetcherConfig,
    transport: Arc<dyn HttpTransport>,
    image_base: RwLock<String>,
    initialized: AtomicBool,
    lanes: Lanes,
    gate: BackoffGate,
    posters: PosterStore,
    cancel: CancellationToken,
    event_tx: broadcast::Sender<FetchEvent>,
}

impl MetadataFetcher {
    /// Create a fetcher backed by reqwest.
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.request_timeout)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a fetcher wrapped in Arc for shared access.
    pub fn new_shared(config: FetcherConfig) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::new(config)?))
    }

    /// Create a fetcher over any transport.
    pub fn with_transport(config: FetcherConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        Url::parse(&config.api_base_url).map_err(|e| {
            FetchError::Config(format!("Invalid API base URL {}: {}", config.api_base_url, e))
        })?;

        tracing::debug!(?config, "Creating metadata fetcher");

        let cancel = CancellationToken::new();
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            image_base: RwLock::new(config.image_base_url.clone()),
            initialized: AtomicBool::new(false),
            lanes: Lanes::default(),
            gate: BackoffGate::new(config.backoff, cancel.clone()),
            posters: PosterStore::new(config.poster_dir.clone()),
            transport,
            cancel,
            event_tx,
            config,
        })
    }

    /// Subscribe to pipeline events.
    pub fn subscribe(&self) -> broadcast::Receiver<FetchEvent> {
        self.event_tx.subscribe()
    }

    /// Token that aborts pending requests and backoff waits when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Abandon whatever is in flight. Every later call returns `Cancelled`.
    pub fn cancel(&self) {
        tracing::info!("Cancelling metadata fetcher");
        self.cancel.cancel();
    }

    /// Whether the configuration request has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    pub fn poster_store(&self) -> &PosterStore {
        &self.posters
    }

    pub(crate) fn emit(&self, event: FetchEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Fetch the service configuration and remember the poster base URL.
    ///
    /// Returns whether the fetcher is initialized afterwards. On failure the
    /// default image base stays in use.
    pub async fn initialize(&self) -> Result<bool> {
        tracing::debug!("Sending configuration request");

        match self.exchange(&Endpoint::Configuration).await? {
            Reply::Payload(Payload::Document(document)) => match payload::image_base_url(document) {
                Ok(Some(base)) => {
                    *self.image_base.write().await = base.clone();
                    self.initialized.store(true, Ordering::SeqCst);
                    tracing::info!(image_base_url = %base, "TMDB configuration received");
                    self.emit(FetchEvent::Initialized {
                        image_base_url: base,
                    });
                }
                Ok(None) => tracing::warn!("Configuration response has no secure_base_url"),
                Err(e) => tracing::warn!(error = %e, "Failed to decode configuration response"),
            },
            Reply::Payload(other) => log_unusable("configuration", &other),
            Reply::Raw(_) | Reply::Failed => {}
        }

        Ok(self.is_initialized())
    }

    /// Search candidates for a free-text title.
    ///
    /// Returns `None` (and emits nothing) when the response is unusable.
    pub async fn search(&self, title: &str) -> Result<Option<SearchResults>> {
        tracing::debug!(query = %title, "Searching TMDB movies");

        let endpoint = Endpoint::Search {
            query: title.to_string(),
        };

        let document = match self.exchange(&endpoint).await? {
            Reply::Payload(Payload::Document(document)) => document,
            Reply::Payload(other) => {
                log_unusable("search", &other);
                return Ok(None);
            }
            Reply::Raw(_) | Reply::Failed => return Ok(None),
        };

        match payload::search_results(title, document) {
            Ok(results) => {
                tracing::debug!(
                    query = %title,
                    total = results.total_results,
                    candidates = results.candidates.len(),
                    "Movie candidates found"
                );
                self.emit(FetchEvent::CandidatesReady {
                    results: results.clone(),
                });
                Ok(Some(results))
            }
            Err(e) => {
                tracing::warn!(query = %title, error = %e, "Failed to decode search response");
                Ok(None)
            }
        }
    }

    /// Resolve full movie detail for a chosen candidate.
    pub async fn movie_for(&self, candidate: &Candidate) -> Result<MovieRecord> {
        self.movie(MovieRecord::new(candidate.title.clone(), candidate.tmdb_id))
            .await
    }

    /// Fill a movie record from the movie-detail endpoint, downloading the
    /// poster when one is listed.
    ///
    /// Always emits exactly one `MovieReady`, with whatever the record holds
    /// at that point. The only error is `Cancelled`.
    pub async fn movie(&self, mut record: MovieRecord) -> Result<MovieRecord> {
        let Some(id) = record.tmdb_id else {
            tracing::warn!(title = %record.title, "Movie record has no TMDB id, skipping detail request");
            self.emit(FetchEvent::MovieReady {
                movie: record.clone(),
            });
            return Ok(record);
        };

        tracing::debug!(movie_id = id, "Fetching TMDB movie details");

        match self.exchange(&Endpoint::Movie { id }).await? {
            Reply::Payload(Payload::Document(document)) => {
                if let Err(e) = payload::apply_movie(&mut record, document) {
                    tracing::warn!(movie_id = id, error = %e, "Failed to decode movie response");
                }
            }
            Reply::Payload(other) => log_unusable("movie", &other),
            Reply::Raw(_) | Reply::Failed => {}
        }

        if let Some(poster_path) = record.poster_path.clone() {
            record.poster_file = self.download_poster(&poster_path).await?;
        }

        tracing::debug!(
            movie_id = id,
            title = %record.title,
            people = record.people.len(),
            "Movie detail done"
        );
        self.emit(FetchEvent::MovieReady {
            movie: record.clone(),
        });
        Ok(record)
    }

    /// Fill a person record from the person-detail endpoint.
    ///
    /// A response describing a different person is discarded and not
    /// retried; the record comes back unchanged. Always emits exactly one
    /// `PersonReady`.
    pub async fn person(&self, mut record: PersonRecord) -> Result<PersonRecord> {
        let id = record.tmdb_id;
        tracing::debug!(person_id = id, "Fetching TMDB person details");

        match self.exchange(&Endpoint::Person { id }).await? {
            Reply::Payload(Payload::Document(document)) => {
                match payload::apply_person(&mut record, document) {
                    Ok(PersonOutcome::Applied) => {
                        tracing::debug!(person_id = id, name = %record.name, "Person detail applied");
                    }
                    Ok(PersonOutcome::MissingId) => {
                        tracing::warn!(person_id = id, "Person response carried no id, discarded");
                    }
                    Ok(PersonOutcome::Mismatch { received }) => {
                        tracing::warn!(
                            person_id = id,
                            received = received,
                            "Person response is for another id, discarded"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(person_id = id, error = %e, "Failed to decode person response");
                    }
                }
            }
            Reply::Payload(other) => log_unusable("person", &other),
            Reply::Raw(_) | Reply::Failed => {}
        }

        self.emit(FetchEvent::PersonReady {
            person: record.clone(),
        });
        Ok(record)
    }

    /// Download a poster by relative path (e.g. `/abc.jpg`) into the poster
    /// directory. Failures are logged and yield `None`.
    pub async fn download_poster(&self, poster_path: &str) -> Result<Option<PathBuf>> {
        tracing::debug!(poster_path = %poster_path, "Sending poster request");

        let endpoint = Endpoint::Poster {
            path: poster_path.to_string(),
        };

        let response = match self.exchange(&endpoint).await? {
            Reply::Raw(response) => response,
            Reply::Payload(_) | Reply::Failed => return Ok(None),
        };

        if !response.is_success() {
            tracing::warn!(
                url = %response.url,
                status = response.status,
                "Poster download returned an error status, not saving"
            );
            return Ok(None);
        }

        match self.posters.save(&response.url, &response.body).await {
            Ok(Some(path)) => {
                self.emit(FetchEvent::PosterSaved {
                    path: path.clone(),
                    bytes: response.body.len(),
                });
                Ok(Some(path))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                tracing::error!(url = %response.url, error = %e, "Failed to write poster");
                Ok(None)
            }
        }
    }

    // =========================================================================
    // Exchange
    // =========================================================================

    /// Send one request through its lane and the backoff gate, resending the
    /// identical request after every rate-limit response.
    async fn exchange(&self, endpoint: &Endpoint) -> Result<Reply> {
        let _lane = self.lanes.get(endpoint.category()).lock().await;

        loop {
            self.gate.pass().await?;

            let image_base = self.image_base.read().await.clone();
            let url = endpoint.url(&self.config, &image_base)?;

            let sent = tokio::select! {
                _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
                sent = self.transport.get(url) => sent,
            };

            let response = match sent {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(endpoint = endpoint.name(), code = %e.kind, error = %e.message, "Request failed");
                    self.emit(FetchEvent::TransportError {
                        endpoint: endpoint.name().to_string(),
                        code: e.kind,
                        message: e.message,
                    });
                    return Ok(Reply::Failed);
                }
            };

            if endpoint.category() == Category::Posters {
                return Ok(Reply::Raw(response));
            }

            match payload::classify(&response.body) {
                Payload::RateLimited => {
                    tracing::info!(
                        endpoint = endpoint.name(),
                        delay_secs = self.gate.delay().as_secs(),
                        "Too many requests, backing off"
                    );
                    self.emit(FetchEvent::RateLimited {
                        endpoint: endpoint.name().to_string(),
                        retry_in_secs: self.gate.delay().as_secs(),
                    });
                    self.gate.trip().await;
                }
                payload => return Ok(Reply::Payload(payload)),
            }
        }
    }
}

fn log_unusable(endpoint: &str, payload: &Payload) {
    match payload {
        Payload::Empty => tracing::warn!(endpoint, "Response body empty"),
        Payload::Malformed(reason) => {
            tracing::warn!(endpoint, reason = %reason, "Response body is not a JSON object")
        }
        Payload::ApiError { code, message } => {
            tracing::warn!(endpoint, code = code, message = %message, "TMDB returned an error")
        }
        Payload::RateLimited | Payload::Document(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = FetcherConfig::new("key").unwrap().api_base_url("not a url");
        let transport = Arc::new(ReqwestTransport::new(std::time::Duration::from_secs(1)).unwrap());
        assert!(matches!(
            MetadataFetcher::with_transport(config, transport),
            Err(FetchError::Config(_))
        ));
    }

    #[test]
    fn test_new_is_not_initialized() {
        let fetcher = MetadataFetcher::new(FetcherConfig::new("key").unwrap()).unwrap();
        assert!(!fetcher.is_initialized());
    }
}
