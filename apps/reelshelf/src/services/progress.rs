//! Turns pipeline events into log lines.

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use tmdb_fetch::FetchEvent;

/// Log every event until the job finishes or the channel closes.
pub fn spawn_event_logger(mut rx: broadcast::Receiver<FetchEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let done = matches!(event, FetchEvent::JobDone { .. });
                    log_event(&event);
                    if done {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event logger lagging, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &FetchEvent) {
    match event {
        FetchEvent::Initialized { image_base_url } => {
            tracing::debug!(image_base_url = %image_base_url, "Poster base URL set");
        }
        FetchEvent::CandidatesReady { results } => {
            tracing::info!(
                query = %results.query,
                candidates = results.candidates.len(),
                "Search finished"
            );
        }
        FetchEvent::MovieReady { movie } => {
            tracing::info!(
                title = %movie.title,
                release_date = ?movie.release_date,
                people = movie.people.len(),
                "Movie ready"
            );
        }
        FetchEvent::PersonReady { person } => {
            tracing::debug!(name = %person.name, role = %person.role, "Person ready");
        }
        FetchEvent::PosterSaved { path, bytes } => {
            tracing::info!(path = %path.display(), bytes, "Poster saved");
        }
        FetchEvent::RateLimited {
            endpoint,
            retry_in_secs,
        } => {
            tracing::info!(endpoint = %endpoint, retry_in_secs, "Rate limited, waiting");
        }
        FetchEvent::TransportError {
            endpoint,
            code,
            message,
        } => {
            tracing::error!(endpoint = %endpoint, code = %code, message = %message, "Request failed");
        }
        FetchEvent::MovieResolved { query, movie } => {
            tracing::info!(query = %query, tmdb_id = ?movie.tmdb_id, "Title resolved");
        }
        FetchEvent::TitleUnresolved { query, reason } => {
            tracing::warn!(query = %query, reason = %reason, "Title unresolved");
        }
        FetchEvent::JobDone {
            resolved,
            unresolved,
        } => {
            tracing::info!(resolved, unresolved, "Job done");
        }
    }
}
