//! Pipeline event types for progress tracking and notifications.

use serde::Serialize;
use std::path::PathBuf;

use crate::records::{MovieRecord, PersonRecord, SearchResults};
use crate::transport::TransportErrorKind;

/// Event emitted by the fetch pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetchEvent {
    /// Service configuration received; posters use `image_base_url` from now on.
    Initialized { image_base_url: String },

    /// Candidate list for a searched title, ready for disambiguation.
    CandidatesReady { results: SearchResults },

    /// Movie detail pass finished. Fires once per movie, even when the
    /// record is only partially filled.
    MovieReady { movie: MovieRecord },

    /// Person detail pass finished. Fires once per person, same rules.
    PersonReady { person: PersonRecord },

    /// A poster was written to disk.
    PosterSaved { path: PathBuf, bytes: usize },

    /// The service asked us to slow down; the request will be resent.
    RateLimited { endpoint: String, retry_in_secs: u64 },

    /// The HTTP layer failed. Not retried.
    TransportError {
        endpoint: String,
        code: TransportErrorKind,
        message: String,
    },

    /// A queued title went through the whole pipeline.
    MovieResolved { query: String, movie: MovieRecord },

    /// A queued title produced no usable candidate.
    TitleUnresolved { query: String, reason: String },

    /// The fetch queue drained.
    JobDone { resolved: usize, unresolved: usize },
}
