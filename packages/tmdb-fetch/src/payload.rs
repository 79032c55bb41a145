//! Response parsing.
//!
//! Bodies are classified first (empty, malformed, rate-limited, API error,
//! document) and only documents are decoded into the wire structs below.
//! Decoding is lenient: missing fields default, and anything that still
//! fails to decode leaves the in-flight record untouched.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::records::{
    parse_tmdb_date, Candidate, Credit, MovieRecord, PersonRecord, PersonRole, SearchResults,
};

/// `status_code` TMDb uses for "too many requests", whatever the HTTP status.
pub const RATE_LIMIT_STATUS_CODE: i64 = 25;

/// Outcome of classifying a raw response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Zero bytes, whitespace, or `{}`.
    Empty,
    /// Not JSON, or JSON that is not an object.
    Malformed(String),
    /// Body carries `status_code == 25`.
    RateLimited,
    /// Any other TMDb error envelope.
    ApiError { code: i64, message: String },
    Document(Map<String, Value>),
}

/// Classify a response body.
pub fn classify(body: &[u8]) -> Payload {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Payload::Empty;
    }

    let map = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Payload::Malformed(format!("expected a JSON object, got {}", kind_of(&other)))
        }
        Err(e) => return Payload::Malformed(e.to_string()),
    };

    if map.is_empty() {
        return Payload::Empty;
    }

    if let Some(code) = map.get("status_code").and_then(Value::as_i64) {
        if code == RATE_LIMIT_STATUS_CODE {
            return Payload::RateLimited;
        }
        let failed = map.get("success").and_then(Value::as_bool) == Some(false);
        if failed || map.contains_key("status_message") {
            let message = map
                .get("status_message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Payload::ApiError { code, message };
        }
    }

    Payload::Document(map)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn decode<T: DeserializeOwned>(document: Map<String, Value>) -> serde_json::Result<T> {
    serde_json::from_value(Value::Object(document))
}

/// `null` decodes to the field's default, like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigurationWire {
    #[serde(default, deserialize_with = "null_as_default")]
    images: ImagesWire,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImagesWire {
    secure_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchWire {
    #[serde(default, deserialize_with = "null_as_default")]
    total_results: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    results: Vec<SearchHitWire>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchHitWire {
    #[serde(default, deserialize_with = "null_as_default")]
    id: i64,
    title: Option<String>,
    release_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MovieWire {
    title: Option<String>,
    original_title: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    production_countries: Vec<CountryWire>,
    poster_path: Option<String>,
    release_date: Option<String>,
    overview: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    credits: CreditsWire,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CountryWire {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreditsWire {
    #[serde(default, deserialize_with = "null_as_default")]
    cast: Vec<CastWire>,
    #[serde(default, deserialize_with = "null_as_default")]
    crew: Vec<CrewWire>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CastWire {
    #[serde(default, deserialize_with = "null_as_default")]
    id: i64,
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrewWire {
    #[serde(default, deserialize_with = "null_as_default")]
    id: i64,
    name: Option<String>,
    job: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PersonWire {
    #[serde(default, deserialize_with = "null_as_default")]
    id: i64,
    name: Option<String>,
    biography: Option<String>,
    birthday: Option<String>,
}

// =============================================================================
// Decoders
// =============================================================================

/// Poster base URL from a configuration document.
pub fn image_base_url(document: Map<String, Value>) -> serde_json::Result<Option<String>> {
    let wire: ConfigurationWire = decode(document)?;
    Ok(wire.images.secure_base_url.filter(|url| !url.is_empty()))
}

/// Candidate list from a search document.
pub fn search_results(query: &str, document: Map<String, Value>) -> serde_json::Result<SearchResults> {
    let wire: SearchWire = decode(document)?;

    let candidates = wire
        .results
        .into_iter()
        .map(|hit| Candidate {
            tmdb_id: hit.id,
            title: hit.title.unwrap_or_default(),
            release_date: parse_tmdb_date(hit.release_date.as_deref()),
        })
        .collect();

    Ok(SearchResults {
        query: query.to_string(),
        total_results: wire.total_results,
        candidates,
    })
}

/// Fill a movie record from a movie-detail document.
///
/// Fields absent from the document (or `null`) keep their current value.
/// Credits without an id are skipped. The country
/// is always taken from index 1 of `production_countries` and is empty
/// when that entry does not exist.
pub fn apply_movie(record: &mut MovieRecord, document: Map<String, Value>) -> serde_json::Result<()> {
    let wire: MovieWire = decode(document)?;

    if let Some(title) = wire.title {
        record.title = title;
    }
    if let Some(original_title) = wire.original_title {
        record.original_title = original_title;
    }
    record.country = wire
        .production_countries
        .get(1)
        .and_then(|c| c.name.clone())
        .unwrap_or_default();
    if let Some(poster_path) = wire.poster_path {
        record.poster_path = Some(poster_path).filter(|p| !p.is_empty());
    }
    if let Some(date) = parse_tmdb_date(wire.release_date.as_deref()) {
        record.release_date = Some(date);
    }
    if let Some(overview) = wire.overview {
        record.synopsis = overview;
    }

    for cast in wire.credits.cast {
        if cast.id == 0 {
            tracing::trace!(name = ?cast.name, "Cast entry without id skipped");
            continue;
        }
        tracing::trace!(person_id = cast.id, name = ?cast.name, "Actor credit");
        record.add_person(Credit {
            tmdb_id: cast.id,
            name: cast.name.unwrap_or_default(),
            role: PersonRole::Actor,
        });
    }

    for crew in wire.credits.crew {
        let Some(role) = crew.job.as_deref().and_then(PersonRole::from_crew_job) else {
            continue;
        };
        if crew.id == 0 {
            tracing::trace!(name = ?crew.name, %role, "Crew entry without id skipped");
            continue;
        }
        tracing::trace!(person_id = crew.id, name = ?crew.name, %role, "Crew credit");
        record.add_person(Credit {
            tmdb_id: crew.id,
            name: crew.name.unwrap_or_default(),
            role,
        });
    }

    Ok(())
}

/// What happened when a person-detail document was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonOutcome {
    Applied,
    /// The document had no usable `id`.
    MissingId,
    /// The document describes someone else; nothing was applied.
    Mismatch { received: i64 },
}

/// Fill a person record from a person-detail document, but only if the
/// returned id matches the requested one.
pub fn apply_person(
    record: &mut PersonRecord,
    document: Map<String, Value>,
) -> serde_json::Result<PersonOutcome> {
    let wire: PersonWire = decode(document)?;

    if wire.id == 0 {
        return Ok(PersonOutcome::MissingId);
    }
    if wire.id != record.tmdb_id {
        return Ok(PersonOutcome::Mismatch { received: wire.id });
    }

    if let Some(name) = wire.name {
        record.name = name;
    }
    record.biography = wire.biography.unwrap_or_default();
    record.birthday = parse_tmdb_date(wire.birthday.as_deref());

    Ok(PersonOutcome::Applied)
}
