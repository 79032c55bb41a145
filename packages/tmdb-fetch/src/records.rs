//! In-flight records produced by the pipeline.
//!
//! A record is created at the start of a pipeline pass, filled in as each
//! response arrives, and handed to the caller at a completion point.

use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;

/// Date format used by every TMDb date field.
pub const TMDB_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a TMDb `yyyy-MM-dd` date, treating blanks and garbage as absent.
pub fn parse_tmdb_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, TMDB_DATE_FORMAT).ok()
}

/// Role a person plays in a movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonRole {
    Actor,
    Director,
    Producer,
}

impl PersonRole {
    /// Map a crew `job` string to a role.
    ///
    /// Only the exact strings `"Director"` and `"Producer"` qualify;
    /// `"Co-Producer"`, `"director"` and every other job are ignored.
    pub fn from_crew_job(job: &str) -> Option<Self> {
        match job {
            "Director" => Some(Self::Director),
            "Producer" => Some(Self::Producer),
            _ => None,
        }
    }
}

impl std::fmt::Display for PersonRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Actor => write!(f, "actor"),
            Self::Director => write!(f, "director"),
            Self::Producer => write!(f, "producer"),
        }
    }
}

/// A person attached to a movie by the movie-detail response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credit {
    pub tmdb_id: i64,
    pub name: String,
    pub role: PersonRole,
}

/// Provisional search result awaiting disambiguation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub tmdb_id: i64,
    pub title: String,
    pub release_date: Option<NaiveDate>,
}

impl Candidate {
    /// Release year, if the date parsed.
    pub fn year(&self) -> Option<i32> {
        use chrono::Datelike;
        self.release_date.map(|d| d.year())
    }
}

/// Candidates returned by one title search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    /// The title that was searched for.
    pub query: String,
    /// `total_results` as reported by the service (may exceed one page).
    pub total_results: i64,
    pub candidates: Vec<Candidate>,
}

/// The movie currently being enriched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MovieRecord {
    pub title: String,
    pub original_title: String,
    pub tmdb_id: Option<i64>,
    pub poster_path: Option<String>,
    /// Local file the poster was written to, once downloaded.
    pub poster_file: Option<PathBuf>,
    pub synopsis: String,
    pub release_date: Option<NaiveDate>,
    pub country: String,
    pub people: Vec<Credit>,
}

impl MovieRecord {
    /// Start a fresh record for a chosen candidate.
    pub fn new(title: impl Into<String>, tmdb_id: i64) -> Self {
        Self {
            title: title.into(),
            tmdb_id: Some(tmdb_id),
            ..Default::default()
        }
    }

    pub fn add_person(&mut self, credit: Credit) {
        self.people.push(credit);
    }

    /// People with the given role, in response order.
    pub fn people_with_role(&self, role: PersonRole) -> impl Iterator<Item = &Credit> {
        self.people.iter().filter(move |c| c.role == role)
    }
}

/// The person currently being resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonRecord {
    pub tmdb_id: i64,
    pub role: PersonRole,
    pub name: String,
    pub biography: String,
    pub birthday: Option<NaiveDate>,
}

impl PersonRecord {
    /// Start a scratch record for a credit; the name is kept until the
    /// detail response overrides it.
    pub fn from_credit(credit: &Credit) -> Self {
        Self {
            tmdb_id: credit.tmdb_id,
            role: credit.role,
            name: credit.name.clone(),
            biography: String::new(),
            birthday: None,
        }
    }
}
