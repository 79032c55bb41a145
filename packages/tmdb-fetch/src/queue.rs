//! Fetch queue driver.
//!
//! Feeds titles through the fetcher one at a time: search, pick a candidate,
//! resolve the movie, then every credited person. When the queue drains a
//! single `JobDone` event fires and the job returns its report.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::{FetchError, Result};
use crate::events::FetchEvent;
use crate::fetcher::MetadataFetcher;
use crate::records::{Candidate, MovieRecord, PersonRecord, SearchResults};

// =============================================================================
// Candidate Selection
// =============================================================================

/// Picks one candidate out of a search result, or none.
#[async_trait]
pub trait CandidateChooser: Send + Sync {
    async fn choose(&self, results: &SearchResults) -> Option<Candidate>;
}

/// Always takes the first candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstCandidate;

#[async_trait]
impl CandidateChooser for FirstCandidate {
    async fn choose(&self, results: &SearchResults) -> Option<Candidate> {
        results.candidates.first().cloned()
    }
}

/// Prefers a case-insensitive exact title match, then a year match, then
/// the first candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleMatch {
    year: Option<i32>,
}

impl TitleMatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Synchronous selection, shared with callers that wrap this policy.
    pub fn pick(&self, results: &SearchResults) -> Option<Candidate> {
        let query = results.query.trim().to_lowercase();
        let exact: Vec<&Candidate> = results
            .candidates
            .iter()
            .filter(|c| c.title.trim().to_lowercase() == query)
            .collect();

        if let Some(year) = self.year {
            if let Some(found) = exact.iter().find(|c| c.year() == Some(year)) {
                return Some((*found).clone());
            }
            if let Some(found) = results.candidates.iter().find(|c| c.year() == Some(year)) {
                return Some(found.clone());
            }
        }

        exact
            .first()
            .map(|c| (*c).clone())
            .or_else(|| results.candidates.first().cloned())
    }
}

#[async_trait]
impl CandidateChooser for TitleMatch {
    async fn choose(&self, results: &SearchResults) -> Option<Candidate> {
        self.pick(results)
    }
}

// =============================================================================
// Report
// =============================================================================

/// A title that went through the whole pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedMovie {
    pub query: String,
    pub movie: MovieRecord,
    pub people: Vec<PersonRecord>,
}

/// A title that could not be matched.
#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedTitle {
    pub query: String,
    pub reason: String,
}

/// Outcome of one fetch job.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobReport {
    pub resolved: Vec<ResolvedMovie>,
    pub unresolved: Vec<UnresolvedTitle>,
    /// The job stopped early because the fetcher was cancelled.
    pub cancelled: bool,
}

enum Outcome {
    Resolved(ResolvedMovie),
    Unresolved(UnresolvedTitle),
}

// =============================================================================
// Queue
// =============================================================================

/// Appends titles to a running job.
#[derive(Debug, Clone)]
pub struct QueueHandle {
    tx: mpsc::UnboundedSender<Vec<String>>,
}

impl QueueHandle {
    /// Queue more titles.
    ///
    /// Returns `false` once the job has stopped taking titles. A title
    /// accepted here is always processed unless the job is cancelled.
    pub fn enqueue<I, S>(&self, titles: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tx
            .send(titles.into_iter().map(Into::into).collect())
            .is_ok()
    }
}

/// A fetch job: an ordered queue of titles.
pub struct FetchQueue {
    fetcher: Arc<MetadataFetcher>,
    chooser: Arc<dyn CandidateChooser>,
    pending: VecDeque<String>,
    incoming_tx: mpsc::UnboundedSender<Vec<String>>,
    incoming_rx: mpsc::UnboundedReceiver<Vec<String>>,
    fetch_people: bool,
}

impl FetchQueue {
    pub fn new(fetcher: Arc<MetadataFetcher>, chooser: Arc<dyn CandidateChooser>) -> Self {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        Self {
            fetcher,
            chooser,
            pending: VecDeque::new(),
            incoming_tx,
            incoming_rx,
            fetch_people: true,
        }
    }

    /// Whether to resolve each credited person after the movie.
    pub fn fetch_people(mut self, enabled: bool) -> Self {
        self.fetch_people = enabled;
        self
    }

    pub fn enqueue<I, S>(&mut self, titles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.extend(titles.into_iter().map(Into::into));
    }

    /// Handle for adding titles after `run` has taken the queue.
    pub fn handle(&self) -> QueueHandle {
        QueueHandle {
            tx: self.incoming_tx.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Process titles until the queue is empty or the fetcher is cancelled.
    pub async fn run(mut self) -> Result<JobReport> {
        let mut report = JobReport::default();

        tracing::info!(titles = self.pending.len(), "Fetch job started");

        if !self.fetcher.is_initialized() {
            match self.fetcher.initialize().await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!("Configuration request failed, using default poster base URL")
                }
                Err(FetchError::Cancelled) => {
                    report.cancelled = true;
                    return Ok(report);
                }
                Err(e) => return Err(e),
            }
        }

        loop {
            while let Ok(titles) = self.incoming_rx.try_recv() {
                self.pending.extend(titles);
            }

            let Some(title) = self.pending.pop_front() else {
                // Refuse new titles, then pick up anything sent before the close.
                self.incoming_rx.close();
                while let Ok(titles) = self.incoming_rx.try_recv() {
                    self.pending.extend(titles);
                }
                if self.pending.is_empty() {
                    break;
                }
                continue;
            };

            match self.process(&title).await {
                Ok(Outcome::Resolved(resolved)) => {
                    self.fetcher.emit(FetchEvent::MovieResolved {
                        query: resolved.query.clone(),
                        movie: resolved.movie.clone(),
                    });
                    report.resolved.push(resolved);
                }
                Ok(Outcome::Unresolved(unresolved)) => {
                    tracing::info!(query = %unresolved.query, reason = %unresolved.reason, "Title unresolved");
                    self.fetcher.emit(FetchEvent::TitleUnresolved {
                        query: unresolved.query.clone(),
                        reason: unresolved.reason.clone(),
                    });
                    report.unresolved.push(unresolved);
                }
                Err(FetchError::Cancelled) => {
                    tracing::info!(query = %title, "Fetch job cancelled");
                    report.cancelled = true;
                    return Ok(report);
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            resolved = report.resolved.len(),
            unresolved = report.unresolved.len(),
            "Fetch job done"
        );
        self.fetcher.emit(FetchEvent::JobDone {
            resolved: report.resolved.len(),
            unresolved: report.unresolved.len(),
        });

        Ok(report)
    }

    async fn process(&self, title: &str) -> Result<Outcome> {
        let unresolved = |reason: &str| {
            Outcome::Unresolved(UnresolvedTitle {
                query: title.to_string(),
                reason: reason.to_string(),
            })
        };

        let Some(results) = self.fetcher.search(title).await? else {
            return Ok(unresolved("search failed"));
        };

        if results.candidates.is_empty() {
            return Ok(unresolved("no candidates"));
        }

        // Interactive choosers may wait indefinitely.
        let cancel = self.fetcher.cancellation_token();
        let choice = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            choice = self.chooser.choose(&results) => choice,
        };

        let Some(candidate) = choice else {
            return Ok(unresolved("no candidate selected"));
        };

        tracing::debug!(query = %title, movie_id = candidate.tmdb_id, "Candidate chosen");

        let movie = self.fetcher.movie_for(&candidate).await?;

        let mut people = Vec::new();
        if self.fetch_people {
            let mut seen = HashSet::new();
            for credit in &movie.people {
                // Someone credited twice (e.g. director and producer) is fetched once.
                if !seen.insert(credit.tmdb_id) {
                    continue;
                }
                let person = self.fetcher.person(PersonRecord::from_credit(credit)).await?;
                people.push(person);
            }
        }

        Ok(Outcome::Resolved(ResolvedMovie {
            query: title.to_string(),
            movie,
            people,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn candidate(id: i64, title: &str, date: Option<(i32, u32, u32)>) -> Candidate {
        Candidate {
            tmdb_id: id,
            title: title.to_string(),
            release_date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        }
    }

    fn results(query: &str, candidates: Vec<Candidate>) -> SearchResults {
        SearchResults {
            query: query.to_string(),
            total_results: candidates.len() as i64,
            candidates,
        }
    }

    #[tokio::test]
    async fn test_first_candidate() {
        let r = results(
            "alien",
            vec![candidate(2, "Aliens", None), candidate(1, "Alien", None)],
        );
        assert_eq!(FirstCandidate.choose(&r).await.unwrap().tmdb_id, 2);
        assert!(FirstCandidate.choose(&results("x", vec![])).await.is_none());
    }

    #[test]
    fn test_title_match_prefers_exact_title() {
        let r = results(
            "Alien",
            vec![candidate(2, "Aliens", None), candidate(1, "alien", None)],
        );
        assert_eq!(TitleMatch::new().pick(&r).unwrap().tmdb_id, 1);
    }

    #[test]
    fn test_title_match_uses_year_between_remakes() {
        let r = results(
            "Dune",
            vec![
                candidate(438631, "Dune", Some((2021, 9, 15))),
                candidate(841, "Dune", Some((1984, 12, 14))),
            ],
        );
        assert_eq!(TitleMatch::new().pick(&r).unwrap().tmdb_id, 438631);
        assert_eq!(TitleMatch::new().year(1984).pick(&r).unwrap().tmdb_id, 841);
    }

    #[test]
    fn test_title_match_falls_back_to_first() {
        let r = results("Something", vec![candidate(7, "Other", None)]);
        assert_eq!(TitleMatch::new().pick(&r).unwrap().tmdb_id, 7);
    }
}
