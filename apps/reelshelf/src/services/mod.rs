//! Services wired around the fetch pipeline.

pub mod progress;
pub mod prompt;
pub mod report;

use std::sync::Arc;

use tmdb_fetch::{CandidateChooser, FirstCandidate, TitleMatch};

use crate::config::SelectionMode;

pub use progress::spawn_event_logger;
pub use prompt::PromptChooser;
pub use report::write_report;

/// Chooser for a selection mode. `year` only affects automatic selection.
pub fn chooser_for(mode: SelectionMode, year: Option<i32>) -> Arc<dyn CandidateChooser> {
    match mode {
        SelectionMode::Auto => {
            let policy = match year {
                Some(year) => TitleMatch::new().year(year),
                None => TitleMatch::new(),
            };
            Arc::new(policy)
        }
        SelectionMode::Prompt => Arc::new(PromptChooser::new()),
        SelectionMode::First => Arc::new(FirstCandidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tmdb_fetch::{Candidate, SearchResults};

    fn remakes() -> SearchResults {
        SearchResults {
            query: "Dune".to_string(),
            total_results: 3,
            candidates: vec![
                Candidate {
                    tmdb_id: 1,
                    title: "Dune: Part Two".to_string(),
                    release_date: NaiveDate::from_ymd_opt(2024, 2, 27),
                },
                Candidate {
                    tmdb_id: 438631,
                    title: "Dune".to_string(),
                    release_date: NaiveDate::from_ymd_opt(2021, 9, 15),
                },
                Candidate {
                    tmdb_id: 841,
                    title: "Dune".to_string(),
                    release_date: NaiveDate::from_ymd_opt(1984, 12, 14),
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_auto_selection_uses_year() {
        let chooser = chooser_for(SelectionMode::Auto, Some(1984));
        assert_eq!(chooser.choose(&remakes()).await.unwrap().tmdb_id, 841);

        let chooser = chooser_for(SelectionMode::Auto, None);
        assert_eq!(chooser.choose(&remakes()).await.unwrap().tmdb_id, 438631);
    }

    #[tokio::test]
    async fn test_first_selection_ignores_year() {
        let chooser = chooser_for(SelectionMode::First, Some(1984));
        assert_eq!(chooser.choose(&remakes()).await.unwrap().tmdb_id, 1);
    }
}
