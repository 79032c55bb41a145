//! Interactive candidate selection on the terminal.

use async_trait::async_trait;
use dialoguer::console::Term;
use dialoguer::Select;

use tmdb_fetch::{Candidate, CandidateChooser, SearchResults};

/// Trailing menu entry that leaves the title unresolved.
pub const SKIP_LABEL: &str = "Skip";

/// Lists candidates in a select menu on stderr.
///
/// Enter picks the highlighted entry (the first candidate by default).
/// `Skip`, Esc or `q` leave the title unresolved. Stdout stays free for
/// the report.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptChooser;

impl PromptChooser {
    pub fn new() -> Self {
        Self
    }
}

/// One menu line: `Title (year) [id]`, with `????` for an unknown year.
pub fn candidate_label(candidate: &Candidate) -> String {
    let year = candidate
        .year()
        .map(|y| y.to_string())
        .unwrap_or_else(|| "????".to_string());
    format!("{} ({}) [{}]", candidate.title, year, candidate.tmdb_id)
}

/// Menu entries: every candidate in order, then [`SKIP_LABEL`].
pub fn menu_labels(results: &SearchResults) -> Vec<String> {
    results
        .candidates
        .iter()
        .map(candidate_label)
        .chain(std::iter::once(SKIP_LABEL.to_string()))
        .collect()
}

/// Map a menu answer back to a candidate. The skip entry and an aborted
/// menu both mean no candidate.
pub fn selected(results: &SearchResults, answer: Option<usize>) -> Option<Candidate> {
    answer.and_then(|index| results.candidates.get(index).cloned())
}

#[async_trait]
impl CandidateChooser for PromptChooser {
    async fn choose(&self, results: &SearchResults) -> Option<Candidate> {
        let labels = menu_labels(results);
        let prompt = format!(
            "{} result(s) for \"{}\"",
            results.candidates.len(),
            results.query
        );

        // The menu blocks on the terminal; keep it off the runtime so a
        // cancelled job is not held up by it.
        let answer = tokio::task::spawn_blocking(move || {
            Select::new()
                .with_prompt(prompt)
                .items(&labels)
                .default(0)
                .interact_on_opt(&Term::stderr())
        })
        .await;

        match answer {
            Ok(Ok(answer)) => selected(results, answer),
            Ok(Err(e)) => {
                tracing::warn!(query = %results.query, error = %e, "Prompt failed, skipping title");
                None
            }
            Err(e) => {
                tracing::warn!(query = %results.query, error = %e, "Prompt task failed, skipping title");
                None
            }
        }
    }
}
