//! Job report output.

use std::path::Path;
use tokio::io::AsyncWriteExt;

use tmdb_fetch::JobReport;

use crate::error::Result;

/// Pretty JSON for a finished (or cancelled) job.
pub fn render(report: &JobReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write the report to `path`, or stdout when no path is given.
pub async fn write_report(report: &JobReport, path: Option<&Path>) -> Result<()> {
    let mut json = render(report)?;
    json.push('\n');

    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, json).await?;
            tracing::info!(path = %path.display(), "Report written");
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(json.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmdb_fetch::{MovieRecord, ResolvedMovie, UnresolvedTitle};

    fn report() -> JobReport {
        JobReport {
            resolved: vec![ResolvedMovie {
                query: "Heat".to_string(),
                movie: MovieRecord::new("Heat", 949),
                people: Vec::new(),
            }],
            unresolved: vec![UnresolvedTitle {
                query: "Nope".to_string(),
                reason: "no candidates".to_string(),
            }],
            cancelled: false,
        }
    }

    #[test]
    fn test_render_report() {
        let json: serde_json::Value = serde_json::from_str(&render(&report()).unwrap()).unwrap();
        assert_eq!(json["resolved"][0]["query"], "Heat");
        assert_eq!(json["resolved"][0]["movie"]["tmdb_id"], 949);
        assert_eq!(json["unresolved"][0]["reason"], "no candidates");
        assert_eq!(json["cancelled"], false);
    }

    #[test]
    fn test_write_report_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out").join("report.json");

        tokio_test::block_on(write_report(&report(), Some(&path))).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.ends_with('\n'));
        let json: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(json["unresolved"][0]["query"], "Nope");
    }
}
