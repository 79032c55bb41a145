//! Integration tests for the fetch command wiring.

use reelshelf::cli::{Cli, Command};
use reelshelf::config::{Config, SelectionMode};
use reelshelf::error::AppError;
use reelshelf::services;
use tempfile::TempDir;
use tmdb_fetch::MetadataFetcher;

fn fetch_args(argv: &[&str]) -> reelshelf::cli::FetchArgs {
    use clap::Parser;
    let Command::Fetch(args) = Cli::try_parse_from(argv).unwrap().command;
    args
}

fn config_with_key(dir: &TempDir) -> Config {
    let path = dir.path().join("reelshelf.toml");
    std::fs::write(
        &path,
        format!(
            "[tmdb]\napi_key = \"test-key\"\n\n[fetch]\nposter_dir = \"{}\"\nselection = \"first\"\n",
            dir.path().join("posters").display()
        ),
    )
    .unwrap();
    Config::load_from(path.to_str().unwrap()).unwrap()
}

#[test]
fn test_config_file_feeds_fetcher_settings() {
    let dir = TempDir::new().unwrap();
    let config = config_with_key(&dir);

    assert_eq!(config.fetch.selection, SelectionMode::First);
    let fetcher_config = config.to_fetcher_config().unwrap();
    assert_eq!(fetcher_config.poster_dir, dir.path().join("posters"));
    assert_eq!(fetcher_config.api_base_url, "https://api.themoviedb.org/3");
}

#[test]
fn test_missing_key_refuses_job() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.toml");
    std::fs::write(&path, "[fetch]\nfetch_people = false\n").unwrap();

    let config = Config::load_from(path.to_str().unwrap()).unwrap();
    let err = config.to_fetcher_config().unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_cancelled_fetcher_yields_partial_report() {
    let dir = TempDir::new().unwrap();
    let config = config_with_key(&dir);
    let args = fetch_args(&["reelshelf", "fetch", "Heat", "Alien", "--no-people"]);

    let fetcher = MetadataFetcher::new_shared(config.to_fetcher_config().unwrap()).unwrap();
    fetcher.cancel();

    let report = reelshelf::run_fetch(&config, &args, fetcher).await.unwrap();

    assert!(report.cancelled);
    assert!(report.resolved.is_empty());
    assert!(report.unresolved.is_empty());

    let output = dir.path().join("report.json");
    services::write_report(&report, Some(&output)).await.unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(json["cancelled"], true);
}
