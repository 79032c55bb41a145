//! Command-line interface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{SelectionMode, DEFAULT_CONFIG_FILE};

#[derive(Debug, Parser)]
#[command(name = "reelshelf", version, about = "Fetch movie metadata and posters from TMDB")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve titles into movie, cast and crew records
    Fetch(FetchArgs),
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Titles to look up, processed in order
    #[arg(required = true)]
    pub titles: Vec<String>,

    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Candidate selection, overrides `fetch.selection`
    #[arg(long, value_enum)]
    pub select: Option<SelectionMode>,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Skip person detail requests
    #[arg(long)]
    pub no_people: bool,

    /// Prefer candidates released in this year
    #[arg(long)]
    pub year: Option<i32>,
}
