/// Command-line definitions for the scraper binary.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Feed scraper and sample downloader for the Hatching Triage sandbox API.
#[derive(Parser)]
#[command(name = "triage-scraper", version)]
pub struct Cli {
    /// API access key (falls back to the environment).
    #[arg(
        long,
        global = true,
        env = "HATCHING_TRIAGE_ACCESS_KEY",
        hide_env_values = true
    )]
    pub access_key: Option<String>,

    /// Enable debug logging.
    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    /// Override the User-Agent header sent with every request.
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the most recent feed entries.
    Feed(FeedArgs),

    /// Fetch a sample's static report and print it as JSON.
    Report(ReportArgs),

    /// Download a single sample, stored under its SHA-256 digest.
    Download(DownloadArgs),

    /// Mirror new feed samples into a local directory.
    Scrape(ScrapeArgs),
}

#[derive(Parser)]
pub struct FeedArgs {
    /// Only list samples owned by the authenticated account.
    #[arg(long, short = 'o', default_value_t = false)]
    pub owned: bool,
}

#[derive(Parser)]
pub struct ReportArgs {
    /// Sample identifier (copy it from the report URL).
    pub sample_id: String,
}

#[derive(Parser)]
pub struct DownloadArgs {
    /// Sample identifier (copy it from the report URL).
    pub sample_id: String,

    /// Directory the sample file is written into.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}

#[derive(Parser)]
pub struct ScrapeArgs {
    /// Existing directory the mirror lives in.
    pub target_dir: PathBuf,

    /// Stop after this many previously unseen samples.
    #[arg(long, default_value_t = 10)]
    pub max_new_sample_count: usize,

    /// Process the whole feed even past the last recorded scrape time.
    #[arg(long, default_value_t = false)]
    pub ignore_last_scrape_date: bool,
}

/// User-Agent sent when the user does not override it.
pub fn default_user_agent() -> String {
    format!(
        "triage-scraper/{} (reqwest) {}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    )
}
