/// Triage feed scraper entry point.
///
/// One-shot CLI: parse arguments, build the API client, run a single
/// subcommand, exit. Everything is sequential, one request in flight at a
/// time, so the runtime is pinned to the current thread.
mod cli;
mod commands;
mod scrape;
mod state;

use clap::Parser;
use tracing::{debug, error};

use cli::{default_user_agent, Cli, Command};
use triage_client::TriageClient;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load .env file
    dotenvy::dotenv().ok();

    let args = Cli::parse();

    // Init tracing; --debug raises our crates to debug unless RUST_LOG is set
    let default_filter = if args.debug {
        "triage_cli=debug,triage_client=debug"
    } else {
        "triage_cli=info,triage_client=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    if let Err(e) = run(args).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Cli) -> anyhow::Result<()> {
    let user_agent = args.user_agent.clone().unwrap_or_else(default_user_agent);
    debug!("using User-Agent string: {}", user_agent);

    let access_key = args.access_key.as_deref().unwrap_or("");
    let client = TriageClient::new(access_key, &user_agent)?;

    match &args.command {
        Command::Feed(feed_args) => commands::feed(&client, feed_args).await,
        Command::Report(report_args) => commands::report(&client, report_args).await,
        Command::Download(download_args) => commands::download(&client, download_args).await,
        Command::Scrape(scrape_args) => {
            let count = scrape::run(&client, scrape_args).await?;
            println!("{count} new sample(s)");
            Ok(())
        }
    }
}
