mod report;
mod sync;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use bb_client::BbClient;
use clap::{Parser, ValueEnum};
use sheets_client::{Authenticator, SheetsClient};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "deqp-stats",
    about = "Collect dEQP test statistics from the CI bots and publish them to a tracking spreadsheet",
    version
)]
struct Args {
    /// Directory holding credentials.json and the cached token.json
    /// (default: <home>/.auth)
    #[arg(long = "auth_path", value_name = "DIR")]
    auth_path: Option<PathBuf>,

    /// ID of the spreadsheet to write stats to
    #[arg(long, default_value = "1D6Yh7dAPP-aYLbX3HHQD8WubJV9XPuxvkKowmn2qhIw")]
    spreadsheet: String,

    /// Verbosity of output
    #[arg(long, value_enum, ignore_case = true, default_value = "info")]
    verbosity: Verbosity,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Verbosity {
    Debug,
    Info,
    Warning,
    Error,
}

impl Verbosity {
    fn level(self) -> tracing::Level {
        match self {
            Verbosity::Debug => tracing::Level::DEBUG,
            Verbosity::Info => tracing::Level::INFO,
            Verbosity::Warning => tracing::Level::WARN,
            Verbosity::Error => tracing::Level::ERROR,
        }
    }
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(args.verbosity.level().into()),
        )
        .with_target(false)
        .init();

    if let Err(e) = run(args) {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let auth_dir = match args.auth_path {
        Some(path) => path,
        None => home::home_dir()
            .context("home directory not found: set HOME environment variable")?
            .join(".auth"),
    };

    let authenticator = Authenticator::new(&auth_dir)?;
    let token = authenticator
        .obtain_token(prompt_for_consent)
        .context("could not obtain sheets credentials")?;

    let bb = BbClient::new()?;

    info!("building reports...");
    let reports = report::gather_reports(&bb, &report::BOT_NAMES);

    info!("updating sheets...");
    let sheets = SheetsClient::new(args.spreadsheet.clone(), token.access_token)?;
    sync::update_spreadsheet(&sheets, &reports).context("could not update spreadsheet")?;

    info!(
        "stats successfully written to https://docs.google.com/spreadsheets/d/{}",
        args.spreadsheet
    );
    Ok(())
}

fn prompt_for_consent(url: &str) -> sheets_client::Result<String> {
    println!("Open this URL in a browser, approve access, then paste the redirect URL or code:");
    println!("\n  {url}\n");
    print!("> ");
    std::io::stdout().flush()?;
    let mut reply = String::new();
    std::io::stdin().read_line(&mut reply)?;
    Ok(reply)
}
