//! Command-line CSV importer for Anki.
//!
//! Reads a CSV file (local or downloaded) and adds or updates notes in a deck,
//! either through AnkiConnect or by writing straight into a collection file.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use anki_csv_engine::{ClientBuilder, Engine, RowIssue};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use config::{ImportConfig, Target};

// ============================================================================
// CLI Arguments
// ============================================================================

/// Import a CSV file into Anki.
///
/// The first CSV row names the note fields (a `tags` column holds
/// space-separated tags). New notes are added; notes whose first field
/// already exists in the deck are updated.
#[derive(Parser, Debug)]
#[command(name = "anki-csv")]
#[command(version, about, long_about = None)]
#[command(group(clap::ArgGroup::new("input").required(true).args(["path", "url"])))]
struct Args {
    /// Path to a local CSV file
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// URL of a remote CSV file
    #[arg(short, long)]
    url: Option<String>,

    /// Deck to import into
    #[arg(short, long)]
    deck: String,

    /// Note type to use
    #[arg(short, long)]
    note: String,

    /// Collection file to write to (with --no-anki-connect)
    #[arg(short, long)]
    col: Option<PathBuf>,

    /// Keep HTML in field values instead of escaping it
    #[arg(long, default_value_t = false)]
    allow_html: bool,

    /// Skip the first row (with --no-anki-connect)
    #[arg(long, default_value_t = false)]
    skip_header: bool,

    /// Write straight into the collection file instead of using AnkiConnect
    #[arg(long, default_value_t = false)]
    no_anki_connect: bool,

    /// AnkiConnect host address
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// AnkiConnect port
    #[arg(long, default_value_t = 8765)]
    port: u16,

    /// AnkiConnect API key
    #[arg(long, env = "ANKICONNECT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// AnkiConnect request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// CSV field delimiter (a single character, or "tab").
    /// Defaults to "," with AnkiConnect; detected from the first line
    /// (tab, ";" or ",") with --no-anki-connect
    #[arg(long)]
    delimiter: Option<String>,

    /// Enable verbose logging (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ============================================================================
// Import
// ============================================================================

fn print_issues(issues: &[RowIssue]) {
    for issue in issues {
        println!("  line {}: {}", issue.line, issue.message);
    }
}

async fn run(config: ImportConfig) -> anki_csv_engine::Result<()> {
    match config.target {
        Target::AnkiConnect {
            url,
            api_key,
            timeout,
        } => {
            let mut builder = ClientBuilder::new().url(&url).timeout(timeout);
            if let Some(key) = api_key {
                builder = builder.api_key(key);
            }
            let engine = Engine::from_client(builder.build());
            info!(anki_url = %url, "Importing through AnkiConnect");

            let report = engine.import_csv(&config.source, &config.options).await?;
            println!(
                "Added {} notes, updated {} notes, skipped {}, failed {}",
                report.added, report.updated, report.skipped, report.failed
            );
            if report.tags_added + report.tags_removed > 0 {
                println!(
                    "Tags: {} added, {} removed",
                    report.tags_added, report.tags_removed
                );
            }
            print_issues(&report.issues);
        }
        Target::Collection(path) => {
            info!(collection = %path.display(), "Importing into collection file");

            let report =
                anki_csv_engine::import_into_collection(&config.source, &path, &config.options)
                    .await?;
            println!(
                "Added {} notes, updated {} notes, skipped {}",
                report.added, report.updated, report.skipped
            );
            print_issues(&report.issues);
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    // Initialize tracing
    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match ImportConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    debug!(source = ?config.source, options = ?config.options, "Parsed arguments");

    let anki_url = match &config.target {
        Target::AnkiConnect { url, .. } => Some(url.clone()),
        Target::Collection(_) => None,
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_connection_refused() => {
            eprintln!(
                "Error: could not connect to AnkiConnect at {}. \
                 Is Anki running with the AnkiConnect add-on installed?",
                anki_url.as_deref().unwrap_or("the configured address")
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
