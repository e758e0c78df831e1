//! Validated import settings built from the command line.

use std::path::PathBuf;
use std::time::Duration;

use anki_csv_engine::{CsvSource, ImportOptions};
use tracing::warn;

use crate::Args;

/// Problems with the command-line arguments.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Neither or both of `--path` and `--url` were given.
    #[error("exactly one of --path or --url is required")]
    InputRequired,

    /// Direct mode without a collection file.
    #[error("--no-anki-connect requires --col <PATH>")]
    CollectionRequired,

    /// The delimiter is not a single ASCII character.
    #[error("invalid delimiter '{0}': expected a single ASCII character or 'tab'")]
    InvalidDelimiter(String),

    /// The deck or note type name is blank.
    #[error("--{0} must not be empty")]
    EmptyName(&'static str),

    /// The CSV URL is not usable.
    #[error(transparent)]
    Source(#[from] anki_csv_engine::Error),
}

/// Where notes are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A running Anki through AnkiConnect.
    AnkiConnect {
        /// AnkiConnect base URL.
        url: String,
        /// Optional API key.
        api_key: Option<String>,
        /// Request timeout.
        timeout: Duration,
    },
    /// A collection file on disk.
    Collection(PathBuf),
}

/// Everything an import run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    pub source: CsvSource,
    pub target: Target,
    pub options: ImportOptions,
}

impl ImportConfig {
    /// Validate parsed arguments.
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let source = match (&args.path, &args.url) {
            (Some(path), None) => CsvSource::local(path),
            (None, Some(url)) => CsvSource::remote(url)?,
            _ => return Err(ConfigError::InputRequired),
        };

        if args.deck.trim().is_empty() {
            return Err(ConfigError::EmptyName("deck"));
        }
        if args.note.trim().is_empty() {
            return Err(ConfigError::EmptyName("note"));
        }

        let target = if args.no_anki_connect {
            let col = args.col.clone().ok_or(ConfigError::CollectionRequired)?;
            Target::Collection(col)
        } else {
            if args.col.is_some() {
                warn!("--col is only used with --no-anki-connect, ignoring it");
            }
            if args.skip_header {
                warn!("--skip-header is only used with --no-anki-connect, the first row always names the fields");
            }
            Target::AnkiConnect {
                url: format!("http://{}:{}", args.host, args.port),
                api_key: args.api_key.clone(),
                timeout: Duration::from_secs(args.timeout),
            }
        };

        let mut options = ImportOptions::new(&args.deck, &args.note)
            .allow_html(args.allow_html)
            .skip_header(args.skip_header);
        if let Some(raw) = &args.delimiter {
            options = options.delimiter(parse_delimiter(raw)?);
        }

        Ok(Self {
            source,
            target,
            options,
        })
    }
}

/// Parse a delimiter argument: one ASCII character, `\t` or `tab`.
pub fn parse_delimiter(raw: &str) -> Result<u8, ConfigError> {
    match raw {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        _ => match raw.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(ConfigError::InvalidDelimiter(raw.to_string())),
        },
    }
}
