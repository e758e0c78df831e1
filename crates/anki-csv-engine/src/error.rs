//! Error types for anki-csv-engine.
//!
//! Errors fall into three groups:
//!
//! 1. **Client errors**: wrapped from [`anki_csv_connect::Error`]
//! 2. **Input errors**: the CSV could not be fetched or parsed
//! 3. **Collection errors**: the collection file could not be read or written
//!
//! # Example
//!
//! ```no_run
//! use anki_csv_engine::{CsvSource, Error};
//!
//! # async fn example() {
//! match CsvSource::local("cards.csv").fetch().await {
//!     Ok(file) => println!("reading {}", file.path().display()),
//!     Err(Error::InputNotFound(path)) => eprintln!("no such file: {}", path.display()),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;

/// Result type for anki-csv-engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while importing a CSV file.
#[derive(Debug)]
pub enum Error {
    /// An error from the AnkiConnect client.
    Client(anki_csv_connect::Error),

    /// The local CSV file does not exist.
    InputNotFound(PathBuf),

    /// The remote CSV location is not a usable URL.
    InvalidUrl(String),

    /// Downloading the remote CSV failed.
    Download(reqwest::Error),

    /// The CSV could not be parsed.
    Csv(csv::Error),

    /// The CSV has no header row.
    EmptyCsv,

    /// A header name appears more than once.
    DuplicateColumn(String),

    /// A header name is empty.
    EmptyColumnName {
        /// Zero-based column position.
        column: usize,
    },

    /// The note type does not exist.
    ModelNotFound(String),

    /// A CSV column does not name a field of the note type.
    UnknownField {
        /// The model name.
        model: String,
        /// The offending column name.
        field: String,
    },

    /// AnkiConnect answered with something other than what the action promises.
    UnexpectedResponse(String),

    /// The collection uses a schema this tool cannot write.
    UnsupportedSchema(i64),

    /// The collection's stored data is not in the expected shape.
    Collection(String),

    /// A SQLite error.
    #[cfg(feature = "collection")]
    Sqlite(rusqlite::Error),

    /// A JSON error.
    Json(serde_json::Error),

    /// An I/O error.
    Io(std::io::Error),
}

impl Error {
    /// Whether this error means AnkiConnect could not be reached.
    pub fn is_connection_refused(&self) -> bool {
        matches!(
            self,
            Error::Client(anki_csv_connect::Error::ConnectionRefused)
        )
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Client(e) => Some(e),
            Error::Download(e) => Some(e),
            Error::Csv(e) => Some(e),
            #[cfg(feature = "collection")]
            Error::Sqlite(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Client(e) => write!(f, "{}", e),
            Error::InputNotFound(path) => write!(f, "CSV file not found: {}", path.display()),
            Error::InvalidUrl(msg) => write!(f, "invalid CSV URL: {}", msg),
            Error::Download(e) => write!(f, "failed to download CSV: {}", e),
            Error::Csv(e) => write!(f, "CSV error: {}", e),
            Error::EmptyCsv => write!(f, "CSV file is empty, expected a header row"),
            Error::DuplicateColumn(name) => write!(f, "duplicate CSV column: {}", name),
            Error::EmptyColumnName { column } => {
                write!(f, "CSV column {} has an empty header", column + 1)
            }
            Error::ModelNotFound(name) => write!(f, "note type not found: {}", name),
            Error::UnknownField { model, field } => {
                write!(f, "note type '{}' has no field '{}'", model, field)
            }
            Error::UnexpectedResponse(msg) => write!(f, "unexpected AnkiConnect response: {}", msg),
            Error::UnsupportedSchema(ver) => write!(
                f,
                "collection schema version {} is not supported for direct import; \
                 use AnkiConnect mode instead",
                ver
            ),
            Error::Collection(msg) => write!(f, "malformed collection: {}", msg),
            #[cfg(feature = "collection")]
            Error::Sqlite(e) => write!(f, "SQLite error: {}", e),
            Error::Json(e) => write!(f, "JSON error: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl From<anki_csv_connect::Error> for Error {
    fn from(err: anki_csv_connect::Error) -> Self {
        Error::Client(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Csv(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

#[cfg(feature = "collection")]
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Sqlite(err)
    }
}
