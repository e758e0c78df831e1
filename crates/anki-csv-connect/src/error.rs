//! Error types for AnkiConnect calls.
//!
//! The ones a CSV import usually runs into:
//!
//! - [`Error::ConnectionRefused`]: Anki is not running or AnkiConnect is not installed
//! - [`Error::AnkiConnect`]: the action failed (model not found, bad query, ...)
//! - [`Error::PermissionDenied`]: an API key is required or was wrong
//!
//! # Example
//!
//! ```no_run
//! use anki_csv_connect::{AnkiClient, Error};
//!
//! # async fn example() {
//! let client = AnkiClient::new();
//!
//! match client.decks().names().await {
//!     Ok(decks) => println!("Found {} decks", decks.len()),
//!     Err(Error::ConnectionRefused) => {
//!         eprintln!("Please start Anki with AnkiConnect installed");
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! # }
//! ```

use thiserror::Error;

/// The error type for AnkiConnect operations.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP/network error from reqwest other than a refused connection.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// AnkiConnect returned an error message.
    ///
    /// Common messages include:
    /// - "cannot create note because it is a duplicate"
    /// - "deck was not found"
    /// - "model was not found"
    #[error("AnkiConnect error: {0}")]
    AnkiConnect(String),

    /// The response had neither a result nor an error.
    #[error("AnkiConnect returned empty response")]
    EmptyResponse,

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Connection refused, Anki is likely not running.
    #[error("Could not connect to Anki. Is Anki running with AnkiConnect installed?")]
    ConnectionRefused,

    /// Permission denied by AnkiConnect.
    #[error("Permission denied. Request permission first or check API key.")]
    PermissionDenied,
}

/// A specialized Result type for AnkiConnect operations.
pub type Result<T> = std::result::Result<T, Error>;
