//! CSV import workflows for Anki.
//!
//! This crate turns a CSV file into Anki notes, either through the
//! [`anki_csv_connect`] client (Anki running with AnkiConnect) or by writing
//! directly into a collection file.
//!
//! # Quick Start
//!
//! ```no_run
//! use anki_csv_engine::{CsvSource, Engine, ImportOptions};
//!
//! # async fn example() -> anki_csv_engine::Result<()> {
//! let engine = Engine::new();
//!
//! let source = CsvSource::local("cards.csv");
//! let options = ImportOptions::new("Spanish", "Basic");
//! let report = engine.import_csv(&source, &options).await?;
//! println!("Added: {}, Updated: {}", report.added, report.updated);
//!
//! // Direct client access when needed
//! let version = engine.client().misc().version().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - `collection` (default) - Import straight into a collection file with
//!   SQLite, without Anki running

mod error;

#[cfg(feature = "collection")]
pub mod collection;

pub mod import;
pub mod mapping;
pub mod source;
pub mod sync;
pub mod table;
pub mod tags;

pub use error::{Error, Result};

pub use import::ImportOptions;
pub use mapping::{NoteMapper, PreparedNote, RowIssue};
pub use source::{CsvSource, FetchedCsv};
pub use sync::SyncReport;
pub use table::{CsvOptions, CsvTable};

#[cfg(feature = "collection")]
pub use collection::CollectionImportReport;
#[cfg(feature = "collection")]
pub use import::import_into_collection;

// Re-export client types for convenience
pub use anki_csv_connect::{AnkiClient, ClientBuilder, DuplicateScope, Note, NoteBuilder, NoteInfo};

use sync::SyncEngine;

/// Workflow engine for AnkiConnect imports.
///
/// The engine wraps an [`AnkiClient`] and provides the import workflows
/// that combine multiple API calls.
///
/// # Example
///
/// ```no_run
/// use anki_csv_engine::Engine;
///
/// # async fn example() -> anki_csv_engine::Result<()> {
/// // Create with default client settings
/// let engine = Engine::new();
///
/// // Or with a custom client
/// let client = anki_csv_engine::AnkiClient::builder()
///     .url("http://localhost:8765")
///     .build();
/// let engine = Engine::from_client(client);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    client: AnkiClient,
}

impl Engine {
    /// Create a new engine with default client settings.
    ///
    /// Connects to AnkiConnect at `http://127.0.0.1:8765`.
    pub fn new() -> Self {
        Self {
            client: AnkiClient::new(),
        }
    }

    /// Create an engine from an existing client.
    pub fn from_client(client: AnkiClient) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying client.
    pub fn client(&self) -> &AnkiClient {
        &self.client
    }

    /// Access the step-by-step AnkiConnect import workflow.
    pub fn sync(&self) -> SyncEngine<'_> {
        SyncEngine::new(&self.client)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
