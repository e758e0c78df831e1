//! An async Rust client for the parts of the AnkiConnect API a CSV import
//! needs.
//!
//! # Quick Start
//!
//! ```no_run
//! use anki_csv_connect::AnkiClient;
//!
//! # async fn example() -> anki_csv_connect::Result<()> {
//! let client = AnkiClient::new();
//!
//! let version = client.misc().version().await?;
//! println!("AnkiConnect version: {}", version);
//! # Ok(())
//! # }
//! ```
//!
//! # Action Groups
//!
//! - [`AnkiClient::notes()`] - Check, add, find and update notes and their tags
//! - [`AnkiClient::decks()`] - List and create decks
//! - [`AnkiClient::models()`] - List note types and their fields
//! - [`AnkiClient::misc()`] - Version checks and batched `multi` requests
//!
//! # Requirements
//!
//! Anki must be running with the [AnkiConnect](https://ankiweb.net/shared/info/2055492159)
//! add-on installed. By default the client connects to `http://127.0.0.1:8765`.

pub mod actions;
pub mod client;
pub mod error;
mod request;
pub mod types;

pub use actions::MultiAction;
pub use client::{AnkiClient, ClientBuilder, DEFAULT_TIMEOUT, DEFAULT_URL};
pub use error::{Error, Result};
pub use types::{DuplicateScope, Note, NoteBuilder, NoteField, NoteInfo, NoteOptions};
