//! Direct access to an Anki collection file.
//!
//! Works on collections that keep note types and decks as JSON in the `col`
//! table (schema 11). Newer collections are rejected with
//! [`Error::UnsupportedSchema`]; import into those through AnkiConnect.
//!
//! All changes happen inside one SQLite transaction that is committed by
//! [`Collection::close`]. Dropping a collection without closing it discards
//! everything.
//!
//! # Example
//!
//! ```no_run
//! use anki_csv_engine::collection::{Collection, TextImporter};
//! use anki_csv_engine::{CsvOptions, table::read_records};
//!
//! # fn example() -> anki_csv_engine::Result<()> {
//! let mut col = Collection::open("collection.anki2")?;
//! let deck_id = col.deck_id("Spanish")?;
//! col.select_deck(deck_id)?;
//! let model = col.model_by_name("Basic")?;
//! col.bind(&model, deck_id)?;
//!
//! let rows = read_records(std::fs::File::open("cards.csv")?, CsvOptions::default())?;
//! let report = TextImporter::new(&mut col, model, deck_id).import(&rows, 1)?;
//! col.close()?;
//! println!("Added: {}, Updated: {}", report.added, report.updated);
//! # Ok(())
//! # }
//! ```

mod fields;
mod model;
mod sql;
mod text_import;

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::{Error, Result};

pub use fields::{field_checksum, strip_html};
pub use model::{Model, ModelField, ModelTemplate, Requirement};
pub use text_import::{CollectionImportReport, TextImporter};

use sql::{DEFAULT_CONF, DEFAULT_DCONF, SCHEMA, SCHEMA_VERSION, deck_json, stock_models};

/// An open collection with a pending transaction.
#[derive(Debug)]
pub struct Collection {
    conn: Connection,
    path: PathBuf,
    models: Map<String, Value>,
    decks: Map<String, Value>,
    conf: Map<String, Value>,
    tags: Map<String, Value>,
    now_ms: i64,
}

impl Collection {
    /// Open a collection file, creating a new collection if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let is_new = std::fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);

        let conn = Connection::open(&path)?;
        conn.execute_batch("BEGIN")?;

        let now_ms = current_timestamp_ms();
        if is_new {
            initialize(&conn, now_ms)?;
            info!(path = %path.display(), "Created new collection");
        }

        let ver: i64 = conn.query_row("SELECT ver FROM col", [], |row| row.get(0))?;
        if ver > SCHEMA_VERSION {
            return Err(Error::UnsupportedSchema(ver));
        }

        let (models, decks, conf, tags): (String, String, String, String) = conn.query_row(
            "SELECT models, decks, conf, tags FROM col",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        let col = Self {
            conn,
            path,
            models: parse_object("models", &models)?,
            decks: parse_object("decks", &decks)?,
            conf: parse_object("conf", &conf)?,
            tags: parse_object("tags", &tags)?,
            now_ms,
        };

        debug!(
            path = %col.path.display(),
            ver,
            models = col.models.len(),
            decks = col.decks.len(),
            "Opened collection"
        );
        Ok(col)
    }

    /// Path of the collection file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Timestamp of this session in seconds, used for `mod` columns.
    pub(crate) fn now(&self) -> i64 {
        self.now_ms / 1000
    }

    /// All note types.
    pub fn models(&self) -> Result<Vec<Model>> {
        self.models
            .values()
            .map(|m| serde_json::from_value(m.clone()).map_err(Error::from))
            .collect()
    }

    /// Find a note type by exact name.
    pub fn model_by_name(&self, name: &str) -> Result<Model> {
        self.models()?
            .into_iter()
            .find(|m| m.name == name)
            .ok_or_else(|| Error::ModelNotFound(name.to_string()))
    }

    /// Find a deck by name, ignoring case.
    pub fn find_deck(&self, name: &str) -> Option<i64> {
        let wanted = normalize_deck_name(name).to_lowercase();
        self.decks.values().find_map(|deck| {
            let deck_name = deck.get("name")?.as_str()?;
            if deck_name.to_lowercase() == wanted {
                deck.get("id")?.as_i64()
            } else {
                None
            }
        })
    }

    /// ID of the named deck, creating it and any missing parents.
    pub fn deck_id(&mut self, name: &str) -> Result<i64> {
        let name = normalize_deck_name(name);
        if name.is_empty() {
            return Err(Error::Collection("deck name is empty".to_string()));
        }
        if let Some(id) = self.find_deck(&name) {
            return Ok(id);
        }

        let mut path = String::new();
        let mut id = 0;
        for part in name.split("::") {
            if !path.is_empty() {
                path.push_str("::");
            }
            path.push_str(part);
            id = match self.find_deck(&path) {
                Some(existing) => existing,
                None => self.create_deck(&path),
            };
        }
        Ok(id)
    }

    fn create_deck(&mut self, name: &str) -> i64 {
        let mut id = self.now_ms;
        while self.decks.contains_key(&id.to_string()) {
            id += 1;
        }
        let deck = deck_json(id, name, self.now());
        self.decks.insert(id.to_string(), deck);
        info!(deck = name, deck_id = id, "Created deck");
        id
    }

    /// Make a deck the current one.
    pub fn select_deck(&mut self, deck_id: i64) -> Result<()> {
        self.deck_mut(deck_id)?;
        self.conf.insert("curDeck".to_string(), json!(deck_id));
        self.conf.insert("activeDecks".to_string(), json!([deck_id]));
        Ok(())
    }

    /// Remember the note type and deck as each other's defaults.
    pub fn bind(&mut self, model: &Model, deck_id: i64) -> Result<()> {
        let now = self.now();
        let deck = self.deck_mut(deck_id)?;
        deck.insert("mid".to_string(), json!(model.id));
        deck.insert("mod".to_string(), json!(now));

        let model_json = self
            .models
            .get_mut(&model.id.to_string())
            .and_then(Value::as_object_mut)
            .ok_or_else(|| Error::ModelNotFound(model.name.clone()))?;
        model_json.insert("did".to_string(), json!(deck_id));
        model_json.insert("mod".to_string(), json!(now));
        self.conf.insert("curModel".to_string(), json!(model.id));
        Ok(())
    }

    fn deck_mut(&mut self, deck_id: i64) -> Result<&mut Map<String, Value>> {
        self.decks
            .get_mut(&deck_id.to_string())
            .and_then(Value::as_object_mut)
            .ok_or_else(|| Error::Collection(format!("no deck with id {}", deck_id)))
    }

    /// Take the next new-card position from the collection config.
    pub(crate) fn next_position(&mut self) -> i64 {
        let pos = self.conf.get("nextPos").and_then(Value::as_i64).unwrap_or(1);
        self.conf.insert("nextPos".to_string(), json!(pos + 1));
        pos
    }

    /// Add tags to the collection's tag list, ignoring case.
    pub(crate) fn register_tags(&mut self, tags: &[String]) {
        for tag in tags {
            let known = self.tags.keys().any(|t| t.eq_ignore_ascii_case(tag));
            if !known {
                self.tags.insert(tag.clone(), json!(-1));
            }
        }
    }

    /// The first unused ID in a table, at least the session timestamp.
    pub(crate) fn next_id(&self, table: &str) -> Result<i64> {
        let max: Option<i64> = self
            .conn
            .query_row(&format!("SELECT max(id) FROM {}", table), [], |row| {
                row.get(0)
            })
            .optional()?
            .flatten();
        Ok(max.map_or(self.now_ms, |m| (m + 1).max(self.now_ms)))
    }

    /// Write back the collection metadata and commit.
    pub fn close(self) -> Result<()> {
        self.conn.execute(
            "UPDATE col SET mod = ?, usn = -1, models = ?, decks = ?, conf = ?, tags = ?",
            params![
                self.now_ms,
                serde_json::to_string(&self.models)?,
                serde_json::to_string(&self.decks)?,
                serde_json::to_string(&self.conf)?,
                serde_json::to_string(&self.tags)?,
            ],
        )?;
        self.conn.execute_batch("COMMIT")?;
        info!(path = %self.path.display(), "Saved collection");
        Ok(())
    }
}

/// Create the schema and `col` row of a new collection.
fn initialize(conn: &Connection, now_ms: i64) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let now = now_ms / 1000;
    let models: Map<String, Value> = stock_models(now_ms, now)
        .into_iter()
        .filter_map(|m| Some((m.get("id")?.as_i64()?.to_string(), m)))
        .collect();
    let mut decks = Map::new();
    decks.insert("1".to_string(), deck_json(1, "Default", now));

    conn.execute(
        "INSERT INTO col (id, crt, mod, scm, ver, dty, usn, ls, conf, models, decks, dconf, tags)
         VALUES (1, ?, ?, ?, ?, 0, 0, 0, ?, ?, ?, ?, '{}')",
        params![
            now,
            now_ms,
            now_ms,
            SCHEMA_VERSION,
            DEFAULT_CONF,
            serde_json::to_string(&models)?,
            serde_json::to_string(&decks)?,
            DEFAULT_DCONF
        ],
    )?;
    Ok(())
}

fn parse_object(column: &str, text: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(text)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::Collection(format!(
            "col.{} is not a JSON object",
            column
        ))),
    }
}

/// Trim whitespace around each `::` component and drop empty ones.
fn normalize_deck_name(name: &str) -> String {
    name.split("::")
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("::")
}

fn current_timestamp_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
