//! End-to-end CSV imports.
//!
//! Fetches the CSV, runs it through either the AnkiConnect workflow or the
//! collection importer, and removes any downloaded file afterwards whether
//! or not the import succeeded.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::source::{CsvSource, FetchedCsv};
use crate::sync::SyncReport;
use crate::table::{CsvOptions, CsvTable};
use crate::{Engine, NoteMapper, Result};

#[cfg(feature = "collection")]
use crate::collection::{Collection, CollectionImportReport, TextImporter};
#[cfg(feature = "collection")]
use crate::table::detect_delimiter;
#[cfg(feature = "collection")]
use std::path::Path;

/// What to import into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Target deck.
    pub deck: String,
    /// Target note type.
    pub model: String,
    /// Keep field values as HTML instead of escaping them.
    pub allow_html: bool,
    /// Drop the first row. Only used by collection imports, which otherwise
    /// treat every row as data.
    pub skip_header: bool,
    /// Field delimiter. When unset, AnkiConnect imports use `,` and
    /// collection imports detect it from the first line.
    pub delimiter: Option<u8>,
    /// Where a remote CSV is downloaded. The system temporary directory
    /// when unset.
    pub temp_dir: Option<PathBuf>,
}

impl ImportOptions {
    /// Options for a deck and note type, everything else default.
    pub fn new(deck: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            deck: deck.into(),
            model: model.into(),
            allow_html: false,
            skip_header: false,
            delimiter: None,
            temp_dir: None,
        }
    }

    /// Keep HTML in field values.
    pub fn allow_html(mut self, allow: bool) -> Self {
        self.allow_html = allow;
        self
    }

    /// Skip the first CSV row in collection imports.
    pub fn skip_header(mut self, skip: bool) -> Self {
        self.skip_header = skip;
        self
    }

    /// Set the field delimiter.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Download remote CSVs into `dir`.
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }
}

impl Engine {
    /// Import a CSV through AnkiConnect.
    ///
    /// The first row names the fields; see [`NoteMapper`].
    pub async fn import_csv(&self, source: &CsvSource, options: &ImportOptions) -> Result<SyncReport> {
        let fetched = source.fetch_in(options.temp_dir.as_deref()).await?;
        let result = self.import_fetched(&fetched, options).await;
        finish(fetched, result)
    }

    async fn import_fetched(&self, fetched: &FetchedCsv, options: &ImportOptions) -> Result<SyncReport> {
        let csv = options
            .delimiter
            .map(|delimiter| CsvOptions { delimiter })
            .unwrap_or_default();
        let table = CsvTable::read_path(fetched.path(), csv)?;
        let mapper = NoteMapper::new(&options.deck, &options.model, table.header(), options.allow_html)?;
        let notes = mapper.map_table(&table);
        info!(
            notes = notes.len(),
            deck = %options.deck,
            model = %options.model,
            "Importing through AnkiConnect"
        );
        self.sync().run(&mapper, notes).await
    }
}

/// Import a CSV straight into a collection file.
///
/// Anki must not have the collection open.
#[cfg(feature = "collection")]
pub async fn import_into_collection(
    source: &CsvSource,
    collection: &Path,
    options: &ImportOptions,
) -> Result<CollectionImportReport> {
    let fetched = source.fetch_in(options.temp_dir.as_deref()).await?;
    let result = import_fetched_into_collection(&fetched, collection, options);
    finish(fetched, result)
}

#[cfg(feature = "collection")]
fn import_fetched_into_collection(
    fetched: &FetchedCsv,
    collection: &Path,
    options: &ImportOptions,
) -> Result<CollectionImportReport> {
    let data = std::fs::read(fetched.path())?;
    let delimiter = match options.delimiter {
        Some(delimiter) => delimiter,
        None => {
            let detected = detect_delimiter(&data);
            tracing::debug!(delimiter = %(detected as char).escape_default(), "Detected delimiter");
            detected
        }
    };
    let mut rows = crate::table::read_records(data.as_slice(), CsvOptions { delimiter })?;
    if rows.is_empty() {
        return Err(crate::Error::EmptyCsv);
    }
    let first_line = if options.skip_header {
        rows.remove(0);
        2
    } else {
        1
    };

    info!(
        rows = rows.len(),
        collection = %collection.display(),
        deck = %options.deck,
        model = %options.model,
        "Importing into collection"
    );

    let mut col = Collection::open(collection)?;
    let deck_id = col.deck_id(&options.deck)?;
    col.select_deck(deck_id)?;
    let model = col.model_by_name(&options.model)?;
    col.bind(&model, deck_id)?;

    let report = TextImporter::new(&mut col, model, deck_id)
        .allow_html(options.allow_html)
        .import(&rows, first_line)?;
    col.close()?;
    Ok(report)
}

/// Remove the fetched file, keeping the import's own error if both fail.
fn finish<T>(fetched: FetchedCsv, result: Result<T>) -> Result<T> {
    match (fetched.close(), result) {
        (Ok(()), result) => result,
        (Err(e), Ok(_)) => Err(e),
        (Err(e), Err(original)) => {
            warn!("Could not remove temporary CSV: {}", e);
            Err(original)
        }
    }
}
