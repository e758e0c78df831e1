//! Turning CSV rows into notes.
//!
//! Each column maps to the field of the same name, except a column called
//! `tags` (any case) whose value is split on whitespace into the note's tags.
//! The first field column is the key field used to find the note again on
//! later imports.

use std::collections::HashSet;

use anki_csv_connect::{DuplicateScope, Note, NoteBuilder};
use tracing::debug;

use crate::table::CsvTable;
use crate::tags::split_tags;
use crate::{Error, Result};

/// Name of the reserved tag column, compared case-insensitively.
pub const TAGS_COLUMN: &str = "tags";

/// Escape text for an HTML field the way Anki's text importer does.
///
/// `&`, `<` and `>` become entities and line breaks become `<br>`.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out.replace("\r\n", "<br>").replace('\n', "<br>")
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Column {
    Field(String),
    Tags,
}

/// A row that was skipped or failed during an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIssue {
    /// One-based CSV line.
    pub line: usize,
    /// What went wrong.
    pub message: String,
}

/// A note built from one CSV row.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedNote {
    /// One-based line of the row in the CSV, header being line 1.
    pub line: usize,
    /// Field used to look the note up when it already exists.
    pub key_field: String,
    /// The note to send.
    pub note: Note,
}

impl PreparedNote {
    /// Value of the key field.
    pub fn key_value(&self) -> &str {
        self.note
            .fields
            .get(&self.key_field)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Maps rows of one CSV onto notes for a deck and note type.
#[derive(Debug, Clone)]
pub struct NoteMapper {
    deck: String,
    model: String,
    columns: Vec<Column>,
    allow_html: bool,
}

impl NoteMapper {
    /// Build a mapper from the CSV header.
    ///
    /// Header names must be non-empty and unique (the tag column included,
    /// compared case-insensitively for it).
    pub fn new(
        deck: impl Into<String>,
        model: impl Into<String>,
        header: &[String],
        allow_html: bool,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(header.len());

        for (index, name) in header.iter().enumerate() {
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::EmptyColumnName { column: index });
            }
            let column = if name.eq_ignore_ascii_case(TAGS_COLUMN) {
                Column::Tags
            } else {
                Column::Field(name.to_string())
            };
            let key = match &column {
                Column::Tags => TAGS_COLUMN.to_string(),
                Column::Field(field) => field.clone(),
            };
            if !seen.insert(key) {
                return Err(Error::DuplicateColumn(name.to_string()));
            }
            columns.push(column);
        }

        Ok(Self {
            deck: deck.into(),
            model: model.into(),
            columns,
            allow_html,
        })
    }

    /// Target deck.
    pub fn deck(&self) -> &str {
        &self.deck
    }

    /// Target note type.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Field columns in file order, the tag column excluded.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter_map(|c| match c {
            Column::Field(name) => Some(name.as_str()),
            Column::Tags => None,
        })
    }

    /// The field that identifies an existing note, if the CSV has any field.
    pub fn key_field(&self) -> Option<&str> {
        self.field_names().next()
    }

    /// Build the note for one row, `None` if the row carries no fields.
    ///
    /// `line` is the one-based line of the row, used in warnings.
    pub fn map_row(&self, line: usize, row: &[String]) -> Option<PreparedNote> {
        let key_field = self.key_field()?.to_string();

        let mut builder = NoteBuilder::new(&self.deck, &self.model)
            .allow_duplicate(false)
            .duplicate_scope(DuplicateScope::Deck);

        for (column, value) in self.columns.iter().zip(row) {
            builder = match column {
                Column::Tags => builder.tags(split_tags(value)),
                Column::Field(name) if self.allow_html => builder.field(name, value.as_str()),
                Column::Field(name) => builder.field(name, escape_html(value)),
            };
        }

        Some(PreparedNote {
            line,
            key_field,
            note: builder.build(),
        })
    }

    /// Build notes for every data row of a table.
    pub fn map_table(&self, table: &CsvTable) -> Vec<PreparedNote> {
        let notes: Vec<_> = table
            .rows()
            .iter()
            .enumerate()
            .filter_map(|(index, row)| self.map_row(index + 2, row))
            .collect();

        debug!(
            rows = table.len(),
            notes = notes.len(),
            deck = %self.deck,
            model = %self.model,
            "Mapped CSV rows to notes"
        );
        notes
    }
}
