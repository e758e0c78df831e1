//! Note-related types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A note as AnkiConnect accepts it for `addNotes` and `canAddNotes`.
///
/// Field values are HTML and field names must match the model's field names
/// exactly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// The deck to add the note to.
    pub deck_name: String,
    /// The note type (model) name.
    pub model_name: String,
    /// Field values, keyed by field name.
    pub fields: HashMap<String, String>,
    /// Tags for the note.
    pub tags: Vec<String>,
    /// Duplicate handling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<NoteOptions>,
}

/// Options for adding notes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteOptions {
    /// Allow duplicate notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_duplicate: Option<bool>,
    /// Scope for duplicate checking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_scope: Option<DuplicateScope>,
}

/// Where AnkiConnect looks for duplicates of a new note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DuplicateScope {
    /// Only within the target deck.
    Deck,
    /// Anywhere in the collection.
    Collection,
}

/// Information about an existing note, as returned by `notesInfo`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInfo {
    /// The note ID.
    pub note_id: i64,
    /// The note type (model) name.
    pub model_name: String,
    /// Tags on the note.
    pub tags: Vec<String>,
    /// Field values and metadata.
    pub fields: HashMap<String, NoteField>,
    /// Card IDs generated from this note.
    #[serde(default)]
    pub cards: Vec<i64>,
}

/// A field value with metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct NoteField {
    /// The field value (HTML).
    pub value: String,
    /// The field's position in the note type.
    pub order: i32,
}

/// Builder for creating notes with a fluent API.
///
/// # Example
///
/// ```
/// use anki_csv_connect::{DuplicateScope, NoteBuilder};
///
/// let note = NoteBuilder::new("Geography", "Basic")
///     .field("Front", "Capital of France?")
///     .field("Back", "Paris")
///     .tag("europe")
///     .allow_duplicate(false)
///     .duplicate_scope(DuplicateScope::Deck)
///     .build();
///
/// assert_eq!(note.tags, vec!["europe"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NoteBuilder {
    deck_name: String,
    model_name: String,
    fields: HashMap<String, String>,
    tags: Vec<String>,
    options: Option<NoteOptions>,
}

impl NoteBuilder {
    /// Create a new note builder for a deck and model.
    pub fn new(deck: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            deck_name: deck.into(),
            model_name: model.into(),
            ..Default::default()
        }
    }

    /// Set a field value.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Add a tag to the note.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add multiple tags to the note.
    pub fn tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Allow or reject duplicate notes.
    pub fn allow_duplicate(mut self, allow: bool) -> Self {
        self.options
            .get_or_insert_with(NoteOptions::default)
            .allow_duplicate = Some(allow);
        self
    }

    /// Set the duplicate checking scope.
    pub fn duplicate_scope(mut self, scope: DuplicateScope) -> Self {
        self.options
            .get_or_insert_with(NoteOptions::default)
            .duplicate_scope = Some(scope);
        self
    }

    /// Build the note.
    pub fn build(self) -> Note {
        Note {
            deck_name: self.deck_name,
            model_name: self.model_name,
            fields: self.fields,
            tags: self.tags,
            options: self.options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_serializes_in_ankiconnect_shape() {
        let note = NoteBuilder::new("Spanish", "Basic")
            .field("Front", "hola")
            .tag("greeting")
            .allow_duplicate(false)
            .duplicate_scope(DuplicateScope::Deck)
            .build();

        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["deckName"], "Spanish");
        assert_eq!(json["modelName"], "Basic");
        assert_eq!(json["fields"]["Front"], "hola");
        assert_eq!(json["tags"], serde_json::json!(["greeting"]));
        assert_eq!(json["options"]["allowDuplicate"], false);
        assert_eq!(json["options"]["duplicateScope"], "deck");
    }

    #[test]
    fn test_empty_tags_still_sent() {
        let note = NoteBuilder::new("Spanish", "Basic").build();
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["tags"], serde_json::json!([]));
        assert!(json.get("options").is_none());
    }
}
