//! Note-related AnkiConnect actions.
//!
//! Covers what a CSV import needs: checking which notes can be added, adding
//! them in bulk, finding existing notes, updating their fields and adjusting
//! their tags. Each single-note action also has a [`MultiAction`]
//! constructor so lookups and updates can be batched.
//!
//! # Example
//!
//! ```no_run
//! use anki_csv_connect::{AnkiClient, NoteBuilder};
//!
//! # async fn example() -> anki_csv_connect::Result<()> {
//! let client = AnkiClient::new();
//!
//! let notes = vec![
//!     NoteBuilder::new("Default", "Basic")
//!         .field("Front", "Hello")
//!         .field("Back", "World")
//!         .build(),
//! ];
//!
//! let addable = client.notes().can_add(&notes).await?;
//! if addable[0] {
//!     client.notes().add_many(&notes).await?;
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

use serde::Serialize;

use crate::actions::MultiAction;
use crate::client::AnkiClient;
use crate::error::Result;
use crate::types::{Note, NoteInfo};

/// Provides access to note-related AnkiConnect operations.
///
/// Obtained via [`AnkiClient::notes()`].
#[derive(Debug)]
pub struct NoteActions<'a> {
    pub(crate) client: &'a AnkiClient,
}

#[derive(Serialize)]
struct NotesParams<'a> {
    notes: &'a [Note],
}

#[derive(Serialize)]
struct FindNotesParams<'a> {
    query: &'a str,
}

#[derive(Serialize)]
struct NoteIdsParams<'a> {
    notes: &'a [i64],
}

#[derive(Serialize)]
struct UpdateNoteFieldsParams<'a> {
    note: UpdateNoteFieldsInner<'a>,
}

#[derive(Serialize)]
struct UpdateNoteFieldsInner<'a> {
    id: i64,
    fields: &'a HashMap<String, String>,
}

#[derive(Serialize)]
struct TagsParams<'a> {
    notes: &'a [i64],
    tags: &'a str,
}

impl<'a> NoteActions<'a> {
    /// Check whether notes can be added.
    ///
    /// Returns one boolean per note. `false` usually means the note is a
    /// duplicate within its duplicate scope, but also covers notes AnkiConnect
    /// would reject for other reasons such as an empty first field.
    pub async fn can_add(&self, notes: &[Note]) -> Result<Vec<bool>> {
        self.client
            .invoke("canAddNotes", NotesParams { notes })
            .await
    }

    /// Add multiple notes at once.
    ///
    /// Returns one entry per note; `None` marks a note that could not be
    /// created.
    pub async fn add_many(&self, notes: &[Note]) -> Result<Vec<Option<i64>>> {
        self.client
            .invoke("addNotes", NotesParams { notes })
            .await
    }

    /// Find notes matching a search query.
    ///
    /// Uses Anki's search syntax, e.g. `deck:"Spanish" "Front:hola"`.
    pub async fn find(&self, query: &str) -> Result<Vec<i64>> {
        self.client
            .invoke("findNotes", FindNotesParams { query })
            .await
    }

    /// Get detailed information about notes, in the order requested.
    pub async fn info(&self, note_ids: &[i64]) -> Result<Vec<NoteInfo>> {
        self.client
            .invoke("notesInfo", NoteIdsParams { notes: note_ids })
            .await
    }

    /// Replace a note's field values. Fields not listed keep their value.
    pub async fn update_fields(
        &self,
        note_id: i64,
        fields: &HashMap<String, String>,
    ) -> Result<()> {
        self.client
            .invoke_void(
                "updateNoteFields",
                UpdateNoteFieldsParams {
                    note: UpdateNoteFieldsInner {
                        id: note_id,
                        fields,
                    },
                },
            )
            .await
    }

    /// Add space-separated tags to notes.
    pub async fn add_tags(&self, note_ids: &[i64], tags: &str) -> Result<()> {
        self.client
            .invoke_void(
                "addTags",
                TagsParams {
                    notes: note_ids,
                    tags,
                },
            )
            .await
    }

    /// Remove space-separated tags from notes.
    pub async fn remove_tags(&self, note_ids: &[i64], tags: &str) -> Result<()> {
        self.client
            .invoke_void(
                "removeTags",
                TagsParams {
                    notes: note_ids,
                    tags,
                },
            )
            .await
    }
}

impl MultiAction {
    /// A batched [`NoteActions::find`].
    pub fn find_notes(query: &str) -> Result<Self> {
        Self::with_params("findNotes", FindNotesParams { query })
    }

    /// A batched [`NoteActions::update_fields`].
    pub fn update_note_fields(note_id: i64, fields: &HashMap<String, String>) -> Result<Self> {
        Self::with_params(
            "updateNoteFields",
            UpdateNoteFieldsParams {
                note: UpdateNoteFieldsInner {
                    id: note_id,
                    fields,
                },
            },
        )
    }

    /// A batched [`NoteActions::add_tags`].
    pub fn add_tags(note_ids: &[i64], tags: &str) -> Result<Self> {
        Self::with_params(
            "addTags",
            TagsParams {
                notes: note_ids,
                tags,
            },
        )
    }

    /// A batched [`NoteActions::remove_tags`].
    pub fn remove_tags(note_ids: &[i64], tags: &str) -> Result<Self> {
        Self::with_params(
            "removeTags",
            TagsParams {
                notes: note_ids,
                tags,
            },
        )
    }
}
