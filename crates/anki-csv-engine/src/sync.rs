//! Importing notes through AnkiConnect.
//!
//! AnkiConnect decides which notes are new (`canAddNotes`). New notes are
//! added in one call; the rest are looked up by their key field, have their
//! fields overwritten, and get their tags reconciled with the CSV. Lookups,
//! updates and tag changes are each sent as one batched `multi` request.
//!
//! # Example
//!
//! ```no_run
//! use anki_csv_engine::{CsvOptions, CsvTable, Engine, NoteMapper};
//!
//! # async fn example() -> anki_csv_engine::Result<()> {
//! let engine = Engine::new();
//!
//! let table = CsvTable::read_path("cards.csv", CsvOptions::default())?;
//! let mapper = NoteMapper::new("Spanish", "Basic", table.header(), false)?;
//! let notes = mapper.map_table(&table);
//!
//! let report = engine.sync().run(&mapper, notes).await?;
//! println!("Added: {}, Updated: {}", report.added, report.updated);
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, HashSet};

use anki_csv_connect::{AnkiClient, MultiAction, Note};
use tracing::{debug, info, warn};

use crate::mapping::{NoteMapper, PreparedNote, RowIssue};
use crate::tags::TagPlan;
use crate::{Error, Result};

/// Outcome of an AnkiConnect import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Notes newly created.
    pub added: usize,
    /// Existing notes whose fields were overwritten.
    pub updated: usize,
    /// Rows skipped because no single existing note matched.
    pub skipped: usize,
    /// Notes AnkiConnect refused to add or update.
    pub failed: usize,
    /// (note, tag) pairs added.
    pub tags_added: usize,
    /// (note, tag) pairs removed.
    pub tags_removed: usize,
    /// Per-row warnings, in the order they happened.
    pub issues: Vec<RowIssue>,
}

impl SyncReport {
    fn skip(&mut self, line: usize, message: String) {
        warn!(line, "{}", message);
        self.skipped += 1;
        self.issues.push(RowIssue { line, message });
    }

    fn fail(&mut self, line: usize, message: String) {
        warn!(line, "{}", message);
        self.failed += 1;
        self.issues.push(RowIssue { line, message });
    }
}

/// Notes split by whether AnkiConnect will accept them as new.
#[derive(Debug, Clone, Default)]
pub struct Classified {
    /// Notes that can be added.
    pub to_add: Vec<PreparedNote>,
    /// Notes that already exist (or cannot be added for another reason).
    pub to_update: Vec<PreparedNote>,
}

/// A prepared note paired with the ID of the existing note it updates.
#[derive(Debug, Clone)]
pub struct MatchedNote {
    /// ID of the note in the collection.
    pub note_id: i64,
    /// The row's content.
    pub prepared: PreparedNote,
}

/// Build the search that finds the existing note for a row.
///
/// Produces `deck:"<deck>" "<field>:<value>"` with Anki's search
/// metacharacters escaped inside the quotes.
pub fn lookup_query(deck: &str, field: &str, value: &str) -> String {
    format!(
        "deck:\"{}\" \"{}:{}\"",
        escape_search(deck),
        escape_search(field),
        escape_search(value)
    )
}

fn escape_search(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '"' | '*' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Fail unless AnkiConnect answered once per request.
fn check_result_count(action: &str, got: usize, sent: usize) -> Result<()> {
    if got == sent {
        Ok(())
    } else {
        Err(Error::UnexpectedResponse(format!(
            "{} returned {} results for {} requests",
            action, got, sent
        )))
    }
}

/// Keep the first row for each key value and skip the rest.
fn drop_repeated_keys(notes: Vec<PreparedNote>, report: &mut SyncReport) -> Vec<PreparedNote> {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(notes.len());
    for note in notes {
        let key = note.key_value();
        if key.trim().is_empty() || seen.insert(key.to_string()) {
            kept.push(note);
        } else {
            report.skip(
                note.line,
                format!("'{}' already appeared earlier in the file", note.key_value()),
            );
        }
    }
    kept
}

/// AnkiConnect import workflow.
#[derive(Debug)]
pub struct SyncEngine<'a> {
    client: &'a AnkiClient,
}

impl<'a> SyncEngine<'a> {
    pub(crate) fn new(client: &'a AnkiClient) -> Self {
        Self { client }
    }

    /// Import prepared notes, adding new ones and updating existing ones.
    pub async fn run(&self, mapper: &NoteMapper, notes: Vec<PreparedNote>) -> Result<SyncReport> {
        self.prepare(mapper).await?;

        let mut report = SyncReport::default();
        if notes.is_empty() {
            info!("No notes to import");
            return Ok(report);
        }

        let notes = drop_repeated_keys(notes, &mut report);
        let classified = self.classify(notes).await?;
        info!(
            "Adding {} new notes and updating {} existing notes",
            classified.to_add.len(),
            classified.to_update.len()
        );

        self.add(&classified.to_add, &mut report).await?;
        let matched = self.locate(classified.to_update, &mut report).await?;
        let updated = self.update_fields(matched, &mut report).await?;
        self.reconcile_tags(&updated, &mut report).await?;

        info!(
            added = report.added,
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed,
            "Finished importing CSV"
        );
        Ok(report)
    }

    /// Check that Anki is reachable, the note type has every CSV field, and
    /// the deck exists.
    pub async fn prepare(&self, mapper: &NoteMapper) -> Result<()> {
        let version = self.client.misc().version().await?;
        debug!(version, "Connected to AnkiConnect");

        let models = self.client.models().names().await?;
        if !models.iter().any(|m| m == mapper.model()) {
            return Err(Error::ModelNotFound(mapper.model().to_string()));
        }

        let fields = self.client.models().field_names(mapper.model()).await?;
        if let Some(unknown) = mapper
            .field_names()
            .find(|name| !fields.iter().any(|f| f == name))
        {
            return Err(Error::UnknownField {
                model: mapper.model().to_string(),
                field: unknown.to_string(),
            });
        }

        let deck_id = self.client.decks().create(mapper.deck()).await?;
        debug!(deck = mapper.deck(), deck_id, "Deck ready");
        Ok(())
    }

    /// Split notes into those AnkiConnect can add and those it cannot.
    pub async fn classify(&self, notes: Vec<PreparedNote>) -> Result<Classified> {
        if notes.is_empty() {
            return Ok(Classified::default());
        }

        let plain: Vec<Note> = notes.iter().map(|n| n.note.clone()).collect();
        let can_add = self.client.notes().can_add(&plain).await?;
        check_result_count("canAddNotes", can_add.len(), notes.len())?;

        let mut classified = Classified::default();
        for (note, addable) in notes.into_iter().zip(can_add) {
            if addable {
                classified.to_add.push(note);
            } else {
                classified.to_update.push(note);
            }
        }
        Ok(classified)
    }

    /// Add new notes in one call.
    pub async fn add(&self, notes: &[PreparedNote], report: &mut SyncReport) -> Result<()> {
        if notes.is_empty() {
            return Ok(());
        }

        let plain: Vec<Note> = notes.iter().map(|n| n.note.clone()).collect();
        let ids = self.client.notes().add_many(&plain).await?;
        check_result_count("addNotes", ids.len(), notes.len())?;

        for (note, id) in notes.iter().zip(ids) {
            match id {
                Some(id) => {
                    debug!(line = note.line, note_id = id, "Added note");
                    report.added += 1;
                }
                None => report.fail(note.line, "AnkiConnect could not add the note".to_string()),
            }
        }
        Ok(())
    }

    /// Find the existing note for each row.
    ///
    /// Rows with an empty key, with zero or several matches, or matching a
    /// note already claimed by an earlier row are skipped with a warning.
    pub async fn locate(
        &self,
        notes: Vec<PreparedNote>,
        report: &mut SyncReport,
    ) -> Result<Vec<MatchedNote>> {
        let mut searchable = Vec::with_capacity(notes.len());
        let mut actions = Vec::with_capacity(notes.len());

        for note in notes {
            if note.key_value().trim().is_empty() {
                report.skip(
                    note.line,
                    format!("Empty '{}' field, cannot look up the note", note.key_field),
                );
                continue;
            }
            let query = lookup_query(&note.note.deck_name, &note.key_field, note.key_value());
            actions.push(MultiAction::find_notes(&query)?);
            searchable.push(note);
        }

        let results: Vec<anki_csv_connect::Result<Vec<i64>>> =
            self.client.misc().multi(&actions).await?;
        check_result_count("findNotes", results.len(), searchable.len())?;

        let mut claimed = HashSet::new();
        let mut matched = Vec::with_capacity(searchable.len());
        for (note, result) in searchable.into_iter().zip(results) {
            match result {
                Err(e) => report.fail(note.line, format!("Note lookup failed: {}", e)),
                Ok(ids) if ids.is_empty() => report.skip(
                    note.line,
                    format!("Did not get any result for note update ('{}')", note.key_value()),
                ),
                Ok(ids) if ids.len() > 1 => report.skip(
                    note.line,
                    format!(
                        "Got {} results for note update ('{}')",
                        ids.len(),
                        note.key_value()
                    ),
                ),
                Ok(ids) => {
                    let note_id = ids[0];
                    if claimed.insert(note_id) {
                        matched.push(MatchedNote {
                            note_id,
                            prepared: note,
                        });
                    } else {
                        report.skip(
                            note.line,
                            format!("Note '{}' appears more than once in the CSV", note.key_value()),
                        );
                    }
                }
            }
        }
        Ok(matched)
    }

    /// Overwrite the fields of matched notes, returning the ones that succeeded.
    pub async fn update_fields(
        &self,
        matched: Vec<MatchedNote>,
        report: &mut SyncReport,
    ) -> Result<Vec<MatchedNote>> {
        let actions = matched
            .iter()
            .map(|m| MultiAction::update_note_fields(m.note_id, &m.prepared.note.fields))
            .collect::<anki_csv_connect::Result<Vec<_>>>()?;

        let results = self.client.misc().multi_void(&actions).await?;
        check_result_count("updateNoteFields", results.len(), matched.len())?;

        let mut updated = Vec::with_capacity(matched.len());
        for (m, result) in matched.into_iter().zip(results) {
            match result {
                Ok(()) => {
                    report.updated += 1;
                    updated.push(m);
                }
                Err(e) => report.fail(m.prepared.line, format!("Note update failed: {}", e)),
            }
        }
        Ok(updated)
    }

    /// Bring each note's tags in line with its CSV row.
    pub async fn reconcile_tags(
        &self,
        matched: &[MatchedNote],
        report: &mut SyncReport,
    ) -> Result<()> {
        if matched.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = matched.iter().map(|m| m.note_id).collect();
        let infos = self.client.notes().info(&ids).await?;
        let current: HashMap<i64, Vec<String>> =
            infos.into_iter().map(|i| (i.note_id, i.tags)).collect();

        let mut plan = TagPlan::new();
        for m in matched {
            let Some(tags) = current.get(&m.note_id) else {
                report.fail(
                    m.prepared.line,
                    format!("No info returned for note {}", m.note_id),
                );
                continue;
            };
            plan.record(m.note_id, tags, &m.prepared.note.tags);
        }

        if plan.is_empty() {
            debug!("Tags already up to date");
            return Ok(());
        }

        let results = self.client.misc().multi_void(&plan.add_actions()?).await?;
        check_result_count("addTags", results.len(), plan.additions().len())?;
        for ((tag, notes), result) in plan.additions().iter().zip(results) {
            match result {
                Ok(()) => report.tags_added += notes.len(),
                Err(e) => warn!(tag = %tag, "Adding tag failed: {}", e),
            }
        }

        let results = self
            .client
            .misc()
            .multi_void(&plan.remove_actions()?)
            .await?;
        check_result_count("removeTags", results.len(), plan.removals().len())?;
        for ((tag, notes), result) in plan.removals().iter().zip(results) {
            match result {
                Ok(()) => report.tags_removed += notes.len(),
                Err(e) => warn!(tag = %tag, "Removing tag failed: {}", e),
            }
        }

        debug!(
            added = report.tags_added,
            removed = report.tags_removed,
            "Reconciled tags"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_keys_keep_first_row() {
        let header = vec!["Front".to_string(), "Back".to_string()];
        let mapper = NoteMapper::new("D", "Basic", &header, false).unwrap();
        let notes = vec![
            mapper.map_row(2, &["a".to_string(), "1".to_string()]).unwrap(),
            mapper.map_row(3, &["b".to_string(), "2".to_string()]).unwrap(),
            mapper.map_row(4, &["a".to_string(), "3".to_string()]).unwrap(),
        ];

        let mut report = SyncReport::default();
        let kept = drop_repeated_keys(notes, &mut report);

        assert_eq!(kept.iter().map(|n| n.line).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.issues[0].line, 4);
    }

    #[test]
    fn test_lookup_query() {
        assert_eq!(
            lookup_query("Spanish", "Front", "hola"),
            "deck:\"Spanish\" \"Front:hola\""
        );
    }

    #[test]
    fn test_lookup_query_escapes_metacharacters() {
        assert_eq!(
            lookup_query("My_Deck", "Front", "say \"hi\" *now*"),
            "deck:\"My\\_Deck\" \"Front:say \\\"hi\\\" \\*now\\*\""
        );
        assert_eq!(lookup_query("D", "F", "a\\b"), "deck:\"D\" \"F:a\\\\b\"");
    }
}
