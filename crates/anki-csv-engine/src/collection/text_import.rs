//! Positional CSV import into a collection.
//!
//! Columns fill the note type's fields in order. One extra column, if
//! present, holds space-separated tags; anything beyond that is ignored.
//! Values are trimmed before anything else. A row whose first field matches
//! an existing note of the same type updates that note instead of adding a
//! new one.

use std::collections::{BTreeSet, HashSet};

use rusqlite::params;
use tracing::{debug, info, warn};

use super::Collection;
use super::fields::{
    field_checksum, generate_guid, join_fields, join_tags, split_fields, strip_html,
};
use super::model::Model;
use crate::mapping::{RowIssue, escape_html};
use crate::tags::split_tags;
use crate::{Error, Result};

/// Outcome of a collection import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionImportReport {
    /// Notes inserted.
    pub added: usize,
    /// Existing notes updated in place.
    pub updated: usize,
    /// Rows left out.
    pub skipped: usize,
    /// Why rows were left out.
    pub issues: Vec<RowIssue>,
}

impl CollectionImportReport {
    fn skip(&mut self, line: usize, message: String) {
        warn!(line, "{}", message);
        self.skipped += 1;
        self.issues.push(RowIssue { line, message });
    }
}

/// Imports rows into one deck with one note type.
#[derive(Debug)]
pub struct TextImporter<'c> {
    col: &'c mut Collection,
    model: Model,
    deck_id: i64,
    allow_html: bool,
}

impl<'c> TextImporter<'c> {
    /// An importer adding notes of `model` to the deck `deck_id`.
    pub fn new(col: &'c mut Collection, model: Model, deck_id: i64) -> Self {
        Self {
            col,
            model,
            deck_id,
            allow_html: false,
        }
    }

    /// Keep field values as HTML instead of escaping them.
    pub fn allow_html(mut self, allow: bool) -> Self {
        self.allow_html = allow;
        self
    }

    /// Import rows. `first_line` is the CSV line of `rows[0]`, used in warnings.
    pub fn import(&mut self, rows: &[Vec<String>], first_line: usize) -> Result<CollectionImportReport> {
        let field_count = self.model.flds.len();
        if field_count == 0 {
            return Err(Error::Collection(format!(
                "note type '{}' has no fields",
                self.model.name
            )));
        }

        if let Some(width) = rows.first().map(Vec::len) {
            debug!(
                columns = width,
                fields = field_count,
                tags_column = width > field_count,
                ignored = width.saturating_sub(field_count + 1),
                "Mapping CSV columns onto fields"
            );
        }

        let mut report = CollectionImportReport::default();
        let mut seen = HashSet::new();
        let mut next_note_id = self.col.next_id("notes")?;
        let mut next_card_id = self.col.next_id("cards")?;

        for (index, row) in rows.iter().enumerate() {
            let line = first_line + index;
            let mapped = row.len().min(field_count);

            let mut values: Vec<String> = row[..mapped]
                .iter()
                .map(|v| {
                    // Trimmed before a trailing newline can become `<br>`.
                    let v = v.trim();
                    if self.allow_html {
                        v.to_string()
                    } else {
                        escape_html(v)
                    }
                })
                .collect();
            values.resize(field_count, String::new());
            let tags = row.get(field_count).map(|t| split_tags(t));

            let key = strip_html(&values[0]);
            if key.trim().is_empty() {
                report.skip(line, "Empty first field".to_string());
                continue;
            }
            if !seen.insert(key.clone()) {
                report.skip(
                    line,
                    format!("'{}' already appeared earlier in the file", key),
                );
                continue;
            }

            match self.find_existing(&values[0], &key)? {
                Some((note_id, old_fields)) => {
                    self.update(note_id, old_fields, &values[..mapped], tags.as_deref(), &mut next_card_id)?;
                    debug!(line, note_id, "Updated note");
                    report.updated += 1;
                }
                None => {
                    let ords = self.model.card_ordinals(&values);
                    if ords.is_empty() {
                        report.skip(line, "Row would not generate any cards".to_string());
                        continue;
                    }
                    let note_id = next_note_id;
                    next_note_id += 1;
                    self.insert(note_id, &values, tags.as_deref().unwrap_or_default(), &ords, &mut next_card_id)?;
                    debug!(line, note_id, cards = ords.len(), "Added note");
                    report.added += 1;
                }
            }
        }

        info!(
            added = report.added,
            updated = report.updated,
            skipped = report.skipped,
            "Imported rows into collection"
        );
        Ok(report)
    }

    /// Existing note of this type whose first field equals `key`.
    fn find_existing(&self, first: &str, key: &str) -> Result<Option<(i64, Vec<String>)>> {
        let mut stmt = self
            .col
            .conn()
            .prepare_cached("SELECT id, flds FROM notes WHERE mid = ? AND csum = ?")?;
        let candidates = stmt.query_map(params![self.model.id, field_checksum(first)], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        for candidate in candidates {
            let (id, flds) = candidate?;
            let fields = split_fields(&flds);
            if fields.first().is_some_and(|f| strip_html(f) == key) {
                return Ok(Some((id, fields)));
            }
        }
        Ok(None)
    }

    fn insert(
        &mut self,
        note_id: i64,
        values: &[String],
        tags: &[String],
        ords: &[usize],
        next_card_id: &mut i64,
    ) -> Result<()> {
        let now = self.col.now();
        self.col.conn().execute(
            "INSERT INTO notes (id, guid, mid, mod, usn, tags, flds, sfld, csum, flags, data)
             VALUES (?, ?, ?, ?, -1, ?, ?, ?, ?, 0, '')",
            params![
                note_id,
                generate_guid(),
                self.model.id,
                now,
                join_tags(tags),
                join_fields(values),
                strip_html(&values[self.model.sort_index()]),
                field_checksum(&values[0]),
            ],
        )?;
        self.col.register_tags(tags);

        let due = self.col.next_position();
        for &ord in ords {
            self.insert_card(*next_card_id, note_id, ord, due)?;
            *next_card_id += 1;
        }
        Ok(())
    }

    /// Overwrite the mapped fields of a note, and its tags when the CSV has
    /// a tag column. Cards the new content calls for are added.
    fn update(
        &mut self,
        note_id: i64,
        mut fields: Vec<String>,
        mapped: &[String],
        tags: Option<&[String]>,
        next_card_id: &mut i64,
    ) -> Result<()> {
        fields.resize(self.model.flds.len(), String::new());
        fields[..mapped.len()].clone_from_slice(mapped);

        let now = self.col.now();
        let flds = join_fields(&fields);
        let sfld = strip_html(&fields[self.model.sort_index()]);
        let csum = field_checksum(&fields[0]);

        match tags {
            Some(tags) => {
                self.col.conn().execute(
                    "UPDATE notes SET flds = ?, sfld = ?, csum = ?, tags = ?, mod = ?, usn = -1
                     WHERE id = ?",
                    params![flds, sfld, csum, join_tags(tags), now, note_id],
                )?;
                self.col.register_tags(tags);
            }
            None => {
                self.col.conn().execute(
                    "UPDATE notes SET flds = ?, sfld = ?, csum = ?, mod = ?, usn = -1 WHERE id = ?",
                    params![flds, sfld, csum, now, note_id],
                )?;
            }
        }

        let existing = self.card_ordinals(note_id)?;
        let missing: Vec<usize> = self
            .model
            .card_ordinals(&fields)
            .into_iter()
            .filter(|ord| !existing.contains(ord))
            .collect();
        if !missing.is_empty() {
            let due = self.col.next_position();
            for ord in missing {
                self.insert_card(*next_card_id, note_id, ord, due)?;
                *next_card_id += 1;
            }
        }
        Ok(())
    }

    fn card_ordinals(&self, note_id: i64) -> Result<BTreeSet<usize>> {
        let mut stmt = self
            .col
            .conn()
            .prepare_cached("SELECT ord FROM cards WHERE nid = ?")?;
        let ords = stmt
            .query_map([note_id], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ords.into_iter().map(|o| o as usize).collect())
    }

    fn insert_card(&self, card_id: i64, note_id: i64, ord: usize, due: i64) -> Result<()> {
        self.col.conn().execute(
            "INSERT INTO cards (id, nid, did, ord, mod, usn, type, queue, due, ivl, factor, reps, lapses, left, odue, odid, flags, data)
             VALUES (?, ?, ?, ?, ?, -1, 0, 0, ?, 0, 0, 0, 0, 0, 0, 0, 0, '')",
            params![card_id, note_id, self.deck_id, ord as i64, self.col.now(), due],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|v| v.to_string()).collect())
            .collect()
    }

    fn note_count(col: &Collection) -> i64 {
        col.conn()
            .query_row("SELECT count(*) FROM notes", [], |r| r.get(0))
            .unwrap()
    }

    fn setup(dir: &tempfile::TempDir, model: &str) -> (Collection, Model, i64) {
        let mut col = Collection::open(dir.path().join("c.anki2")).unwrap();
        let did = col.deck_id("Test").unwrap();
        let model = col.model_by_name(model).unwrap();
        (col, model, did)
    }

    #[test]
    fn test_insert_then_update() {
        let dir = tempdir().unwrap();
        let (mut col, model, did) = setup(&dir, "Basic");

        let report = TextImporter::new(&mut col, model.clone(), did)
            .import(&rows(&[&["hola", "hello"], &["adios", "bye"]]), 1)
            .unwrap();
        assert_eq!((report.added, report.updated, report.skipped), (2, 0, 0));

        let report = TextImporter::new(&mut col, model, did)
            .import(&rows(&[&["hola", "hi"]]), 1)
            .unwrap();
        assert_eq!((report.added, report.updated), (0, 1));
        assert_eq!(note_count(&col), 2);

        let flds: String = col
            .conn()
            .query_row("SELECT flds FROM notes WHERE sfld = 'hola'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(flds, "hola\x1fhi");
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let dir = tempdir().unwrap();
        let (mut col, model, did) = setup(&dir, "Basic");

        TextImporter::new(&mut col, model.clone(), did)
            .import(&rows(&[&["hola", "a"]]), 1)
            .unwrap();
        let report = TextImporter::new(&mut col, model, did)
            .import(&rows(&[&[" hola ", " b\n"]]), 1)
            .unwrap();

        assert_eq!((report.added, report.updated), (0, 1));
        let flds: String = col
            .conn()
            .query_row("SELECT flds FROM notes", [], |r| r.get(0))
            .unwrap();
        assert_eq!(flds, "hola\x1fb");
    }

    #[test]
    fn test_tag_column_and_extra_columns() {
        let dir = tempdir().unwrap();
        let (mut col, model, did) = setup(&dir, "Basic");

        TextImporter::new(&mut col, model, did)
            .import(&rows(&[&["q", "a", "verb spanish", "ignored"]]), 1)
            .unwrap();

        let (tags, flds): (String, String) = col
            .conn()
            .query_row("SELECT tags, flds FROM notes", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(tags, " verb spanish ");
        assert_eq!(flds, "q\x1fa");
        assert!(col.tags.contains_key("verb"));
    }

    #[test]
    fn test_update_keeps_tags_without_tag_column() {
        let dir = tempdir().unwrap();
        let (mut col, model, did) = setup(&dir, "Basic");

        TextImporter::new(&mut col, model.clone(), did)
            .import(&rows(&[&["q", "a", "keep"]]), 1)
            .unwrap();
        TextImporter::new(&mut col, model, did)
            .import(&rows(&[&["q", "b"]]), 1)
            .unwrap();

        let tags: String = col
            .conn()
            .query_row("SELECT tags FROM notes", [], |r| r.get(0))
            .unwrap();
        assert_eq!(tags, " keep ");
    }

    #[test]
    fn test_skips() {
        let dir = tempdir().unwrap();
        let (mut col, model, did) = setup(&dir, "Basic");

        let report = TextImporter::new(&mut col, model, did)
            .import(&rows(&[&["", "a"], &["x", "1"], &["x", "2"]]), 2)
            .unwrap();

        assert_eq!((report.added, report.skipped), (1, 2));
        assert_eq!(
            report.issues.iter().map(|i| i.line).collect::<Vec<_>>(),
            vec![2, 4]
        );
    }

    #[test]
    fn test_html_escaped_by_default() {
        let dir = tempdir().unwrap();
        let (mut col, model, did) = setup(&dir, "Basic");

        TextImporter::new(&mut col, model.clone(), did)
            .import(&rows(&[&["<b>a</b>", "x\ny"]]), 1)
            .unwrap();
        TextImporter::new(&mut col, model, did)
            .allow_html(true)
            .import(&rows(&[&["<i>b</i>", "z"]]), 1)
            .unwrap();

        let mut stmt = col.conn().prepare("SELECT flds FROM notes ORDER BY id").unwrap();
        let flds: Vec<String> = stmt
            .query_map([], |r| r.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(flds[0], "&lt;b&gt;a&lt;/b&gt;\x1fx<br>y");
        assert_eq!(flds[1], "<i>b</i>\x1fz");
    }

    #[test]
    fn test_cards_go_to_deck_with_shared_due() {
        let dir = tempdir().unwrap();
        let (mut col, model, did) = setup(&dir, "Basic (and reversed card)");

        TextImporter::new(&mut col, model, did)
            .import(&rows(&[&["q1", "a1"], &["q2", ""]]), 1)
            .unwrap();

        let mut stmt = col
            .conn()
            .prepare("SELECT did, ord, due FROM cards ORDER BY id")
            .unwrap();
        let cards: Vec<(i64, i64, i64)> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(cards, vec![(did, 0, 1), (did, 1, 1), (did, 0, 2)]);
    }

    #[test]
    fn test_cloze_without_deletions_is_skipped() {
        let dir = tempdir().unwrap();
        let (mut col, model, did) = setup(&dir, "Cloze");

        let report = TextImporter::new(&mut col, model, did)
            .import(&rows(&[&["{{c1::a}} {{c2::b}}"], &["plain"]]), 1)
            .unwrap();

        assert_eq!((report.added, report.skipped), (1, 1));
        let cards: i64 = col
            .conn()
            .query_row("SELECT count(*) FROM cards", [], |r| r.get(0))
            .unwrap();
        assert_eq!(cards, 2);
    }
}
