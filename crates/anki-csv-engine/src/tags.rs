//! Tag parsing and reconciliation.
//!
//! Anki compares tags case-insensitively, so the set operations here do too:
//! `Verb` on the note and `verb` in the CSV are the same tag and produce no
//! change.

use std::collections::{BTreeMap, HashSet};

use anki_csv_connect::MultiAction;

use crate::Result;

/// Split a whitespace-separated tag list, dropping empties and repeats.
pub fn split_tags(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split_whitespace()
        .filter(|tag| seen.insert(tag.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// The change needed to turn one tag set into another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDiff {
    /// Tags in the new set but not the current one.
    pub to_add: Vec<String>,
    /// Tags in the current set but not the new one.
    pub to_remove: Vec<String>,
}

impl TagDiff {
    /// Compute `new - current` and `current - new`.
    pub fn between(current: &[String], new: &[String]) -> Self {
        let current_keys: HashSet<String> = current.iter().map(|t| t.to_lowercase()).collect();
        let new_keys: HashSet<String> = new.iter().map(|t| t.to_lowercase()).collect();

        Self {
            to_add: new
                .iter()
                .filter(|t| !current_keys.contains(&t.to_lowercase()))
                .cloned()
                .collect(),
            to_remove: current
                .iter()
                .filter(|t| !new_keys.contains(&t.to_lowercase()))
                .cloned()
                .collect(),
        }
    }

    /// Whether nothing needs to change.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Tag changes across many notes, grouped by tag.
///
/// Each tag becomes one `addTags` or `removeTags` call covering every note it
/// applies to.
#[derive(Debug, Clone, Default)]
pub struct TagPlan {
    add: BTreeMap<String, Vec<i64>>,
    remove: BTreeMap<String, Vec<i64>>,
}

impl TagPlan {
    /// An empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the change for one note.
    pub fn record(&mut self, note_id: i64, current: &[String], new: &[String]) {
        let diff = TagDiff::between(current, new);
        for tag in diff.to_add {
            self.add.entry(tag).or_default().push(note_id);
        }
        for tag in diff.to_remove {
            self.remove.entry(tag).or_default().push(note_id);
        }
    }

    /// Notes per tag to add.
    pub fn additions(&self) -> &BTreeMap<String, Vec<i64>> {
        &self.add
    }

    /// Notes per tag to remove.
    pub fn removals(&self) -> &BTreeMap<String, Vec<i64>> {
        &self.remove
    }

    /// Total number of (note, tag) additions.
    pub fn added_count(&self) -> usize {
        self.add.values().map(Vec::len).sum()
    }

    /// Total number of (note, tag) removals.
    pub fn removed_count(&self) -> usize {
        self.remove.values().map(Vec::len).sum()
    }

    /// Whether the plan changes nothing.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }

    /// The `addTags` sub-actions for a `multi` batch.
    pub fn add_actions(&self) -> Result<Vec<MultiAction>> {
        Ok(self
            .add
            .iter()
            .map(|(tag, notes)| MultiAction::add_tags(notes, tag))
            .collect::<anki_csv_connect::Result<_>>()?)
    }

    /// The `removeTags` sub-actions for a `multi` batch.
    pub fn remove_actions(&self) -> Result<Vec<MultiAction>> {
        Ok(self
            .remove
            .iter()
            .map(|(tag, notes)| MultiAction::remove_tags(notes, tag))
            .collect::<anki_csv_connect::Result<_>>()?)
    }
}
