//! Note types as stored in `col.models`, and which cards a note gets.

use std::collections::BTreeSet;

use serde::Deserialize;

use super::fields::strip_html;

/// `type` of a cloze note type.
pub const MODEL_CLOZE: i64 = 1;

/// A note type, read from its JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct Model {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: i64,
    pub flds: Vec<ModelField>,
    pub tmpls: Vec<ModelTemplate>,
    #[serde(default)]
    pub sortf: usize,
    #[serde(default)]
    pub req: Vec<Requirement>,
}

/// A field of a note type.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelField {
    pub name: String,
    pub ord: usize,
}

/// A card template of a note type.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelTemplate {
    pub name: String,
    pub ord: usize,
    #[serde(default)]
    pub qfmt: String,
}

/// Which fields a template needs: `[ord, "any" | "all" | "none", [field ords]]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Requirement(pub usize, pub String, pub Vec<usize>);

impl Model {
    /// Whether this is a cloze note type.
    pub fn is_cloze(&self) -> bool {
        self.kind == MODEL_CLOZE
    }

    /// Field names in order.
    pub fn field_names(&self) -> Vec<&str> {
        let mut fields: Vec<_> = self.flds.iter().collect();
        fields.sort_by_key(|f| f.ord);
        fields.into_iter().map(|f| f.name.as_str()).collect()
    }

    /// Index of the field shown in the browser's sort column.
    pub fn sort_index(&self) -> usize {
        if self.sortf < self.flds.len() {
            self.sortf
        } else {
            0
        }
    }

    /// Template ordinals that produce a card for these field values.
    pub fn card_ordinals(&self, fields: &[String]) -> Vec<usize> {
        if self.is_cloze() {
            self.cloze_ordinals(fields)
        } else {
            self.standard_ordinals(fields)
        }
    }

    fn standard_ordinals(&self, fields: &[String]) -> Vec<usize> {
        let filled = |ord: &usize| {
            fields
                .get(*ord)
                .is_some_and(|f| !strip_html(f).trim().is_empty())
        };

        let requirements = if self.req.is_empty() {
            self.derived_requirements()
        } else {
            self.req.clone()
        };

        requirements
            .iter()
            .filter(|Requirement(_, kind, ords)| match kind.as_str() {
                "any" => ords.iter().any(filled),
                "all" => ords.iter().all(filled),
                _ => false,
            })
            .map(|Requirement(ord, _, _)| *ord)
            .collect()
    }

    /// Requirements for note types that do not store them: each template
    /// needs any of the fields its front side references.
    fn derived_requirements(&self) -> Vec<Requirement> {
        let names = self.field_names();
        self.tmpls
            .iter()
            .map(|template| {
                let referenced: Vec<usize> = names
                    .iter()
                    .enumerate()
                    .filter(|(_, name)| template.qfmt.contains(&format!("{{{{{}}}}}", name)))
                    .map(|(i, _)| i)
                    .collect();

                if referenced.is_empty() {
                    Requirement(template.ord, "any".to_string(), vec![0])
                } else {
                    Requirement(template.ord, "any".to_string(), referenced)
                }
            })
            .collect()
    }

    fn cloze_ordinals(&self, fields: &[String]) -> Vec<usize> {
        let names = self.field_names();
        let qfmt = self.tmpls.first().map(|t| t.qfmt.as_str()).unwrap_or("");

        let mut sources: Vec<&String> = names
            .iter()
            .zip(fields)
            .filter(|(name, _)| qfmt.contains(&format!("cloze:{}}}}}", name)))
            .map(|(_, value)| value)
            .collect();
        if sources.is_empty() {
            sources = fields.iter().collect();
        }

        let numbers: BTreeSet<usize> = sources.iter().flat_map(|f| cloze_numbers(f)).collect();
        numbers.into_iter().map(|n| n - 1).collect()
    }
}

/// Distinct cloze numbers (`{{c3::...}}` gives 3) in a field.
pub fn cloze_numbers(text: &str) -> BTreeSet<usize> {
    let mut numbers = BTreeSet::new();
    let mut rest = text;

    while let Some(start) = rest.find("{{c") {
        rest = &rest[start + 3..];
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        if digits.is_empty() || !rest[digits.len()..].starts_with("::") {
            continue;
        }
        if let Ok(n) = digits.parse::<usize>() {
            if n > 0 {
                numbers.insert(n);
            }
        }
    }

    numbers
}
