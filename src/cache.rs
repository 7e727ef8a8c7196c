use std::collections::{BTreeMap, HashMap};

use crate::languages::LanguageCatalog;

/// Stored when the response decoded but lacked the language.
pub const NOT_AVAILABLE_PLACEHOLDER: &str = "Translation not available";
/// Stored for every language when the request for a line failed.
pub const FAILED_PLACEHOLDER: &str = "Error: Could not translate";

/// Source line -> translations, in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineEntries {
    entries: Vec<(String, Vec<String>)>,
}

impl LineEntries {
    /// Replaces the value of an existing line in place, otherwise appends.
    pub fn insert(&mut self, line: impl Into<String>, translation: impl Into<String>) {
        let line = line.into();
        let value = vec![translation.into()];
        match self.entries.iter_mut().find(|(known, _)| *known == line) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((line, value)),
        }
    }

    pub fn get(&self, line: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(known, _)| known == line)
            .map(|(_, values)| values.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(line, values)| (line.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What the remote call produced for one line.
#[derive(Debug, Clone)]
pub enum LineOutcome {
    Translated(BTreeMap<String, String>),
    Failed,
}

/// Per-language cache of the current run.
#[derive(Debug, Clone, Default)]
pub struct TranslationCache {
    languages: HashMap<String, LineEntries>,
}

impl TranslationCache {
    pub fn clear(&mut self) {
        self.languages.clear();
    }

    /// Writes the entry of `line` for every catalog language in one step.
    pub fn record(&mut self, catalog: &LanguageCatalog, line: &str, outcome: &LineOutcome) {
        for code in catalog.codes() {
            let value = match outcome {
                LineOutcome::Translated(map) => map
                    .get(code)
                    .map(String::as_str)
                    .filter(|text| !text.trim().is_empty())
                    .unwrap_or(NOT_AVAILABLE_PLACEHOLDER),
                LineOutcome::Failed => FAILED_PLACEHOLDER,
            };
            self.languages
                .entry(code.to_string())
                .or_default()
                .insert(line, value);
        }
    }

    pub fn language(&self, code: &str) -> Option<&LineEntries> {
        self.languages.get(code)
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}
