//! Column reconciliation: mapping arbitrary headers onto canonical names.
//!
//! A header is renamed when it equals one of an entry's variants or when its
//! best similarity to a variant reaches the acceptance threshold. Entries are
//! consulted in table order and the first one that accepts a header wins, so
//! the table doubles as a priority list.

use std::collections::{BTreeMap, HashSet};

use log::{debug, warn};
use similar::TextDiff;

use crate::{
    config::SynonymConfig, dataset::Dataset, error::CleanError, normalize::canonicalize_name,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymEntry {
    pub canonical: String,
    variants: Vec<String>,
}

impl SynonymEntry {
    pub fn variants(&self) -> &[String] {
        &self.variants
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynonymTable {
    entries: Vec<SynonymEntry>,
}

impl SynonymTable {
    /// Variants are stored in canonical header form so that comparison is
    /// insensitive to case and accents.
    pub fn new<I, S, V>(entries: I) -> Result<Self, CleanError>
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: IntoIterator,
        V::Item: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut table = Vec::new();
        for (canonical, variants) in entries {
            let canonical = canonical.into();
            if !seen.insert(canonical.clone()) {
                return Err(CleanError::DuplicateCanonical { canonical });
            }
            let mut normalized: Vec<String> = Vec::new();
            for variant in variants {
                let variant = canonicalize_name(variant.as_ref());
                if !normalized.contains(&variant) {
                    normalized.push(variant);
                }
            }
            table.push(SynonymEntry {
                canonical,
                variants: normalized,
            });
        }
        Ok(Self { entries: table })
    }

    pub fn from_config(entries: &[SynonymConfig]) -> Result<Self, CleanError> {
        Self::new(
            entries
                .iter()
                .map(|entry| (entry.canonical.clone(), entry.variants.iter())),
        )
    }

    pub fn entries(&self) -> &[SynonymEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry accepting `name`, exactly or approximately.
    pub fn match_name(&self, name: &str, threshold: f64) -> Option<&SynonymEntry> {
        self.entries.iter().find(|entry| {
            entry.variants.iter().any(|variant| variant == name)
                || best_similarity(name, &entry.variants) >= threshold
        })
    }
}

/// Ratio of matching characters to combined length: `2 * M / (|a| + |b|)`.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    f64::from(TextDiff::from_chars(a, b).ratio())
}

fn best_similarity(name: &str, variants: &[String]) -> f64 {
    variants
        .iter()
        .map(|variant| similarity(name, variant))
        .fold(0.0, f64::max)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMap {
    renames: BTreeMap<String, String>,
}

impl RenameMap {
    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.renames.len()
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.renames.get(original).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.renames
            .iter()
            .map(|(from, to)| (from.as_str(), to.as_str()))
    }

    /// Renames matching columns in place and returns how many were renamed.
    pub fn apply(&self, dataset: &mut Dataset) -> usize {
        let mut applied = 0;
        for column in &mut dataset.columns {
            if let Some(target) = self.renames.get(&column.name) {
                debug!("Renaming column '{}' -> '{}'", column.name, target);
                column.name = target.clone();
                applied += 1;
            }
        }
        applied
    }
}

/// Builds the rename map for `columns`.
///
/// A rename is admitted only while no other column holds the target name,
/// walking columns in order; a later column that would collide keeps its
/// original name. The names after [`RenameMap::apply`] are therefore unique
/// whenever `columns` were.
pub fn build_rename_map(columns: &[String], table: &SynonymTable, threshold: f64) -> RenameMap {
    let mut current: HashSet<&str> = columns.iter().map(String::as_str).collect();
    let mut renames = BTreeMap::new();

    for column in columns {
        let Some(entry) = table.match_name(column, threshold) else {
            continue;
        };
        let target = entry.canonical.as_str();
        if target == column {
            continue;
        }
        if current.contains(target) {
            warn!(
                "Column '{column}' matches '{target}' but that name is already taken; \
                 keeping '{column}'"
            );
            continue;
        }
        current.remove(column.as_str());
        current.insert(target);
        renames.insert(column.clone(), target.to_string());
    }

    RenameMap { renames }
}
