//! Structural cleanup: header canonicalization, empty row/column removal, and
//! exact duplicate removal.
//!
//! Canonical names are lowercase ASCII-folded snake case (`"Revenu Ménage"` →
//! `revenu_menage`). The synonym table is expressed in the same form, so this
//! stage has to run before reconciliation.

use std::collections::HashSet;

use log::debug;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::dataset::Dataset;

const EMPTY_NAME_FALLBACK: &str = "column";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructuralSummary {
    pub rows_dropped_empty: usize,
    pub columns_dropped_empty: usize,
    pub duplicates_dropped: usize,
}

pub fn canonicalize_name(name: &str) -> String {
    let folded: String = name
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect();

    let mut result = String::with_capacity(folded.len());
    let mut pending_separator = false;
    for c in folded.chars() {
        if c.is_alphanumeric() {
            if pending_separator && !result.is_empty() {
                result.push('_');
            }
            pending_separator = false;
            result.push(c);
        } else {
            pending_separator = true;
        }
    }

    if result.is_empty() {
        EMPTY_NAME_FALLBACK.to_string()
    } else {
        result
    }
}

/// Canonicalizes every header; names that collide after canonicalization get
/// `_1`, `_2`, ... suffixes in column order.
pub fn canonicalize_headers(dataset: &mut Dataset) {
    let mut seen: HashSet<String> = HashSet::new();
    for column in &mut dataset.columns {
        let base = canonicalize_name(&column.name);
        let mut candidate = base.clone();
        let mut counter = 0;
        while seen.contains(&candidate) {
            counter += 1;
            candidate = format!("{base}_{counter}");
        }
        if candidate != column.name {
            debug!("Header '{}' -> '{}'", column.name, candidate);
        }
        seen.insert(candidate.clone());
        column.name = candidate;
    }
}

/// Drops rows that are entirely absent, then columns that are entirely absent.
/// Returns `(rows_dropped, columns_dropped)`.
pub fn drop_empty(dataset: &mut Dataset) -> (usize, usize) {
    let rows_before = dataset.row_count();
    let keep: Vec<bool> = (0..rows_before)
        .map(|idx| dataset.row(idx).iter().any(|cell| !cell.is_absent()))
        .collect();
    dataset.retain_rows(&keep);
    let rows_dropped = rows_before - dataset.row_count();

    let columns_before = dataset.column_count();
    dataset.retain_columns(|column| !column.is_empty());
    (rows_dropped, columns_before - dataset.column_count())
}

/// Keeps the first occurrence of each exact row.
pub fn drop_duplicate_rows(dataset: &mut Dataset) -> usize {
    let rows_before = dataset.row_count();
    let mut seen = HashSet::with_capacity(rows_before);
    let keep: Vec<bool> = (0..rows_before)
        .map(|idx| seen.insert(dataset.row_key(idx)))
        .collect();
    dataset.retain_rows(&keep);
    rows_before - dataset.row_count()
}

pub fn structural_cleanup(dataset: &mut Dataset) -> StructuralSummary {
    canonicalize_headers(dataset);
    let (rows_dropped_empty, columns_dropped_empty) = drop_empty(dataset);
    let duplicates_dropped = drop_duplicate_rows(dataset);
    StructuralSummary {
        rows_dropped_empty,
        columns_dropped_empty,
        duplicates_dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Cell;

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    #[test]
    fn canonicalize_name_folds_accents_and_separators() {
        assert_eq!(canonicalize_name("Année"), "annee");
        assert_eq!(canonicalize_name("Revenu Menage"), "revenu_menage");
        assert_eq!(canonicalize_name("  Région -- (code)  "), "region_code");
        assert_eq!(canonicalize_name("Unnamed: 3"), "unnamed_3");
        assert_eq!(canonicalize_name("%%"), "column");
    }

    #[test]
    fn canonicalize_name_is_idempotent() {
        for raw in ["Année", "revenu_menage", "A.B.C", "Ünïcödé Name"] {
            let once = canonicalize_name(raw);
            assert_eq!(canonicalize_name(&once), once);
        }
    }

    #[test]
    fn canonicalize_headers_keeps_names_unique() {
        let mut dataset = Dataset::from_rows(
            vec!["Année".into(), "annee".into(), "ANNEE".into()],
            vec![vec![text("x"), text("y"), text("z")]],
        );
        canonicalize_headers(&mut dataset);
        assert_eq!(dataset.headers(), vec!["annee", "annee_1", "annee_2"]);
    }

    #[test]
    fn empty_rows_are_dropped_wherever_they_appear() {
        let mut dataset = Dataset::from_rows(
            vec!["a".into(), "b".into(), "c".into()],
            vec![
                vec![Cell::Absent, Cell::Absent, Cell::Absent],
                vec![text("1"), Cell::Absent, Cell::Absent],
                vec![Cell::Absent, Cell::Absent, Cell::Absent],
                vec![text("2"), text("x"), Cell::Absent],
                vec![Cell::Absent, Cell::Absent, Cell::Absent],
            ],
        );
        let (rows, columns) = drop_empty(&mut dataset);
        assert_eq!(rows, 3);
        assert_eq!(columns, 1);
        assert_eq!(dataset.headers(), vec!["a", "b"]);
        assert_eq!(dataset.columns[0].cells, vec![text("1"), text("2")]);
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let mut dataset = Dataset::from_rows(
            vec!["a".into(), "b".into()],
            vec![
                vec![Cell::Number(1.0), text("x")],
                vec![Cell::Number(2.0), text("y")],
                vec![Cell::Number(1.0), text("x")],
                vec![Cell::Number(1.0), Cell::Absent],
            ],
        );
        assert_eq!(drop_duplicate_rows(&mut dataset), 1);
        assert_eq!(dataset.row_count(), 3);
        assert_eq!(dataset.columns[1].cells[2], Cell::Absent);
    }
}
