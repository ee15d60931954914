//! The cleaning pipeline: load, structural cleanup, reconcile, fill missing
//! values, order rows deterministically, persist.
//!
//! Stages run once, in order, with no way back. A failing stage aborts the run
//! and leaves whatever earlier stages wrote on disk.

use std::{
    cmp::Ordering,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, info};

use crate::{
    config::CleanConfig,
    dataset::{Cell, Dataset, StorageType},
    io_utils,
    normalize::{self, StructuralSummary},
    reader::{self, DetectionReport},
    reconcile::{RenameMap, SynonymTable, build_rename_map},
};

#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub output: PathBuf,
    pub rows_in: usize,
    pub columns_in: usize,
    pub rows_out: usize,
    pub columns_out: usize,
    pub renames: RenameMap,
    pub detection: Option<DetectionReport>,
    pub structural: StructuralSummary,
    pub fill_duplicates_dropped: usize,
}

/// Result of the in-memory stages, before anything is written.
#[derive(Debug, Clone)]
pub struct CleanedDataset {
    pub dataset: Dataset,
    pub renames: RenameMap,
    pub structural: StructuralSummary,
    pub fill_duplicates_dropped: usize,
}

/// Runs stages 2 through 5 on an already-loaded dataset.
pub fn clean_dataset(mut dataset: Dataset, config: &CleanConfig) -> Result<CleanedDataset> {
    let table = SynonymTable::from_config(&config.synonyms)?;

    let structural = normalize::structural_cleanup(&mut dataset);
    debug!(
        "Structural cleanup dropped {} empty row(s), {} empty column(s), {} duplicate(s)",
        structural.rows_dropped_empty,
        structural.columns_dropped_empty,
        structural.duplicates_dropped
    );

    let renames = build_rename_map(&dataset.headers(), &table, config.similarity_threshold);
    let applied = renames.apply(&mut dataset);
    debug!("Applied {applied} of {} planned column rename(s)", renames.len());

    fill_missing(&mut dataset);
    let fill_duplicates_dropped = normalize::drop_duplicate_rows(&mut dataset);
    sort_rows(&mut dataset);

    Ok(CleanedDataset {
        dataset,
        renames,
        structural,
        fill_duplicates_dropped,
    })
}

/// Numeric-declared columns get `0` in their gaps; every other column is
/// forward-filled from the nearest preceding present value.
pub fn fill_missing(dataset: &mut Dataset) {
    for column in &mut dataset.columns {
        match column.storage {
            StorageType::Numeric => {
                for cell in column.cells.iter_mut().filter(|cell| cell.is_absent()) {
                    *cell = Cell::Number(0.0);
                }
            }
            StorageType::Text => {
                let mut last: Option<Cell> = None;
                for cell in &mut column.cells {
                    if cell.is_absent() {
                        if let Some(previous) = &last {
                            *cell = previous.clone();
                        }
                    } else {
                        last = Some(cell.clone());
                    }
                }
            }
        }
    }
}

/// Stable sort by the full row, compared column by column from the left.
pub fn sort_rows(dataset: &mut Dataset) {
    let mut order: Vec<usize> = (0..dataset.row_count()).collect();
    order.sort_by(|&a, &b| compare_rows(dataset, a, b));
    dataset.reorder_rows(&order);
}

fn compare_rows(dataset: &Dataset, a: usize, b: usize) -> Ordering {
    dataset
        .columns
        .iter()
        .map(|column| column.cells[a].sort_cmp(&column.cells[b]))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

pub fn cleaned_output_path(input: &Path, cleaned_dir: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());
    cleaned_dir.join(format!("{stem}{suffix}.csv"))
}

pub fn persist(dataset: &Dataset, output: &Path) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(output)?;
    if dataset.column_count() > 0 {
        writer
            .write_record(dataset.headers())
            .context("Writing output headers")?;
    }
    for (idx, row) in dataset.display_rows().into_iter().enumerate() {
        writer
            .write_record(&row)
            .with_context(|| format!("Writing output row {}", idx + 2))?;
    }
    writer.flush().context("Flushing output writer")?;
    Ok(())
}

/// Full pipeline from an input file to the cleaned file on disk.
pub fn clean_file(input: &Path, config: &CleanConfig) -> Result<CleanOutcome> {
    let loaded = reader::load_dataset(input, config)?;
    let rows_in = loaded.dataset.row_count();
    let columns_in = loaded.dataset.column_count();

    let cleaned = clean_dataset(loaded.dataset, config)
        .with_context(|| format!("Cleaning {input:?}"))?;
    let output = cleaned_output_path(
        input,
        &config.workspace.cleaned_dir,
        &config.output_suffix,
    );
    persist(&cleaned.dataset, &output)?;

    let outcome = CleanOutcome {
        output,
        rows_in,
        columns_in,
        rows_out: cleaned.dataset.row_count(),
        columns_out: cleaned.dataset.column_count(),
        renames: cleaned.renames,
        detection: loaded.detection,
        structural: cleaned.structural,
        fill_duplicates_dropped: cleaned.fill_duplicates_dropped,
    };
    info!(
        "Cleaned {} row(s) x {} column(s) -> {} row(s) x {} column(s) at {:?}",
        outcome.rows_in, outcome.columns_in, outcome.rows_out, outcome.columns_out, outcome.output
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    #[test]
    fn fill_missing_follows_declared_storage() {
        let mut dataset = Dataset::from_rows(
            vec!["revenu".into(), "region".into()],
            vec![
                vec![Cell::Absent, Cell::Absent],
                vec![Cell::Number(5.0), text("QC")],
                vec![Cell::Absent, Cell::Absent],
                vec![Cell::Number(7.0), text("ON")],
                vec![Cell::Absent, Cell::Absent],
            ],
        );
        fill_missing(&mut dataset);
        assert_eq!(
            dataset.columns[0].cells,
            vec![
                Cell::Number(0.0),
                Cell::Number(5.0),
                Cell::Number(0.0),
                Cell::Number(7.0),
                Cell::Number(0.0),
            ]
        );
        assert_eq!(
            dataset.columns[1].cells,
            vec![Cell::Absent, text("QC"), text("QC"), text("ON"), text("ON")]
        );
    }

    #[test]
    fn text_declared_column_is_forward_filled_even_when_numeric_looking() {
        let mut dataset = Dataset::from_rows(
            vec!["code".into()],
            vec![vec![text("1,5")], vec![Cell::Absent], vec![text("2")]],
        );
        fill_missing(&mut dataset);
        assert_eq!(
            dataset.columns[0].cells,
            vec![text("1,5"), text("1,5"), text("2")]
        );
    }

    #[test]
    fn sort_rows_uses_every_column_left_to_right() {
        let mut dataset = Dataset::from_rows(
            vec!["a".into(), "b".into()],
            vec![
                vec![Cell::Number(2.0), text("x")],
                vec![Cell::Number(1.0), text("z")],
                vec![Cell::Number(1.0), text("y")],
                vec![Cell::Absent, text("a")],
            ],
        );
        sort_rows(&mut dataset);
        assert_eq!(
            dataset.columns[0].cells,
            vec![
                Cell::Number(1.0),
                Cell::Number(1.0),
                Cell::Number(2.0),
                Cell::Absent
            ]
        );
        assert_eq!(
            dataset.columns[1].cells,
            vec![text("y"), text("z"), text("x"), text("a")]
        );
    }

    #[test]
    fn output_name_uses_stem_and_suffix() {
        let path = cleaned_output_path(
            Path::new("data/raw/data_34.xlsx"),
            Path::new("data/cleaned"),
            "_cleaned",
        );
        assert_eq!(path, PathBuf::from("data/cleaned/data_34_cleaned.csv"));
    }

    #[test]
    fn clean_dataset_renames_and_fills() {
        let dataset = Dataset::from_rows(
            vec!["Année".into(), "Revenu Menage".into(), "Notes".into()],
            vec![
                vec![Cell::Number(2021.0), Cell::Number(1200.0), text("b")],
                vec![Cell::Number(2020.0), Cell::Absent, Cell::Absent],
                vec![Cell::Absent, Cell::Absent, Cell::Absent],
            ],
        );
        let cleaned = clean_dataset(dataset, &CleanConfig::default()).expect("clean");
        assert_eq!(cleaned.dataset.headers(), vec!["annee", "revenu", "notes"]);
        assert_eq!(cleaned.structural.rows_dropped_empty, 1);
        assert_eq!(cleaned.renames.get("revenu_menage"), Some("revenu"));
        assert_eq!(
            cleaned.dataset.columns[1].cells,
            vec![Cell::Number(0.0), Cell::Number(1200.0)]
        );
        // "notes" is forward-filled in file order, before the rows are sorted.
        assert_eq!(cleaned.dataset.columns[2].cells, vec![text("b"), text("b")]);
    }
}
