//! In-memory tabular dataset shared by every pipeline stage.
//!
//! A [`Dataset`] is an ordered list of named [`Column`]s of equal length. Each
//! column remembers the [`StorageType`] it was declared with at load time; the
//! missing-value policy keys off that declaration, never off the current cell
//! contents.

use std::{cmp::Ordering, fmt};

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Text(String),
    Number(f64),
    Absent,
}

impl Cell {
    pub fn is_absent(&self) -> bool {
        matches!(self, Cell::Absent)
    }

    pub fn as_display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
            Cell::Absent => String::new(),
        }
    }

    /// Total order used by the deterministic row sort: numbers, then text,
    /// then absent cells last.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Cell::Number(a), Cell::Number(b)) => a.total_cmp(b),
            (Cell::Text(a), Cell::Text(b)) => a.cmp(b),
            (Cell::Absent, Cell::Absent) => Ordering::Equal,
            (Cell::Number(_), _) => Ordering::Less,
            (_, Cell::Number(_)) => Ordering::Greater,
            (Cell::Text(_), Cell::Absent) => Ordering::Less,
            (Cell::Absent, Cell::Text(_)) => Ordering::Greater,
        }
    }

    /// Hashable identity used for duplicate detection.
    pub(crate) fn identity(&self) -> CellKey {
        match self {
            Cell::Text(s) => CellKey::Text(s.clone()),
            Cell::Number(n) if n.is_nan() => CellKey::Number(f64::NAN.to_bits()),
            Cell::Number(n) if *n == 0.0 => CellKey::Number(0f64.to_bits()),
            Cell::Number(n) => CellKey::Number(n.to_bits()),
            Cell::Absent => CellKey::Absent,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum CellKey {
    Text(String),
    Number(u64),
    Absent,
}

pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageType {
    Numeric,
    Text,
}

impl StorageType {
    /// Declared type of a freshly loaded column: numeric only when every
    /// present cell is already a number.
    pub fn infer(cells: &[Cell]) -> Self {
        if cells
            .iter()
            .all(|cell| matches!(cell, Cell::Number(_) | Cell::Absent))
        {
            StorageType::Numeric
        } else {
            StorageType::Text
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub storage: StorageType,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        let storage = StorageType::infer(&cells);
        Self {
            name: name.into(),
            storage,
            cells,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Cell::is_absent)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub columns: Vec<Column>,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let len = first.cells.len();
            ensure!(
                columns.iter().all(|c| c.cells.len() == len),
                "All columns must hold the same number of cells"
            );
        }
        Ok(Self { columns })
    }

    /// Builds a dataset from row-major cells, padding short rows with
    /// [`Cell::Absent`] and ignoring cells beyond the header width.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = headers.len();
        let mut columns_cells: Vec<Vec<Cell>> = vec![Vec::with_capacity(rows.len()); width];
        for row in rows {
            let mut iter = row.into_iter();
            for cells in columns_cells.iter_mut() {
                cells.push(iter.next().unwrap_or(Cell::Absent));
            }
        }
        let columns = headers
            .into_iter()
            .zip(columns_cells)
            .map(|(name, cells)| Column::new(name, cells))
            .collect();
        Self { columns }
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.cells.len()).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn row(&self, index: usize) -> Vec<&Cell> {
        self.columns.iter().map(|c| &c.cells[index]).collect()
    }

    pub(crate) fn row_key(&self, index: usize) -> Vec<CellKey> {
        self.columns
            .iter()
            .map(|c| c.cells[index].identity())
            .collect()
    }

    /// Keeps rows whose entry in `keep` is true.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        for column in &mut self.columns {
            let mut flags = keep.iter();
            column
                .cells
                .retain(|_| flags.next().copied().unwrap_or(false));
        }
    }

    pub fn retain_columns<F>(&mut self, keep: F)
    where
        F: FnMut(&Column) -> bool,
    {
        self.columns.retain(keep);
    }

    /// Reorders rows according to `order`, a permutation of row indices.
    pub fn reorder_rows(&mut self, order: &[usize]) {
        for column in &mut self.columns {
            let reordered = order.iter().map(|&idx| column.cells[idx].clone()).collect();
            column.cells = reordered;
        }
    }

    pub fn display_rows(&self) -> Vec<Vec<String>> {
        (0..self.row_count())
            .map(|idx| self.row(idx).into_iter().map(Cell::as_display).collect())
            .collect()
    }
}
