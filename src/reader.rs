//! Loading delimited text and spreadsheet files into a [`Dataset`].
//!
//! Text inputs go through encoding and delimiter detection first; both degrade
//! to the configured default when the sample is inconclusive. Spreadsheets are
//! read from their first worksheet with no detection at all.

use std::{
    collections::HashSet,
    fmt,
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use calamine::{Data, DataType, Reader, open_workbook_auto};
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info, warn};

use crate::{
    config::{CleanConfig, DelimiterFallback, DetectionPolicy, EncodingFallback},
    dataset::{Cell, Column, Dataset, StorageType, format_number},
    error::CleanError,
    io_utils,
};

const DELIMITED_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited,
    Spreadsheet,
}

impl SourceFormat {
    /// Every extension the loader accepts, lowercase, delimited formats first.
    pub fn extensions() -> impl Iterator<Item = &'static str> {
        DELIMITED_EXTENSIONS
            .iter()
            .chain(SPREADSHEET_EXTENSIONS)
            .copied()
    }

    pub fn from_extension(extension: &str) -> Result<Self, CleanError> {
        let lowered = extension.to_ascii_lowercase();
        if DELIMITED_EXTENSIONS.contains(&lowered.as_str()) {
            Ok(SourceFormat::Delimited)
        } else if SPREADSHEET_EXTENSIONS.contains(&lowered.as_str()) {
            Ok(SourceFormat::Spreadsheet)
        } else {
            Err(CleanError::UnsupportedFormat { extension: lowered })
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, CleanError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        Self::from_extension(extension)
    }
}

/// What the loader settled on for a text input, and whether it had to fall
/// back to a default to get there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionReport {
    pub encoding: &'static Encoding,
    pub delimiter: u8,
    pub encoding_fallback: bool,
    pub delimiter_fallback: bool,
}

impl fmt::Display for DetectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "encoding {}{}, delimiter '{}'{}",
            self.encoding.name(),
            if self.encoding_fallback { " (default)" } else { "" },
            io_utils::printable_delimiter(self.delimiter),
            if self.delimiter_fallback { " (default)" } else { "" },
        )
    }
}

#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub path: PathBuf,
    pub format: SourceFormat,
    pub dataset: Dataset,
    pub detection: Option<DetectionReport>,
}

pub fn load_dataset(path: &Path, config: &CleanConfig) -> Result<LoadedDataset> {
    if !path.exists() {
        return Err(CleanError::MissingInput {
            path: path.to_path_buf(),
        }
        .into());
    }
    let format = SourceFormat::from_path(path)?;
    let missing = MissingTokens::new(&config.missing_tokens);
    let (dataset, detection) = match format {
        SourceFormat::Delimited => {
            let report = detect_text_layout(path, &config.detection)?;
            info!("Reading {:?} with {}", path, report);
            let dataset = read_delimited(path, &report, &missing)?;
            (dataset, Some(report))
        }
        SourceFormat::Spreadsheet => {
            info!("Reading first worksheet of {:?}", path);
            (read_spreadsheet(path, &missing)?, None)
        }
    };
    info!(
        "Loaded {} row(s) x {} column(s) from {:?}",
        dataset.row_count(),
        dataset.column_count(),
        path
    );
    Ok(LoadedDataset {
        path: path.to_path_buf(),
        format,
        dataset,
        detection,
    })
}

pub fn detect_text_layout(path: &Path, policy: &DetectionPolicy) -> Result<DetectionReport> {
    let (encoding, encoding_fallback) = match policy.encoding.as_deref() {
        Some(label) => (io_utils::resolve_encoding(Some(label))?, false),
        None => {
            let sample = io_utils::read_prefix(path, policy.encoding_sample_bytes)?;
            match io_utils::detect_encoding(&sample) {
                Some(encoding) => (encoding, false),
                None => match policy.on_encoding_unknown {
                    EncodingFallback::DefaultToUtf8 => {
                        warn!("Encoding of {path:?} is inconclusive; assuming utf-8");
                        (UTF_8, true)
                    }
                    EncodingFallback::Fail => {
                        return Err(CleanError::DetectionFailed {
                            what: "encoding",
                            path: path.to_path_buf(),
                        }
                        .into());
                    }
                },
            }
        }
    };

    let (delimiter, delimiter_fallback) = match policy.delimiter {
        Some(delimiter) => (delimiter, false),
        None => {
            let sample = decoded_prefix(path, encoding, policy.delimiter_sample_chars)?;
            match io_utils::sniff_delimiter(&sample) {
                Some(delimiter) => (delimiter, false),
                None => match policy.on_delimiter_unknown {
                    DelimiterFallback::DefaultToComma => {
                        let delimiter = extension_delimiter(path);
                        debug!(
                            "No delimiter found in sample of {:?}; using '{}'",
                            path,
                            io_utils::printable_delimiter(delimiter)
                        );
                        (delimiter, true)
                    }
                    DelimiterFallback::Fail => {
                        return Err(CleanError::DetectionFailed {
                            what: "delimiter",
                            path: path.to_path_buf(),
                        }
                        .into());
                    }
                },
            }
        }
    };

    Ok(DetectionReport {
        encoding,
        delimiter,
        encoding_fallback,
        delimiter_fallback,
    })
}

fn extension_delimiter(path: &Path) -> u8 {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => io_utils::DEFAULT_TSV_DELIMITER,
        _ => io_utils::DEFAULT_CSV_DELIMITER,
    }
}

fn decoded_prefix(path: &Path, encoding: &'static Encoding, chars: usize) -> Result<String> {
    let reader = io_utils::open_decoded_reader(path, encoding)?;
    let mut bytes = Vec::new();
    reader
        .take((chars * 4) as u64)
        .read_to_end(&mut bytes)
        .with_context(|| format!("Sampling {path:?} for delimiter detection"))?;
    Ok(String::from_utf8_lossy(&bytes).chars().take(chars).collect())
}

struct MissingTokens(HashSet<String>);

impl MissingTokens {
    fn new(tokens: &[String]) -> Self {
        Self(tokens.iter().cloned().collect())
    }

    fn is_missing(&self, raw: &str) -> bool {
        raw.is_empty() || self.0.contains(raw)
    }
}

fn read_delimited(
    path: &Path,
    report: &DetectionReport,
    missing: &MissingTokens,
) -> Result<Dataset> {
    let decoded = io_utils::open_decoded_reader(path, report.encoding)?;
    let mut reader = io_utils::open_csv_reader(decoded, report.delimiter);
    let mut records = reader.records();

    let headers = match records.next() {
        Some(record) => record
            .with_context(|| format!("Reading header of {path:?}"))?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>(),
        None => return Ok(Dataset::default()),
    };

    let mut raw_rows: Vec<Vec<Option<String>>> = Vec::new();
    for (idx, record) in records.enumerate() {
        let record = record.with_context(|| format!("Reading row {} of {path:?}", idx + 2))?;
        raw_rows.push(
            record
                .iter()
                .map(|field| (!missing.is_missing(field)).then(|| field.to_string()))
                .collect(),
        );
    }

    let headers = mangle_headers(headers);
    let width = headers.len();
    let columns = headers
        .into_iter()
        .enumerate()
        .map(|(col_idx, name)| {
            let raw: Vec<Option<&str>> = raw_rows
                .iter()
                .map(|row| row.get(col_idx).and_then(|cell| cell.as_deref()))
                .collect();
            Column::new(name, text_column_cells(&raw))
        })
        .collect::<Vec<_>>();
    debug!("Parsed {} column(s) from {:?}", width, path);
    Dataset::new(columns)
}

/// Text fields become numbers only when the whole column parses, mirroring a
/// dataframe reader that picks one dtype per column. Spellings that parse to
/// NaN load as absent.
fn text_column_cells(raw: &[Option<&str>]) -> Vec<Cell> {
    let parsed: Option<Vec<Option<f64>>> = raw
        .iter()
        .map(|value| match value {
            None => Some(None),
            Some(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .map(|number| (!number.is_nan()).then_some(number)),
        })
        .collect();
    match parsed {
        Some(numbers) => numbers
            .into_iter()
            .map(|n| n.map(Cell::Number).unwrap_or(Cell::Absent))
            .collect(),
        None => raw
            .iter()
            .map(|value| match value {
                Some(text) => Cell::Text(text.to_string()),
                None => Cell::Absent,
            })
            .collect(),
    }
}

fn read_spreadsheet(path: &Path, missing: &MissingTokens) -> Result<Dataset> {
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("Opening workbook {path:?}"))?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.with_context(|| format!("Reading first worksheet of {path:?}"))?,
        None => return Ok(Dataset::default()),
    };

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header) => header.iter().map(header_text).collect::<Vec<_>>(),
        None => return Ok(Dataset::default()),
    };
    let body = rows
        .map(|row| row.iter().map(|cell| spreadsheet_cell(cell, missing)).collect())
        .collect();
    Ok(uniform_text_columns(Dataset::from_rows(
        mangle_headers(headers),
        body,
    )))
}

/// Numbers in a text column become their display text, matching how the
/// column reads back from the cleaned CSV.
fn uniform_text_columns(mut dataset: Dataset) -> Dataset {
    for column in dataset
        .columns
        .iter_mut()
        .filter(|column| column.storage == StorageType::Text)
    {
        for cell in column.cells.iter_mut() {
            if let Cell::Number(value) = *cell {
                *cell = Cell::Text(format_number(value));
            }
        }
    }
    dataset
}

fn header_text(cell: &Data) -> String {
    match spreadsheet_cell(cell, &MissingTokens(HashSet::new())) {
        Cell::Absent => String::new(),
        other => other.as_display(),
    }
}

fn spreadsheet_cell(cell: &Data, missing: &MissingTokens) -> Cell {
    match cell {
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Float(value) if value.is_nan() => Cell::Absent,
        Data::Float(value) => Cell::Number(*value),
        Data::Bool(value) => Cell::Text(if *value { "True" } else { "False" }.to_string()),
        Data::String(text) | Data::DateTimeIso(text) | Data::DurationIso(text) => {
            if missing.is_missing(text) {
                Cell::Absent
            } else {
                Cell::Text(text.clone())
            }
        }
        Data::DateTime(_) => match cell.as_datetime() {
            Some(value) => Cell::Text(value.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Cell::Absent,
        },
        Data::Error(_) | Data::Empty => Cell::Absent,
    }
}

/// Blank headers become `Unnamed: <idx>`; repeated headers get `.1`, `.2`, ...
pub fn mangle_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut output = Vec::with_capacity(headers.len());
    for (idx, header) in headers.into_iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("Unnamed: {idx}")
        } else {
            header
        };
        let mut candidate = base.clone();
        let mut counter = 1;
        while seen.contains(&candidate) {
            candidate = format!("{base}.{counter}");
            counter += 1;
        }
        seen.insert(candidate.clone());
        output.push(candidate);
    }
    output
}
