//! I/O utilities for delimited text: encoding and delimiter detection,
//! decoding readers, and the CSV writer used to persist cleaned output.
//!
//! - **Encoding**: explicit label via [`resolve_encoding`], or sample-based
//!   detection with [`detect_encoding`] (BOM, then UTF-8 validity, then a
//!   statistical guess over the legacy encodings).
//! - **Delimiter**: explicit value or [`sniff_delimiter`] over a decoded
//!   character prefix.
//! - **Reading**: [`open_decoded_reader`] transcodes to UTF-8 on the fly so
//!   the `csv` reader only ever sees UTF-8.
//! - **Writing**: [`open_csv_writer`] always writes UTF-8 with minimal quoting.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use chardetng::EncodingDetector;
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use encoding_rs_io::DecodeReaderBytesBuilder;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

const DELIMITER_CANDIDATES: &[u8] = &[b',', b';', b'\t', b'|'];
const SNIFF_MAX_LINES: usize = 10;

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

/// Guesses the encoding of `sample`. Returns `None` when the sample carries no
/// signal (empty).
pub fn detect_encoding(sample: &[u8]) -> Option<&'static Encoding> {
    if sample.is_empty() {
        return None;
    }
    if let Some((encoding, _bom_len)) = Encoding::for_bom(sample) {
        return Some(encoding);
    }
    match std::str::from_utf8(sample) {
        Ok(_) => Some(UTF_8),
        // A multi-byte sequence cut off by the sample boundary is still UTF-8.
        Err(err) if err.error_len().is_none() && err.valid_up_to() > 0 => Some(UTF_8),
        Err(_) => {
            let mut detector = EncodingDetector::new();
            detector.feed(sample, true);
            Some(detector.guess(None, false))
        }
    }
}

pub fn read_prefix(path: &Path, limit: usize) -> Result<Vec<u8>> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    let mut buffer = Vec::with_capacity(limit.min(64 * 1024));
    file.take(limit as u64)
        .read_to_end(&mut buffer)
        .with_context(|| format!("Reading sample from {path:?}"))?;
    Ok(buffer)
}

/// Picks the candidate delimiter whose per-line count is both frequent and
/// consistent. Characters inside double quotes are not counted.
pub fn sniff_delimiter(sample: &str) -> Option<u8> {
    let lines: Vec<&str> = sample
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_MAX_LINES)
        .collect();
    if lines.is_empty() {
        return None;
    }

    let mut best: Option<(u8, f64)> = None;
    for &candidate in DELIMITER_CANDIDATES {
        let counts: Vec<f64> = lines
            .iter()
            .map(|line| count_unquoted(line, candidate) as f64)
            .collect();
        let mean = counts.iter().sum::<f64>() / counts.len() as f64;
        if mean == 0.0 {
            continue;
        }
        let variance =
            counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / counts.len() as f64;
        let score = mean / (1.0 + variance.sqrt());
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }
    best.map(|(delimiter, _)| delimiter)
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Returns a reader yielding UTF-8 bytes decoded from `path` with `encoding`.
/// A byte-order mark, when present, is stripped.
pub fn open_decoded_reader(path: &Path, encoding: &'static Encoding) -> Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    let decoder = DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .bom_override(true)
        .build(BufReader::new(file));
    Ok(Box::new(decoder))
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_writer(path: &Path) -> Result<csv::Writer<Box<dyn Write>>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Creating output directory {parent:?}"))?;
    }
    let base: Box<dyn Write> = Box::new(BufWriter::new(
        File::create(path).with_context(|| format!("Creating output file {path:?}"))?,
    ));
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(DEFAULT_CSV_DELIMITER)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(base))
}

pub fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
