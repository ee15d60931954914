//! Error taxonomy for the cleaning core.
//!
//! Structural failures (missing input, unsupported format) are fatal and carry
//! enough detail to be shown to the end user as-is. Detection problems never
//! reach this type unless the configuration asks for them to be fatal.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CleanError {
    #[error(
        "Unsupported file format '.{extension}' (use csv, tsv, txt, xlsx, xlsm, xlsb, xls or ods)"
    )]
    UnsupportedFormat { extension: String },

    #[error("Input file not found: {}", path.display())]
    MissingInput { path: PathBuf },

    #[error("'{source_ref}' does not point to a downloadable file ({reason})")]
    NotAFile { source_ref: String, reason: String },

    #[error("The name '{name}' is already registered")]
    NameTaken { name: String },

    #[error("'{name}' cannot be used as a dataset name (use letters or digits)")]
    InvalidName { name: String },

    #[error("Canonical column '{canonical}' is declared more than once in the synonym table")]
    DuplicateCanonical { canonical: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Could not detect the {what} of {}", path.display())]
    DetectionFailed { what: &'static str, path: PathBuf },

    #[error("Column '{0}' not found")]
    UnknownColumn(String),

    #[error("Column '{0}' is not numeric")]
    NotNumeric(String),
}
