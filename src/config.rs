//! Run configuration: workspace layout, synonym table, thresholds, and the
//! detection fallback policy.
//!
//! Everything the pipeline needs is carried by [`CleanConfig`] and passed in
//! explicitly. The YAML form mirrors the struct one-to-one; every field has a
//! default so a partial file is enough.

use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CleanError;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;
pub const DEFAULT_NUMERIC_THRESHOLD: f64 = 0.8;
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_cleaned";

const DEFAULT_MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CleanConfig {
    pub workspace: WorkspaceLayout,
    pub synonyms: Vec<SynonymConfig>,
    pub similarity_threshold: f64,
    pub numeric_threshold: f64,
    pub output_suffix: String,
    pub missing_tokens: Vec<String>,
    pub detection: DetectionPolicy,
    pub fetch_timeout_secs: u64,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            workspace: WorkspaceLayout::default(),
            synonyms: default_synonyms(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            numeric_threshold: DEFAULT_NUMERIC_THRESHOLD,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            missing_tokens: DEFAULT_MISSING_TOKENS
                .iter()
                .map(|token| token.to_string())
                .collect(),
            detection: DetectionPolicy::default(),
            fetch_timeout_secs: 30,
        }
    }
}

impl CleanConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config: CleanConfig = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config file {path:?}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_yaml::to_string(self).context("Serializing config")?;
        let mut file =
            File::create(path).with_context(|| format!("Creating config file {path:?}"))?;
        file.write_all(serialized.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), CleanError> {
        for (label, value) in [
            ("similarity_threshold", self.similarity_threshold),
            ("numeric_threshold", self.numeric_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(CleanError::InvalidConfig(format!(
                    "{label} must lie in (0, 1], got {value}"
                )));
            }
        }
        if self.detection.encoding_sample_bytes == 0 || self.detection.delimiter_sample_chars == 0
        {
            return Err(CleanError::InvalidConfig(
                "detection sample sizes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkspaceLayout {
    pub raw_dir: PathBuf,
    pub cleaned_dir: PathBuf,
    pub registry_path: PathBuf,
    pub last_imported_path: PathBuf,
}

impl Default for WorkspaceLayout {
    fn default() -> Self {
        Self::rooted_at(Path::new("data"))
    }
}

impl WorkspaceLayout {
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            raw_dir: root.join("raw"),
            cleaned_dir: root.join("cleaned"),
            registry_path: root.join("dictionary.json"),
            last_imported_path: root.join("last_imported.txt"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SynonymConfig {
    pub canonical: String,
    pub variants: Vec<String>,
}

fn default_synonyms() -> Vec<SynonymConfig> {
    let entry = |canonical: &str, variants: &[&str]| SynonymConfig {
        canonical: canonical.to_string(),
        variants: variants.iter().map(|v| v.to_string()).collect(),
    };
    vec![
        entry("annee", &["annee", "année", "an", "year"]),
        entry("mois", &["mois", "month"]),
        entry("region", &["region", "région", "reg"]),
        entry("revenu", &["revenu", "income", "revenu_menage"]),
    ]
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EncodingFallback {
    #[default]
    DefaultToUtf8,
    Fail,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DelimiterFallback {
    #[default]
    DefaultToComma,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DetectionPolicy {
    pub encoding_sample_bytes: usize,
    pub delimiter_sample_chars: usize,
    pub on_encoding_unknown: EncodingFallback,
    pub on_delimiter_unknown: DelimiterFallback,
    /// Skips encoding detection when set (any WHATWG label).
    pub encoding: Option<String>,
    /// Skips delimiter sniffing when set.
    pub delimiter: Option<u8>,
}

impl Default for DetectionPolicy {
    fn default() -> Self {
        Self {
            encoding_sample_bytes: 10_000,
            delimiter_sample_chars: 2_048,
            on_encoding_unknown: EncodingFallback::default(),
            on_delimiter_unknown: DelimiterFallback::default(),
            encoding: None,
            delimiter: None,
        }
    }
}
