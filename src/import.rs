//! Importing sources into the raw directory.
//!
//! A source is either a local path (copied) or an `http(s)` URL (downloaded
//! with a bounded wait). Each import gets a unique workspace name, is recorded
//! in the registry, and becomes the last-imported dataset.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::Duration,
};

use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use regex::Regex;
use reqwest::header::CONTENT_TYPE;

use crate::{
    config::CleanConfig,
    error::CleanError,
    io_utils,
    reader::SourceFormat,
    registry::{LastImported, NameRegistry, RegistryEntry},
};

const DEFAULT_EXTENSION: &str = "csv";
const NAME_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub name: String,
    pub path: PathBuf,
    pub entry: RegistryEntry,
}

pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

pub fn slugify(text: &str) -> String {
    static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
    let pattern = NON_ALNUM.get_or_init(|| Regex::new("[^a-z0-9]+").expect("valid regex"));
    pattern
        .replace_all(&text.to_lowercase(), "_")
        .trim_matches('_')
        .to_string()
}

/// `base` if free, otherwise the first free `base_1`, `base_2`, ...
pub fn unique_name(base: &str, registry: &dyn NameRegistry) -> String {
    if !registry.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|idx| format!("{base}_{idx}"))
        .find(|candidate| !registry.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

fn source_stem(source: &str) -> String {
    let trimmed = source.trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed)
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let stem = Path::new(last)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let candidate = if stem.is_empty() { last } else { stem.as_str() };
    let slug = slugify(&candidate.chars().take(NAME_MAX_CHARS).collect::<String>());
    if slug.is_empty() {
        "data".to_string()
    } else {
        slug
    }
}

/// A user-chosen name becomes a single path component inside the raw
/// directory, so it goes through the same slug rules as derived names.
fn requested_slug(requested: &str) -> Result<String, CleanError> {
    let slug = slugify(&requested.chars().take(NAME_MAX_CHARS).collect::<String>());
    if slug.is_empty() {
        return Err(CleanError::InvalidName {
            name: requested.to_string(),
        });
    }
    if slug != requested {
        warn!("Requested name '{requested}' stored as '{slug}'");
    }
    Ok(slug)
}

fn source_extension(source: &str) -> String {
    let path_part = source.split(['?', '#']).next().unwrap_or(source);
    Path::new(path_part)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| SourceFormat::from_extension(ext).is_ok())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

pub fn import_source(
    source: &str,
    requested_name: Option<&str>,
    config: &CleanConfig,
    registry: &mut dyn NameRegistry,
) -> Result<ImportOutcome> {
    let source = source.trim();
    let name = match requested_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(requested) => {
            let name = requested_slug(requested)?;
            if registry.contains(&name) {
                return Err(CleanError::NameTaken { name }.into());
            }
            name
        }
        None => unique_name(&source_stem(source), registry),
    };

    let layout = &config.workspace;
    fs::create_dir_all(&layout.raw_dir)
        .with_context(|| format!("Creating raw directory {:?}", layout.raw_dir))?;
    let destination = layout
        .raw_dir
        .join(format!("{name}.{}", source_extension(source)));

    if is_url(source) {
        download(source, &destination, config.fetch_timeout_secs)?;
    } else {
        let local = Path::new(source);
        if !local.exists() {
            return Err(CleanError::MissingInput {
                path: local.to_path_buf(),
            }
            .into());
        }
        fs::copy(local, &destination)
            .with_context(|| format!("Copying {local:?} to {destination:?}"))?;
    }
    info!("Stored '{source}' as {destination:?}");

    let sample = io_utils::read_prefix(&destination, config.detection.encoding_sample_bytes)?;
    let encoding = io_utils::detect_encoding(&sample)
        .map(|encoding| encoding.name().to_string())
        .unwrap_or_else(|| "UTF-8".to_string());
    let entry = RegistryEntry {
        source: source.to_string(),
        path: destination.clone(),
        encoding,
        imported_at: Some(Utc::now()),
    };
    registry.register(&name, entry.clone())?;
    LastImported::new(&layout.last_imported_path).write(&name)?;

    Ok(ImportOutcome {
        name,
        path: destination,
        entry,
    })
}

fn download(url: &str, destination: &Path, timeout_secs: u64) -> Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("Building HTTP client")?;
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Fetching {url}"))?;
    let status = response.status();
    if !status.is_success() {
        return Err(CleanError::NotAFile {
            source_ref: url.to_string(),
            reason: format!("HTTP status {status}"),
        }
        .into());
    }
    let is_html = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("text/html"));
    if is_html {
        return Err(CleanError::NotAFile {
            source_ref: url.to_string(),
            reason: "the server returned an HTML page".to_string(),
        }
        .into());
    }
    let body = response
        .bytes()
        .with_context(|| format!("Reading response body from {url}"))?;
    fs::write(destination, &body).with_context(|| format!("Writing {destination:?}"))?;
    Ok(())
}

/// Imports every source in turn. Failures are logged and skipped; the last
/// successful import is returned.
pub fn import_sources(
    sources: &[String],
    requested_name: Option<&str>,
    config: &CleanConfig,
    registry: &mut dyn NameRegistry,
) -> Option<ImportOutcome> {
    let mut last = None;
    let total = sources.len();
    for (idx, source) in sources.iter().enumerate() {
        info!("Import {}/{}: {}", idx + 1, total, source);
        match import_source(source, requested_name, config, registry) {
            Ok(outcome) => last = Some(outcome),
            Err(err) => warn!("Import of '{source}' failed: {err:#}"),
        }
    }
    last
}

/// Splits a comma-separated source list, dropping blanks.
pub fn split_sources<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .flat_map(|value| value.as_ref().split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}
