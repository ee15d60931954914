//! Resolving user input to raw files and locating cleaned output.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::{
    config::WorkspaceLayout, error::CleanError, reader::SourceFormat, registry::LastImported,
};

pub fn ensure_dirs(layout: &WorkspaceLayout) -> Result<()> {
    for dir in [&layout.raw_dir, &layout.cleaned_dir] {
        fs::create_dir_all(dir).with_context(|| format!("Creating directory {dir:?}"))?;
    }
    Ok(())
}

/// Resolves what to clean:
///
/// - no argument: the last imported name, looked up in the raw directory;
/// - an existing path: used as is;
/// - anything else: treated as a bare name and looked up in the raw directory.
pub fn resolve_input(arg: Option<&str>, layout: &WorkspaceLayout) -> Result<PathBuf> {
    let arg = arg.map(str::trim).filter(|value| !value.is_empty());
    let Some(arg) = arg else {
        let marker = LastImported::new(&layout.last_imported_path);
        let name = marker.read()?.ok_or_else(|| CleanError::MissingInput {
            path: layout.last_imported_path.clone(),
        })?;
        return find_raw(&name, layout).ok_or_else(|| {
            CleanError::MissingInput {
                path: layout.raw_dir.join(format!("{name}.*")),
            }
            .into()
        });
    };

    let direct = PathBuf::from(arg);
    if direct.exists() {
        return Ok(direct);
    }
    let stem = direct
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| arg.to_string());
    find_raw(&stem, layout).ok_or_else(|| CleanError::MissingInput { path: direct }.into())
}

fn find_raw(stem: &str, layout: &WorkspaceLayout) -> Option<PathBuf> {
    SourceFormat::extensions()
        .map(|ext| layout.raw_dir.join(format!("{stem}.{ext}")))
        .find(|candidate| candidate.exists())
}

/// Cleaned files in the cleaned directory, sorted by path.
pub fn list_cleaned(layout: &WorkspaceLayout, suffix: &str) -> Result<Vec<PathBuf>> {
    if !layout.cleaned_dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(&layout.cleaned_dir)
        .with_context(|| format!("Listing {:?}", layout.cleaned_dir))?
    {
        let path = entry?.path();
        let is_cleaned = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| stem.ends_with(suffix));
        if path.is_file() && is_cleaned && has_extension(&path, &["csv", "xlsx"]) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Cleaned file for the raw stem `stem`, if one exists.
pub fn find_cleaned(stem: &str, layout: &WorkspaceLayout, suffix: &str) -> Option<PathBuf> {
    ["csv", "xlsx"]
        .iter()
        .map(|ext| layout.cleaned_dir.join(format!("{stem}{suffix}.{ext}")))
        .find(|candidate| candidate.exists())
}

/// Resolves which cleaned file to analyse:
///
/// - an existing path: used as is;
/// - a bare name: its cleaned counterpart, with or without the suffix;
/// - no argument: the cleaned counterpart of the last import, else the most
///   recently modified cleaned file.
pub fn resolve_cleaned(
    arg: Option<&str>,
    layout: &WorkspaceLayout,
    suffix: &str,
) -> Result<PathBuf> {
    if let Some(arg) = arg.map(str::trim).filter(|value| !value.is_empty()) {
        let direct = PathBuf::from(arg);
        if direct.exists() {
            return Ok(direct);
        }
        let stem = direct
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| arg.to_string());
        let base = stem.strip_suffix(suffix).unwrap_or(&stem);
        return find_cleaned(base, layout, suffix)
            .ok_or_else(|| CleanError::MissingInput { path: direct }.into());
    }

    if let Some(name) = LastImported::new(&layout.last_imported_path).read()?
        && let Some(found) = find_cleaned(&name, layout, suffix)
    {
        return Ok(found);
    }
    let newest = list_cleaned(layout, suffix)?
        .into_iter()
        .filter_map(|path| {
            let modified = fs::metadata(&path).and_then(|meta| meta.modified()).ok()?;
            Some((modified, path))
        })
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, path)| path);
    newest.ok_or_else(|| {
        CleanError::MissingInput {
            path: layout.cleaned_dir.clone(),
        }
        .into()
    })
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| ext.eq_ignore_ascii_case(a)))
}
