//! Registry of imported datasets, keyed by their workspace name.
//!
//! The on-disk form is a single pretty-printed JSON object. Concurrent writers
//! are not supported: every `register` rewrites the whole file.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CleanError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub source: String,
    pub path: PathBuf,
    pub encoding: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<DateTime<Utc>>,
}

pub trait NameRegistry {
    fn lookup(&self, name: &str) -> Option<RegistryEntry>;
    fn register(&mut self, name: &str, entry: RegistryEntry) -> Result<()>;
    fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NameRegistry for MemoryRegistry {
    fn lookup(&self, name: &str) -> Option<RegistryEntry> {
        self.entries.get(name).cloned()
    }

    fn register(&mut self, name: &str, entry: RegistryEntry) -> Result<()> {
        if self.entries.contains_key(name) {
            return Err(CleanError::NameTaken {
                name: name.to_string(),
            }
            .into());
        }
        self.entries.insert(name.to_string(), entry);
        Ok(())
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

#[derive(Debug, Clone)]
pub struct JsonFileRegistry {
    path: PathBuf,
    entries: BTreeMap<String, RegistryEntry>,
}

impl JsonFileRegistry {
    /// Opens the registry at `path`; a missing file is an empty registry.
    pub fn open(path: &Path) -> Result<Self> {
        let entries = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Reading registry {path:?}"))?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw).with_context(|| format!("Parsing registry {path:?}"))?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating registry directory {parent:?}"))?;
        }
        let serialized =
            serde_json::to_string_pretty(&self.entries).context("Serializing registry")?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Writing registry {:?}", self.path))
    }
}

impl NameRegistry for JsonFileRegistry {
    fn lookup(&self, name: &str) -> Option<RegistryEntry> {
        self.entries.get(name).cloned()
    }

    fn register(&mut self, name: &str, entry: RegistryEntry) -> Result<()> {
        if self.entries.contains_key(name) {
            return Err(CleanError::NameTaken {
                name: name.to_string(),
            }
            .into());
        }
        self.entries.insert(name.to_string(), entry);
        self.save()
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

/// Plain-text marker holding the name of the most recent import.
#[derive(Debug, Clone)]
pub struct LastImported {
    path: PathBuf,
}

impl LastImported {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Reading last-imported marker {:?}", self.path))?;
        let name = raw.trim();
        Ok((!name.is_empty()).then(|| name.to_string()))
    }

    pub fn write(&self, name: &str) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, name)
            .with_context(|| format!("Writing last-imported marker {:?}", self.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(source: &str) -> RegistryEntry {
        RegistryEntry {
            source: source.to_string(),
            path: PathBuf::from(format!("data/raw/{source}")),
            encoding: "UTF-8".to_string(),
            imported_at: None,
        }
    }

    #[test]
    fn memory_registry_rejects_taken_names() {
        let mut registry = MemoryRegistry::new();
        registry.register("sales", entry("a.csv")).expect("first");
        assert!(registry.contains("sales"));
        let err = registry.register("sales", entry("b.csv")).expect_err("taken");
        assert!(matches!(
            err.downcast_ref::<CleanError>(),
            Some(CleanError::NameTaken { .. })
        ));
        assert_eq!(registry.lookup("sales"), Some(entry("a.csv")));
    }

    #[test]
    fn json_registry_persists_between_opens() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("dictionary.json");
        let mut registry = JsonFileRegistry::open(&path).expect("open empty");
        assert!(!registry.contains("data_1"));
        registry.register("data_1", entry("x.csv")).expect("register");

        let reopened = JsonFileRegistry::open(&path).expect("reopen");
        assert_eq!(reopened.lookup("data_1"), Some(entry("x.csv")));
        assert_eq!(reopened.names().collect::<Vec<_>>(), vec!["data_1"]);
    }

    #[test]
    fn json_registry_accepts_empty_object_file() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("dictionary.json");
        fs::write(&path, "{}").expect("seed");
        let registry = JsonFileRegistry::open(&path).expect("open");
        assert!(registry.lookup("anything").is_none());
    }

    #[test]
    fn last_imported_round_trip() {
        let dir = tempdir().expect("temp dir");
        let marker = LastImported::new(&dir.path().join("last_imported.txt"));
        assert_eq!(marker.read().expect("read"), None);
        marker.write("data_34").expect("write");
        assert_eq!(marker.read().expect("read"), Some("data_34".to_string()));
    }
}
