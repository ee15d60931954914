#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use sheet_clean::config::{CleanConfig, WorkspaceLayout};
use tempfile::{TempDir, tempdir};

/// Scratch directory with a `data/` workspace inside; removed on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Root handed to `--workspace`.
    pub fn data_root(&self) -> PathBuf {
        self.path().join("data")
    }

    pub fn layout(&self) -> WorkspaceLayout {
        WorkspaceLayout::rooted_at(&self.data_root())
    }

    pub fn config(&self) -> CleanConfig {
        CleanConfig {
            workspace: self.layout(),
            ..CleanConfig::default()
        }
    }

    /// Writes `contents` into a file at the scratch root and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write temp file contents");
        path
    }

    pub fn cleaned(&self, name: &str) -> PathBuf {
        self.layout().cleaned_dir.join(name)
    }

    /// `sheet-clean` bound to this workspace.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("sheet-clean").expect("binary exists");
        cmd.arg("--workspace").arg(self.data_root());
        cmd
    }
}

/// Header `Année,Revenu Menage,Notes` with one fully empty row in the middle.
pub const SCENARIO_CSV: &str = "Année,Revenu Menage,Notes\n2021,1200,b\n,,\n2020,,\n";

/// What cleaning [`SCENARIO_CSV`] must produce.
pub const SCENARIO_CLEANED: &str = "annee,revenu,notes\n2020,0,b\n2021,1200,b\n";
