use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch directory holding a config file and a package list directory.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        fs::create_dir_all(temp_dir.path().join("config"))?;
        Ok(Self { temp_dir })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path passed as `--config-file`; created with defaults on first use.
    pub fn config_file(&self) -> PathBuf {
        self.path().join("devrestore.toml")
    }

    /// Directory passed as `--config-dir`.
    pub fn list_dir(&self) -> PathBuf {
        self.path().join("config")
    }

    /// Write `config/packages.<suffix>` with one entry per line.
    pub fn write_list(&self, suffix: &str, lines: &[&str]) -> Result<()> {
        let mut contents = lines.join("\n");
        contents.push('\n');
        fs::write(self.list_dir().join(format!("packages.{}", suffix)), contents)?;
        Ok(())
    }

    pub fn write_config(&self, contents: &str) -> Result<()> {
        fs::write(self.config_file(), contents)?;
        Ok(())
    }
}
