//! `devrestore.toml`: defaults for every run, overridable from the CLI.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::common::config::DocumentedConfig;
use crate::common::paths;
use crate::documented_config;
use crate::package::{AurHelper, ExecutorOptions, MultiPackagePolicy};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreConfig {
    /// Directory holding the `packages.<kind>` lists
    pub config_dir: String,
    /// Seconds before a single installer invocation is killed
    pub install_timeout_secs: u64,
    /// Seconds before a tool bootstrap (rustup, Homebrew, yay) is killed
    pub bootstrap_timeout_secs: u64,
    /// How a name translated to several packages is judged: all or any
    pub multi_package_policy: MultiPackagePolicy,
    /// Install missing package-manager tools before their phase
    pub bootstrap: bool,
    /// Extra directories searched for package-manager executables
    pub extra_paths: Vec<String>,
    /// Preferred AUR helper on Arch
    pub aur_helper: Option<AurHelper>,
    /// Shell commands replacing the built-in bootstrap recipes, by tool name
    pub bootstrap_commands: Option<BTreeMap<String, String>>,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            config_dir: "config".to_string(),
            install_timeout_secs: 300,
            bootstrap_timeout_secs: 1800,
            multi_package_policy: MultiPackagePolicy::All,
            bootstrap: true,
            extra_paths: Vec::new(),
            aur_helper: None,
            bootstrap_commands: None,
        }
    }
}

documented_config!(RestoreConfig {
    fields: [
        config_dir, "Directory holding the packages.<kind> lists",
        install_timeout_secs, "Seconds before a single installer is killed",
        bootstrap_timeout_secs, "Seconds before a tool bootstrap is killed",
        multi_package_policy, "Translated names with several packages: all or any must install",
        bootstrap, "Install missing package-manager tools (rustup, Homebrew, yay)",
        extra_paths, "Extra directories searched for package-manager executables",
    ],
    optional: [
        aur_helper, "Preferred AUR helper (yay or paru)",
        bootstrap_commands, "Shell commands replacing built-in bootstrap recipes, by tool",
    ],
    config_path: paths::config_file(),
});

impl RestoreConfig {
    /// Load from `path`, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_path_documented(path)?,
            None => Self::load_from_path_documented(&Self::config_path()?)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.install_timeout_secs == 0 {
            bail!("install_timeout_secs must be greater than zero");
        }
        if self.bootstrap_timeout_secs == 0 {
            bail!("bootstrap_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn list_dir(&self) -> PathBuf {
        paths::expand_path(&self.config_dir)
    }

    pub fn extra_dirs(&self) -> Vec<PathBuf> {
        self.extra_paths
            .iter()
            .map(|p| paths::expand_path(p))
            .collect()
    }

    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            timeout: Duration::from_secs(self.install_timeout_secs),
            bootstrap_timeout: Duration::from_secs(self.bootstrap_timeout_secs),
            policy: self.multi_package_policy,
            bootstrap: self.bootstrap,
        }
    }

    pub fn bootstrap_overrides(&self) -> BTreeMap<String, String> {
        self.bootstrap_commands.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_file_is_created_with_documentation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/devrestore.toml");

        let config = RestoreConfig::load(Some(&path)).unwrap();
        assert_eq!(config, RestoreConfig::default());

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("install_timeout_secs = 300  # "));
        assert!(written.contains("multi_package_policy = \"all\""));
        assert!(written.contains("# aur_helper = \"yay\""));

        // The generated file parses back to the same config
        assert_eq!(RestoreConfig::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devrestore.toml");
        fs::write(
            &path,
            "multi_package_policy = \"any\"\naur_helper = \"paru\"\n\n[bootstrap_commands]\ncargo = \"pacman -S --noconfirm rustup\"\n",
        )
        .unwrap();

        let config = RestoreConfig::load(Some(&path)).unwrap();
        assert_eq!(config.multi_package_policy, MultiPackagePolicy::Any);
        assert_eq!(config.aur_helper, Some(AurHelper::Paru));
        assert_eq!(config.install_timeout_secs, 300);
        assert_eq!(
            config.bootstrap_overrides().get("cargo").map(String::as_str),
            Some("pacman -S --noconfirm rustup")
        );
        assert_eq!(config.executor_options().timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devrestore.toml");
        fs::write(&path, "install_timeout_secs = 0\n").unwrap();
        assert!(RestoreConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_invalid_policy_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devrestore.toml");
        fs::write(&path, "multi_package_policy = \"some\"\n").unwrap();
        assert!(RestoreConfig::load(Some(&path)).is_err());
    }
}
