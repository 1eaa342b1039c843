use std::path::PathBuf;

use thiserror::Error;

use crate::package::PackageManagerKind;

#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Could not bootstrap {tool} for {kind} packages: {reason}")]
    BootstrapFailure {
        kind: PackageManagerKind,
        tool: String,
        reason: String,
    },

    #[error("Failed to install {package} via {kind}: {reason}")]
    PackageInstallFailure {
        kind: PackageManagerKind,
        package: String,
        reason: String,
    },

    #[error("No package list at {0}")]
    ConfigSourceMissing(PathBuf),

    #[error("No package manager could be made available for any phase")]
    NoPackageManager,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
