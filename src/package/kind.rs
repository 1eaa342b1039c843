//! Package manager kinds and their fixed phase ordering.

use std::fmt;

use serde::Serialize;

use crate::platform::Platform;

/// Which adapter handles a package. One list file exists per kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PackageManagerKind {
    // =========================================================================
    // System packages first: they provide the language runtimes
    // =========================================================================
    /// The platform's own package manager (apt, pacman, or brew on macOS)
    System,

    // =========================================================================
    // Language package managers
    // =========================================================================
    /// Cargo - Rust crates installed with `cargo install`
    Cargo,
    /// pip - Python packages installed for the user
    Pip,
    /// npm - global Node packages
    Npm,

    // =========================================================================
    // Platform stores, last
    // =========================================================================
    /// Homebrew formulae
    Brew,
    /// Homebrew casks (macOS applications)
    Cask,
    /// Mac App Store, by app id
    Mas,
    /// Arch User Repository through yay or paru
    Aur,
}

impl PackageManagerKind {
    /// Every kind, in phase order.
    pub const ALL: [PackageManagerKind; 8] = [
        Self::System,
        Self::Cargo,
        Self::Pip,
        Self::Npm,
        Self::Brew,
        Self::Cask,
        Self::Mas,
        Self::Aur,
    ];

    /// Suffix of the list file, as in `config/packages.<suffix>`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Cargo => "cargo",
            Self::Pip => "pip",
            Self::Npm => "npm",
            Self::Brew => "brew",
            Self::Cask => "cask",
            Self::Mas => "mas",
            Self::Aur => "aur",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::System => "System",
            Self::Cargo => "Cargo",
            Self::Pip => "pip",
            Self::Npm => "npm",
            Self::Brew => "Homebrew",
            Self::Cask => "Homebrew Cask",
            Self::Mas => "Mac App Store",
            Self::Aur => "AUR",
        }
    }

    /// Whether packages of this kind can be installed on `platform` at all.
    pub fn supported_on(self, platform: Platform) -> bool {
        match self {
            Self::System | Self::Cargo | Self::Pip | Self::Npm => true,
            Self::Brew => matches!(platform, Platform::Mac | Platform::Wsl),
            Self::Cask | Self::Mas => platform == Platform::Mac,
            Self::Aur => platform == Platform::Arch,
        }
    }
}

impl fmt::Display for PackageManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_in_phase_order() {
        let mut sorted = PackageManagerKind::ALL;
        sorted.sort();
        assert_eq!(sorted, PackageManagerKind::ALL);
        assert_eq!(PackageManagerKind::ALL[0], PackageManagerKind::System);
        assert!(PackageManagerKind::Npm < PackageManagerKind::Brew);
    }

    #[test]
    fn test_suffixes_are_unique() {
        let suffixes: std::collections::HashSet<&str> =
            PackageManagerKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(suffixes.len(), PackageManagerKind::ALL.len());
        assert_eq!(PackageManagerKind::Cask.to_string(), "cask");
    }

    #[test]
    fn test_platform_support() {
        assert!(PackageManagerKind::Brew.supported_on(Platform::Wsl));
        assert!(!PackageManagerKind::Brew.supported_on(Platform::Arch));
        assert!(PackageManagerKind::Aur.supported_on(Platform::Arch));
        assert!(!PackageManagerKind::Aur.supported_on(Platform::Mac));
        assert!(!PackageManagerKind::Cask.supported_on(Platform::Wsl));
        for platform in Platform::ALL {
            assert!(PackageManagerKind::System.supported_on(platform));
            assert!(PackageManagerKind::Npm.supported_on(platform));
        }
    }
}
