//! Installer command table, one row per (kind, platform).
//!
//! This is the only place that knows installer argument syntax. Adapters
//! read a [`ManagerCommands`] row and never branch on the kind themselves.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::PackageManagerKind;
use super::spec::package_key;
use crate::platform::Platform;

/// How to read a listing command's stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    /// One package name per line
    Lines,
    /// `dpkg-query -W -f='${db:Status-Abbrev} ${Package}\n'`
    DpkgStatus,
    /// `cargo install --list`: `name v1.2.3:` followed by indented binaries
    CargoInstallList,
    /// `pip list --format=freeze`: `name==1.2.3`
    PipFreeze,
    /// `npm ls -g --depth=0 --json`
    NpmJson,
    /// `mas list`: `<id>  <name>  (<version>)`
    MasList,
}

/// A command used to enumerate packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListCommand {
    pub program: &'static str,
    pub args: &'static [&'static str],
    pub format: ListFormat,
}

const fn list(
    program: &'static str,
    args: &'static [&'static str],
    format: ListFormat,
) -> ListCommand {
    ListCommand {
        program,
        args,
        format,
    }
}

/// Everything an adapter needs to drive one installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerCommands {
    pub kind: PackageManagerKind,
    /// Installer executables in preference order; the first one present is used.
    pub tools: &'static [&'static str],
    /// Arguments placed before the package name.
    pub install_args: &'static [&'static str],
    /// Run once before the first install of a run (index refresh).
    pub prepare_args: Option<&'static [&'static str]>,
    /// Everything present on the host, for the already-installed check.
    pub installed: ListCommand,
    /// What the user chose to install, for backups.
    pub selected: ListCommand,
    pub needs_root: bool,
}

/// AUR helpers understood by the `aur` kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AurHelper {
    #[default]
    Yay,
    Paru,
}

impl AurHelper {
    fn preference(self) -> &'static [&'static str] {
        match self {
            AurHelper::Yay => &["yay", "paru"],
            AurHelper::Paru => &["paru", "yay"],
        }
    }
}

const APT_STATUS: ListCommand = list(
    "dpkg-query",
    &["-W", "-f=${db:Status-Abbrev} ${Package}\n"],
    ListFormat::DpkgStatus,
);
const BREW_FORMULAE: ListCommand = list("brew", &["list", "--formula", "-1"], ListFormat::Lines);
const BREW_LEAVES: ListCommand = list("brew", &["leaves"], ListFormat::Lines);

/// Command row for `kind` on `platform`, or `None` if the kind does not
/// exist there.
pub fn commands_for(
    kind: PackageManagerKind,
    platform: Platform,
    aur_helper: AurHelper,
) -> Option<ManagerCommands> {
    if !kind.supported_on(platform) {
        return None;
    }

    let row = match (kind, platform) {
        (PackageManagerKind::System, Platform::Wsl) => ManagerCommands {
            kind,
            tools: &["apt-get"],
            install_args: &["install", "-y"],
            prepare_args: Some(&["update"]),
            installed: APT_STATUS,
            selected: list("apt-mark", &["showmanual"], ListFormat::Lines),
            needs_root: true,
        },
        (PackageManagerKind::System, Platform::Arch) => ManagerCommands {
            kind,
            tools: &["pacman"],
            install_args: &["-S", "--needed", "--noconfirm"],
            prepare_args: None,
            installed: list("pacman", &["-Qq"], ListFormat::Lines),
            selected: list("pacman", &["-Qqen"], ListFormat::Lines),
            needs_root: true,
        },
        (PackageManagerKind::System, Platform::Mac) | (PackageManagerKind::Brew, _) => {
            ManagerCommands {
                kind,
                tools: &["brew"],
                install_args: &["install"],
                prepare_args: None,
                installed: BREW_FORMULAE,
                selected: BREW_LEAVES,
                needs_root: false,
            }
        }
        (PackageManagerKind::Cargo, _) => ManagerCommands {
            kind,
            tools: &["cargo"],
            install_args: &["install"],
            prepare_args: None,
            installed: list("cargo", &["install", "--list"], ListFormat::CargoInstallList),
            selected: list("cargo", &["install", "--list"], ListFormat::CargoInstallList),
            needs_root: false,
        },
        (PackageManagerKind::Pip, _) => ManagerCommands {
            kind,
            tools: &["pip3"],
            install_args: &["install", "--user"],
            prepare_args: None,
            installed: list("pip3", &["list", "--format=freeze"], ListFormat::PipFreeze),
            selected: list(
                "pip3",
                &["list", "--user", "--not-required", "--format=freeze"],
                ListFormat::PipFreeze,
            ),
            needs_root: false,
        },
        (PackageManagerKind::Npm, _) => ManagerCommands {
            kind,
            tools: &["npm"],
            install_args: &["install", "-g"],
            prepare_args: None,
            installed: list("npm", &["ls", "-g", "--depth=0", "--json"], ListFormat::NpmJson),
            selected: list("npm", &["ls", "-g", "--depth=0", "--json"], ListFormat::NpmJson),
            needs_root: false,
        },
        (PackageManagerKind::Cask, _) => ManagerCommands {
            kind,
            tools: &["brew"],
            install_args: &["install", "--cask"],
            prepare_args: None,
            installed: list("brew", &["list", "--cask", "-1"], ListFormat::Lines),
            selected: list("brew", &["list", "--cask", "-1"], ListFormat::Lines),
            needs_root: false,
        },
        (PackageManagerKind::Mas, _) => ManagerCommands {
            kind,
            tools: &["mas"],
            install_args: &["install"],
            prepare_args: None,
            installed: list("mas", &["list"], ListFormat::MasList),
            selected: list("mas", &["list"], ListFormat::MasList),
            needs_root: false,
        },
        (PackageManagerKind::Aur, _) => ManagerCommands {
            kind,
            tools: aur_helper.preference(),
            install_args: &["-S", "--needed", "--noconfirm"],
            prepare_args: None,
            installed: list("pacman", &["-Qqm"], ListFormat::Lines),
            selected: list("pacman", &["-Qqem"], ListFormat::Lines),
            needs_root: false,
        },
    };

    Some(row)
}

/// Parse a listing command's stdout into package keys.
pub fn parse_listing(kind: PackageManagerKind, format: ListFormat, stdout: &str) -> BTreeSet<String> {
    let names: Vec<String> = match format {
        ListFormat::Lines => stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        ListFormat::DpkgStatus => stdout
            .lines()
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                let status = parts.next()?;
                let name = parts.next()?;
                (status == "ii").then(|| name.split(':').next().unwrap_or(name).to_string())
            })
            .collect(),
        ListFormat::CargoInstallList => stdout
            .lines()
            .filter(|line| !line.starts_with(char::is_whitespace))
            .filter_map(|line| line.split_whitespace().next())
            .map(str::to_string)
            .collect(),
        ListFormat::PipFreeze => stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('-') && !l.starts_with('#'))
            .filter_map(|l| l.split("==").next())
            .map(|l| l.split(" @ ").next().unwrap_or(l).to_string())
            .collect(),
        ListFormat::NpmJson => serde_json::from_str::<serde_json::Value>(stdout)
            .ok()
            .and_then(|v| v.get("dependencies").and_then(|d| d.as_object()).cloned())
            .map(|deps| deps.keys().cloned().collect())
            .unwrap_or_default(),
        ListFormat::MasList => stdout
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .filter(|id| id.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string)
            .collect(),
    };

    names
        .into_iter()
        .map(|name| package_key(kind, &name))
        .collect()
}
