//! Snapshot of which executables the host can run right now.
//!
//! Installing the system phase or bootstrapping a tool can add executables
//! in directories that are not on this process's `PATH` yet (`~/.cargo/bin`,
//! `/opt/homebrew/bin`, ...). Instead of re-sourcing shell profiles, the
//! executor asks a [`CapabilityProbe`] for a fresh [`Capabilities`] value at
//! defined points and hands that value to every adapter call.

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Executables any adapter or bootstrap may look up.
pub const KNOWN_TOOLS: &[&str] = &[
    "sh",
    "sudo",
    "curl",
    "git",
    "apt-get",
    "dpkg-query",
    "apt-mark",
    "pacman",
    "makepkg",
    "yay",
    "paru",
    "brew",
    "mas",
    "rustup",
    "cargo",
    "python3",
    "pip3",
    "node",
    "npm",
];

/// Which tools were found, and the search path used to find them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    search_path: Vec<PathBuf>,
    tools: BTreeMap<String, PathBuf>,
}

impl Capabilities {
    /// Build a snapshot from explicit tool locations (used by fakes).
    pub fn from_tools<I, S>(tools: I) -> Self
    where
        I: IntoIterator<Item = (S, PathBuf)>,
        S: Into<String>,
    {
        Self {
            search_path: Vec::new(),
            tools: tools.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn resolve(&self, tool: &str) -> Option<&Path> {
        self.tools.get(tool).map(PathBuf::as_path)
    }

    pub fn has(&self, tool: &str) -> bool {
        self.tools.contains_key(tool)
    }

    /// Names of every tool that was found.
    pub fn available(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// `PATH` value for child processes, so installers see the same tools.
    pub fn path_env(&self) -> Option<OsString> {
        if self.search_path.is_empty() {
            return None;
        }
        env::join_paths(&self.search_path).ok()
    }
}

/// Source of capability snapshots.
pub trait CapabilityProbe {
    fn probe(&self) -> Capabilities;
}

/// Probes the process `PATH` plus well-known install locations.
pub struct PathProbe {
    extra_dirs: Vec<PathBuf>,
}

impl PathProbe {
    pub fn new(extra_dirs: Vec<PathBuf>) -> Self {
        let mut all = default_tool_dirs();
        for dir in extra_dirs {
            if !all.contains(&dir) {
                all.push(dir);
            }
        }
        Self { extra_dirs: all }
    }

    fn search_path(&self) -> Vec<PathBuf> {
        let mut path: Vec<PathBuf> = env::var_os("PATH")
            .map(|p| env::split_paths(&p).collect())
            .unwrap_or_default();
        for dir in &self.extra_dirs {
            if !path.contains(dir) {
                path.push(dir.clone());
            }
        }
        path
    }
}

impl CapabilityProbe for PathProbe {
    fn probe(&self) -> Capabilities {
        let search_path = self.search_path();
        let joined = env::join_paths(&search_path).unwrap_or_default();
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));

        let tools = KNOWN_TOOLS
            .iter()
            .filter_map(|tool| {
                which::which_in(tool, Some(&joined), &cwd)
                    .ok()
                    .map(|found| (tool.to_string(), found))
            })
            .collect();

        Capabilities { search_path, tools }
    }
}

/// Directories installers drop binaries into that a fresh shell may not
/// have on `PATH` yet.
fn default_tool_dirs() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".cargo/bin"));
        candidates.push(home.join(".local/bin"));
        candidates.push(home.join(".npm-global/bin"));
    }
    candidates.push(PathBuf::from("/opt/homebrew/bin"));
    candidates.push(PathBuf::from("/usr/local/bin"));
    candidates.push(PathBuf::from("/home/linuxbrew/.linuxbrew/bin"));
    candidates
}
