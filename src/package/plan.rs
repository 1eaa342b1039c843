//! Turns package lists into ordered, deduplicated installation phases.
//!
//! Reading the list files is the only I/O here; [`plan`] itself is a pure
//! function of the platform and the parsed sources.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use super::PackageManagerKind;
use super::spec::PackageSpec;
use crate::error::RestoreError;
use crate::platform::Platform;
use crate::ui::{Level, emit};

/// Contents of one `packages.<kind>` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSource {
    pub kind: PackageManagerKind,
    pub origin: PathBuf,
    pub lines: Vec<String>,
}

impl ListSource {
    pub fn from_text(kind: PackageManagerKind, origin: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            kind,
            origin: origin.into(),
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn specs(&self) -> impl Iterator<Item = PackageSpec> + '_ {
        self.lines
            .iter()
            .filter_map(|line| PackageSpec::parse_line(line, self.kind))
    }
}

/// Path of the list file for `kind` inside `dir`.
pub fn list_path(dir: &Path, kind: PackageManagerKind) -> PathBuf {
    dir.join(format!("packages.{}", kind.as_str()))
}

/// Read every list file under each directory, in directory order then kind
/// order. Absent directories, absent files and empty files contribute nothing.
pub fn read_sources(dirs: &[PathBuf]) -> Result<Vec<ListSource>> {
    let mut sources = Vec::new();

    for dir in dirs {
        if !dir.is_dir() {
            emit(
                Level::Warn,
                "restore.plan.dir_missing",
                &format!(
                    "Package list directory {} does not exist; nothing to read there",
                    dir.display()
                ),
                None,
            );
            continue;
        }

        for kind in PackageManagerKind::ALL {
            let path = list_path(dir, kind);
            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    log_missing(&path);
                    continue;
                }
                Err(e) => {
                    return Err(RestoreError::from(e))
                        .with_context(|| format!("reading {}", path.display()));
                }
            };

            let source = ListSource::from_text(kind, &path, &text);
            if source.specs().next().is_none() {
                log_missing(&path);
                continue;
            }
            sources.push(source);
        }
    }

    Ok(sources)
}

fn log_missing(path: &Path) {
    emit(
        Level::Debug,
        "restore.plan.source_missing",
        &RestoreError::ConfigSourceMissing(path.to_path_buf()).to_string(),
        None,
    );
}

/// Packages of one kind, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallationPhase {
    pub kind: PackageManagerKind,
    pub packages: Vec<PackageSpec>,
}

impl InstallationPhase {
    pub fn names(&self) -> Vec<&str> {
        self.packages.iter().map(|p| p.name.as_str()).collect()
    }
}

/// A kind with packages listed that this platform has no manager for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkippedKind {
    pub kind: PackageManagerKind,
    pub packages: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub platform: Platform,
    pub phases: Vec<InstallationPhase>,
    pub skipped: Vec<SkippedKind>,
}

impl Plan {
    pub fn total_packages(&self) -> usize {
        self.phases.iter().map(|p| p.packages.len()).sum()
    }

    /// Keep only the given kinds; an empty filter keeps everything.
    pub fn restrict_to(mut self, kinds: &[PackageManagerKind]) -> Self {
        if !kinds.is_empty() {
            self.phases.retain(|p| kinds.contains(&p.kind));
            self.skipped.retain(|s| kinds.contains(&s.kind));
        }
        self
    }
}

/// Group, deduplicate and order packages into phases.
///
/// The first occurrence of a (kind, normalized name) pair wins, across all
/// sources of that kind. Phases come out in [`PackageManagerKind`] order no
/// matter how the sources are ordered.
pub fn plan(platform: Platform, sources: &[ListSource]) -> Plan {
    let mut seen: HashSet<(PackageManagerKind, String)> = HashSet::new();
    let mut grouped: BTreeMap<PackageManagerKind, Vec<PackageSpec>> = BTreeMap::new();

    for source in sources {
        for spec in source.specs() {
            if seen.insert((spec.kind, spec.normalized.clone())) {
                grouped.entry(spec.kind).or_default().push(spec);
            }
        }
    }

    let mut phases = Vec::new();
    let mut skipped = Vec::new();
    for (kind, packages) in grouped {
        if kind.supported_on(platform) {
            phases.push(InstallationPhase { kind, packages });
        } else {
            skipped.push(SkippedKind {
                kind,
                packages: packages.len(),
            });
        }
    }

    Plan {
        platform,
        phases,
        skipped,
    }
}

/// [`plan`] over in-memory lists.
pub fn plan_from_lines(platform: Platform, lists: &[(PackageManagerKind, &[&str])]) -> Plan {
    let sources: Vec<ListSource> = lists
        .iter()
        .map(|(kind, lines)| ListSource {
            kind: *kind,
            origin: PathBuf::from(format!("<memory>/packages.{}", kind.as_str())),
            lines: lines.iter().map(|l| l.to_string()).collect(),
        })
        .collect();
    plan(platform, &sources)
}
