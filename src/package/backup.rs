//! Write the host's package selections into `packages.<kind>` lists.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use super::PackageManagerKind;
use super::adapter::PackageManagerAdapter;
use super::capability::Capabilities;
use super::plan::list_path;
use super::spec::{PackageSpec, package_key};
use crate::platform::Platform;
use crate::ui::prelude::*;

/// What happened to one list file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupEntry {
    pub kind: PackageManagerKind,
    pub path: PathBuf,
    /// Entries in the file after writing
    pub total: usize,
    /// Entries that were not in the file before
    pub added: usize,
}

/// On macOS the system kind is Homebrew itself, so a separate brew list
/// would duplicate it.
fn duplicates_system(kind: PackageManagerKind, platform: Platform) -> bool {
    kind == PackageManagerKind::Brew && platform == Platform::Mac
}

/// Back up every kind whose tool is available.
///
/// Existing lists are merged: comments and order are kept and new packages
/// are appended. With `force` the lists are rewritten from scratch.
pub fn backup(
    platform: Platform,
    adapters: &mut BTreeMap<PackageManagerKind, Box<dyn PackageManagerAdapter>>,
    caps: &Capabilities,
    dir: &Path,
    force: bool,
) -> Result<Vec<BackupEntry>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating package list directory {}", dir.display()))?;

    let mut entries = Vec::new();
    for (kind, adapter) in adapters.iter_mut() {
        let kind = *kind;
        if duplicates_system(kind, platform) {
            continue;
        }
        if adapter.resolve_tool(caps).is_none() {
            emit(
                Level::Warn,
                "backup.tool_missing",
                &format!(
                    "{} Skipping {}: {} not found",
                    char::from(NerdFont::Warning),
                    kind.display_name(),
                    adapter.tools().join(" or ")
                ),
                None,
            );
            continue;
        }

        let selected = match adapter.list_selected(caps) {
            Ok(selected) => selected,
            Err(e) => {
                emit(
                    Level::Warn,
                    "backup.list_failed",
                    &format!(
                        "{} Skipping {}: {:#}",
                        char::from(NerdFont::Warning),
                        kind.display_name(),
                        e
                    ),
                    None,
                );
                continue;
            }
        };
        if selected.is_empty() {
            continue;
        }

        let path = list_path(dir, kind);
        let existing = if force {
            None
        } else {
            match fs::read_to_string(&path) {
                Ok(text) => Some(text),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => {
                    return Err(e).with_context(|| format!("reading {}", path.display()));
                }
            }
        };

        let (contents, total, added) =
            merge_list(kind, platform, existing.as_deref(), selected.iter().map(String::as_str));
        fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;

        emit(
            Level::Success,
            "backup.written",
            &format!(
                "{} {}: {} packages ({} new) → {}",
                char::from(NerdFont::Save),
                kind.display_name(),
                total,
                added,
                path.display()
            ),
            Some(serde_json::json!({ "kind": kind, "path": path, "total": total, "added": added })),
        );
        entries.push(BackupEntry {
            kind,
            path,
            total,
            added,
        });
    }

    Ok(entries)
}

/// Merge `selected` into an existing list file's text.
///
/// Returns the new text, the number of entries in it and how many were
/// appended.
fn merge_list<'s>(
    kind: PackageManagerKind,
    platform: Platform,
    existing: Option<&str>,
    selected: impl Iterator<Item = &'s str>,
) -> (String, usize, usize) {
    let mut out = match existing {
        Some(text) => {
            let mut text = text.to_string();
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text
        }
        None => format!(
            "# {} packages, one per line. Written by `devrestore backup` on {}.\n",
            kind.display_name(),
            platform.name()
        ),
    };

    let mut known: HashSet<String> = existing
        .map(|text| {
            text.lines()
                .filter_map(|line| PackageSpec::parse_line(line, kind))
                .map(|spec| spec.normalized)
                .collect()
        })
        .unwrap_or_default();
    let before = known.len();

    let mut added = 0;
    for name in selected {
        if known.insert(package_key(kind, name)) {
            out.push_str(name);
            out.push('\n');
            added += 1;
        }
    }

    (out, before + added, added)
}
