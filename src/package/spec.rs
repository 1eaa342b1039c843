//! Package identifiers as written in the list files.

use serde::Serialize;

use super::PackageManagerKind;

/// A package named in a `config/packages.<kind>` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSpec {
    /// The identifier as the user wrote it (trimmed, comment removed).
    pub name: String,
    /// Identifier used for deduplication, with version pins dropped.
    pub normalized: String,
    pub kind: PackageManagerKind,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>, kind: PackageManagerKind) -> Self {
        let name = name.into();
        let normalized = package_key(kind, &name);
        Self {
            name,
            normalized,
            kind,
        }
    }

    /// Parse one list line. Blank lines and comment lines yield `None`.
    pub fn parse_line(line: &str, kind: PackageManagerKind) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }

        // `ripgrep # search` and `497799835\t# Xcode` carry trailing notes
        let name = match trimmed.find(" #").or_else(|| trimmed.find("\t#")) {
            Some(idx) => trimmed[..idx].trim_end(),
            None => trimmed,
        };

        Some(Self::new(name, kind))
    }
}

/// Dedup key for a package identifier.
///
/// pip follows PEP 503 (`Foo_Bar.baz` and `foo-bar-baz` are one project);
/// every other manager compares exact names.
fn normalize(name: &str, kind: PackageManagerKind) -> String {
    let trimmed = name.trim();
    match kind {
        PackageManagerKind::Pip => {
            let mut out = String::with_capacity(trimmed.len());
            let mut last_was_sep = false;
            for c in trimmed.chars() {
                if matches!(c, '-' | '_' | '.') {
                    if !last_was_sep {
                        out.push('-');
                    }
                    last_was_sep = true;
                } else {
                    out.extend(c.to_lowercase());
                    last_was_sep = false;
                }
            }
            out
        }
        _ => trimmed.to_string(),
    }
}

/// Name under which a list entry shows up in the installed listing.
///
/// Version pins are part of the list entry but not of the listing:
/// `typescript@5` is installed once `typescript` is.
pub fn package_key(kind: PackageManagerKind, package: &str) -> String {
    let package = package.trim();
    let bare = match kind {
        PackageManagerKind::Npm => {
            // Skip the scope's leading '@' when looking for a version suffix
            let search_from = usize::from(package.starts_with('@'));
            match package[search_from..].find('@') {
                Some(idx) => &package[..search_from + idx],
                None => package,
            }
        }
        PackageManagerKind::Pip => package
            .split(['=', '<', '>', '!', '~', '[', ';', ' '])
            .next()
            .unwrap_or(package),
        _ => package,
    };
    normalize(bare, kind)
}
