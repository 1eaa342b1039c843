//! Abstract package names mapped to platform-specific packages.
//!
//! Only system-kind packages are translated: apt, pacman and Homebrew name
//! the same tool differently, while cargo/pip/npm/store identifiers are
//! already global.

use crate::platform::Platform;

/// One row of the translation table.
#[derive(Debug, Clone, Copy)]
pub struct TranslationRule {
    pub platform: Platform,
    pub name: &'static str,
    pub packages: &'static [&'static str],
}

const fn rule(
    platform: Platform,
    name: &'static str,
    packages: &'static [&'static str],
) -> TranslationRule {
    TranslationRule {
        platform,
        name,
        packages,
    }
}

/// Rules with a concrete list equal to the abstract name are left out; the
/// identity fallback covers them.
pub static TRANSLATIONS: &[TranslationRule] = &[
    // Node runtime: Linux splits the runtime and its package manager
    rule(Platform::Wsl, "nodejs", &["nodejs", "npm"]),
    rule(Platform::Arch, "nodejs", &["nodejs", "npm"]),
    rule(Platform::Mac, "nodejs", &["node"]),
    // Python with pip
    rule(
        Platform::Wsl,
        "python",
        &["python3", "python3-pip", "python3-venv"],
    ),
    rule(Platform::Arch, "python", &["python", "python-pip"]),
    // fd ships as fd-find on Debian/Ubuntu
    rule(Platform::Wsl, "fd", &["fd-find"]),
    // Compiler toolchain
    rule(Platform::Arch, "build-essential", &["base-devel"]),
    rule(Platform::Mac, "build-essential", &["coreutils"]),
    rule(Platform::Wsl, "openssh", &["openssh-client"]),
    rule(Platform::Wsl, "docker", &["docker.io"]),
];

/// Concrete packages to install for `name` on `platform`.
///
/// Total: names without a rule translate to themselves.
pub fn translate(platform: Platform, name: &str) -> Vec<String> {
    translate_with(TRANSLATIONS, platform, name)
}

pub fn translate_with(rules: &[TranslationRule], platform: Platform, name: &str) -> Vec<String> {
    rules
        .iter()
        .find(|r| r.platform == platform && r.name == name)
        .map(|r| r.packages.iter().map(|p| p.to_string()).collect())
        .unwrap_or_else(|| vec![name.to_string()])
}
