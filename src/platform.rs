use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::RestoreError;

/// The host environment a restore runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Ubuntu under Windows Subsystem for Linux
    Wsl,
    /// macOS
    Mac,
    /// Arch Linux and derivatives
    Arch,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Wsl, Platform::Mac, Platform::Arch];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Wsl => "wsl",
            Platform::Mac => "mac",
            Platform::Arch => "arch",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Platform::Wsl => "WSL (Ubuntu)",
            Platform::Mac => "macOS",
            Platform::Arch => "Arch Linux",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of the host signals used for platform detection.
pub trait HostProbe {
    fn os_name(&self) -> &str;
    fn env_var(&self, key: &str) -> Option<String>;
    fn read_file(&self, path: &str) -> Option<String>;
    fn file_exists(&self, path: &str) -> bool;
}

pub struct SystemProbe;

impl HostProbe for SystemProbe {
    fn os_name(&self) -> &str {
        std::env::consts::OS
    }

    fn env_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn read_file(&self, path: &str) -> Option<String> {
        fs::read_to_string(path).ok()
    }

    fn file_exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }
}

const WSL_ENV_MARKERS: &[&str] = &["WSL_DISTRO_NAME", "WSL_INTEROP"];
const KERNEL_VERSION_FILES: &[&str] = &["/proc/version", "/proc/sys/kernel/osrelease"];
const ARCH_RELEASE_FILE: &str = "/etc/arch-release";
const OS_RELEASE_FILE: &str = "/etc/os-release";

/// Classify the host into exactly one [`Platform`].
///
/// WSL is checked before Arch so an Arch userland under WSL still gets the
/// WSL treatment.
pub fn detect(probe: &dyn HostProbe) -> Result<Platform, RestoreError> {
    if probe.os_name() == "macos" {
        return Ok(Platform::Mac);
    }

    if probe.os_name() != "linux" {
        return Err(RestoreError::UnsupportedPlatform(format!(
            "operating system '{}' (supported: {})",
            probe.os_name(),
            supported_names()
        )));
    }

    if is_wsl(probe) {
        return Ok(Platform::Wsl);
    }

    if probe.file_exists(ARCH_RELEASE_FILE) {
        return Ok(Platform::Arch);
    }

    let os_release = probe.read_file(OS_RELEASE_FILE).unwrap_or_default();
    let (id, id_like) = parse_os_release(&os_release);
    if id == "arch" || id_like.split_whitespace().any(|like| like == "arch") {
        return Ok(Platform::Arch);
    }

    let seen = if id.is_empty() {
        "linux without /etc/os-release ID".to_string()
    } else {
        format!("linux distribution '{}'", id)
    };
    Err(RestoreError::UnsupportedPlatform(format!(
        "{} (supported: {})",
        seen,
        supported_names()
    )))
}

fn supported_names() -> String {
    Platform::ALL
        .iter()
        .map(|p| p.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_wsl(probe: &dyn HostProbe) -> bool {
    if WSL_ENV_MARKERS.iter().any(|key| probe.env_var(key).is_some()) {
        return true;
    }
    KERNEL_VERSION_FILES.iter().any(|path| {
        probe
            .read_file(path)
            .is_some_and(|content| content.to_lowercase().contains("microsoft"))
    })
}

fn parse_os_release(content: &str) -> (String, String) {
    let mut id = String::new();
    let mut id_like = String::new();

    for line in content.lines() {
        if let Some(val) = line.strip_prefix("ID=") {
            id = val.trim_matches('"').to_string();
        } else if let Some(val) = line.strip_prefix("ID_LIKE=") {
            id_like = val.trim_matches('"').to_string();
        }
    }

    (id, id_like)
}
