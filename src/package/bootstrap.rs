//! Install commands for package-manager tools that are not present yet.
//!
//! A recipe is a shell snippet run through `sh -c` with the terminal
//! attached, since most of them download an installer and may prompt for a
//! password. `{sudo}` in a recipe expands to `sudo ` unless running as root.

use std::collections::BTreeMap;

use super::capability::Capabilities;
use super::runner::Invocation;
use crate::platform::Platform;

const RUSTUP: &str =
    "curl --proto '=https' --tlsv1.2 -sSf https://sh.rustup.rs | sh -s -- -y --no-modify-path";

const HOMEBREW: &str = "NONINTERACTIVE=1 /bin/bash -c \"$(curl -fsSL https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh)\"";

fn aur_helper_recipe(helper: &str) -> String {
    format!(
        "set -e; {{sudo}}pacman -S --needed --noconfirm git base-devel; \
         tmp=$(mktemp -d); \
         git clone --depth 1 https://aur.archlinux.org/{helper}-bin.git \"$tmp/{helper}-bin\"; \
         cd \"$tmp/{helper}-bin\"; makepkg -si --noconfirm; \
         rm -rf \"$tmp\""
    )
}

/// Built-in recipe for `tool` on `platform`.
pub fn builtin_recipe(tool: &str, platform: Platform) -> Option<String> {
    let recipe = match (tool, platform) {
        ("cargo" | "rustup", _) => RUSTUP.to_string(),
        ("brew", Platform::Mac | Platform::Wsl) => HOMEBREW.to_string(),
        ("mas", Platform::Mac) => "brew install mas".to_string(),
        ("yay" | "paru", Platform::Arch) => aur_helper_recipe(tool),

        ("pip3", Platform::Wsl) => "{sudo}apt-get install -y python3-pip".to_string(),
        ("pip3", Platform::Arch) => "{sudo}pacman -S --needed --noconfirm python-pip".to_string(),
        ("pip3", Platform::Mac) => "brew install python".to_string(),

        ("npm", Platform::Wsl) => "{sudo}apt-get install -y nodejs npm".to_string(),
        ("npm", Platform::Arch) => "{sudo}pacman -S --needed --noconfirm nodejs npm".to_string(),
        ("npm", Platform::Mac) => "brew install node".to_string(),

        _ => return None,
    };
    Some(recipe)
}

/// Resolves and renders bootstrap recipes for one run.
#[derive(Debug, Clone)]
pub struct Bootstrapper {
    platform: Platform,
    use_sudo: bool,
    overrides: BTreeMap<String, String>,
}

impl Bootstrapper {
    pub fn new(platform: Platform, use_sudo: bool) -> Self {
        Self {
            platform,
            use_sudo,
            overrides: BTreeMap::new(),
        }
    }

    /// User-configured recipes, keyed by tool name, replace built-in ones.
    pub fn with_overrides(mut self, overrides: BTreeMap<String, String>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Rendered shell snippet that installs `tool`.
    pub fn script_for(&self, tool: &str) -> Option<String> {
        let recipe = self
            .overrides
            .get(tool)
            .cloned()
            .or_else(|| builtin_recipe(tool, self.platform))?;
        let sudo = if self.use_sudo { "sudo " } else { "" };
        Some(recipe.replace("{sudo}", sudo))
    }

    /// Command that runs the recipe for `tool`.
    pub fn invocation(&self, tool: &str, caps: &Capabilities) -> Result<Invocation, String> {
        let script = self
            .script_for(tool)
            .ok_or_else(|| format!("no bootstrap recipe for {} on {}", tool, self.platform))?;
        let sh = caps
            .resolve("sh")
            .ok_or_else(|| "sh is not available to run the bootstrap".to_string())?;
        Ok(Invocation::new(sh, ["-c".to_string(), script])
            .with_path_env(caps.path_env())
            .interactive())
    }
}
