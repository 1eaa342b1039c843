//! Uniform interface over heterogeneous installers.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Result, anyhow};

use super::capability::Capabilities;
use super::install::{AurHelper, ListCommand, ManagerCommands, commands_for, parse_listing};
use super::outcome::{FailureReason, InstallResult};
use super::runner::{CommandOutcome, CommandRunner, Invocation, last_line};
use super::spec::package_key;
use super::PackageManagerKind;
use crate::platform::Platform;
use crate::ui::{Level, emit};

/// One package manager, seen through install-by-name and list-installed.
///
/// Implementations never fail a run: install problems come back as
/// [`InstallResult::Failed`].
pub trait PackageManagerAdapter {
    fn kind(&self) -> PackageManagerKind;

    /// Executables that can drive this manager, in preference order.
    fn tools(&self) -> &[&'static str];

    /// Whether the manager needs `sudo` when not running as root.
    fn needs_root(&self) -> bool {
        false
    }

    /// The executable that will be used, if any is available.
    fn resolve_tool<'c>(&self, caps: &'c Capabilities) -> Option<&'c Path> {
        self.tools().iter().find_map(|tool| caps.resolve(tool))
    }

    /// One-time preparation before the first install (package index refresh).
    fn prepare(&mut self, _caps: &Capabilities, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    /// Everything currently installed, as package keys.
    fn list_installed(&mut self, caps: &Capabilities) -> Result<BTreeSet<String>>;

    /// What the user explicitly selected, for writing backups.
    fn list_selected(&mut self, caps: &Capabilities) -> Result<BTreeSet<String>> {
        self.list_installed(caps)
    }

    fn is_installed(&mut self, package: &str, caps: &Capabilities) -> bool;

    fn install(&mut self, package: &str, caps: &Capabilities, timeout: Duration) -> InstallResult;
}

/// Adapter driven entirely by a [`ManagerCommands`] row.
pub struct CliAdapter {
    commands: ManagerCommands,
    runner: Rc<dyn CommandRunner>,
    use_sudo: bool,
    list_timeout: Duration,
    installed: Option<BTreeSet<String>>,
    prepared: bool,
}

impl CliAdapter {
    pub fn new(commands: ManagerCommands, runner: Rc<dyn CommandRunner>, use_sudo: bool) -> Self {
        Self {
            commands,
            runner,
            use_sudo,
            list_timeout: Duration::from_secs(120),
            installed: None,
            prepared: false,
        }
    }

    fn invocation(&self, tool: &Path, args: Vec<String>, caps: &Capabilities) -> Invocation {
        let escalate = self.commands.needs_root && self.use_sudo;
        let inv = match caps.resolve("sudo") {
            Some(sudo) if escalate => Invocation::new(
                sudo,
                std::iter::once(tool.to_string_lossy().into_owned()).chain(args),
            ),
            _ => Invocation::new(tool, args),
        };
        inv.with_path_env(caps.path_env())
    }

    fn run_listing(&self, listing: ListCommand, caps: &Capabilities) -> Result<BTreeSet<String>> {
        let program = caps
            .resolve(listing.program)
            .ok_or_else(|| anyhow!("{} is not available", listing.program))?;
        let inv = Invocation::new(program, listing.args.iter().copied())
            .with_path_env(caps.path_env());

        match self.runner.run(&inv, Some(self.list_timeout)) {
            CommandOutcome::Success { stdout } => {
                Ok(parse_listing(self.commands.kind, listing.format, &stdout))
            }
            CommandOutcome::Failed { code, stderr } => Err(anyhow!(
                "{} exited with {:?}: {}",
                inv.display(),
                code,
                last_line(&stderr).unwrap_or("")
            )),
            CommandOutcome::TimedOut(limit) => {
                Err(anyhow!("{} timed out after {:?}", inv.display(), limit))
            }
            CommandOutcome::SpawnError(e) => Err(anyhow!(e)),
        }
    }

    fn installed_cache(&mut self, caps: &Capabilities) -> &mut BTreeSet<String> {
        if self.installed.is_none() {
            let listing = match self.list_installed(caps) {
                Ok(set) => set,
                Err(e) => {
                    // Installers are idempotent, so fall back to always invoking them
                    emit(
                        Level::Debug,
                        "restore.adapter.list_failed",
                        &format!(
                            "Could not list installed {} packages: {:#}",
                            self.commands.kind, e
                        ),
                        None,
                    );
                    BTreeSet::new()
                }
            };
            self.installed = Some(listing);
        }
        self.installed.get_or_insert_with(BTreeSet::new)
    }
}

impl PackageManagerAdapter for CliAdapter {
    fn kind(&self) -> PackageManagerKind {
        self.commands.kind
    }

    fn tools(&self) -> &[&'static str] {
        self.commands.tools
    }

    fn needs_root(&self) -> bool {
        self.commands.needs_root
    }

    fn prepare(&mut self, caps: &Capabilities, timeout: Duration) -> Result<()> {
        if self.prepared {
            return Ok(());
        }
        self.prepared = true;

        let Some(args) = self.commands.prepare_args else {
            return Ok(());
        };
        let tool = self
            .resolve_tool(caps)
            .ok_or_else(|| anyhow!("{} is not available", self.commands.tools[0]))?;
        let inv = self.invocation(tool, args.iter().map(|a| a.to_string()).collect(), caps);
        match InstallResult::from_outcome(self.runner.run(&inv, Some(timeout))) {
            InstallResult::Failed { reason } => Err(anyhow!("{}: {}", inv.display(), reason)),
            _ => Ok(()),
        }
    }

    fn list_installed(&mut self, caps: &Capabilities) -> Result<BTreeSet<String>> {
        self.run_listing(self.commands.installed, caps)
    }

    fn list_selected(&mut self, caps: &Capabilities) -> Result<BTreeSet<String>> {
        self.run_listing(self.commands.selected, caps)
    }

    fn is_installed(&mut self, package: &str, caps: &Capabilities) -> bool {
        let key = package_key(self.commands.kind, package);
        self.installed_cache(caps).contains(&key)
    }

    fn install(&mut self, package: &str, caps: &Capabilities, timeout: Duration) -> InstallResult {
        let Some(tool) = self.resolve_tool(caps) else {
            return InstallResult::failed(FailureReason::Bootstrap {
                tool: self.commands.tools[0].to_string(),
                message: "not found on PATH".into(),
            });
        };

        let args = self
            .commands
            .install_args
            .iter()
            .map(|a| a.to_string())
            .chain(std::iter::once(package.to_string()))
            .collect();
        let inv = self.invocation(tool, args, caps);
        emit(
            Level::Debug,
            "restore.adapter.invoke",
            &format!("$ {}", inv.display()),
            None,
        );

        let result = InstallResult::from_outcome(self.runner.run(&inv, Some(timeout)));
        if result == InstallResult::Installed {
            if let Some(cache) = self.installed.as_mut() {
                cache.insert(package_key(self.commands.kind, package));
            }
        }
        result
    }
}

/// Adapters for every kind available on `platform`.
pub fn adapters_for(
    platform: Platform,
    runner: Rc<dyn CommandRunner>,
    aur_helper: AurHelper,
    use_sudo: bool,
) -> BTreeMap<PackageManagerKind, Box<dyn PackageManagerAdapter>> {
    PackageManagerKind::ALL
        .into_iter()
        .filter_map(|kind| commands_for(kind, platform, aur_helper))
        .map(|commands| {
            let adapter: Box<dyn PackageManagerAdapter> =
                Box::new(CliAdapter::new(commands, Rc::clone(&runner), use_sudo));
            (commands.kind, adapter)
        })
        .collect()
}

/// Whether installers that need root have to go through `sudo`.
pub fn needs_sudo() -> bool {
    !nix::unistd::geteuid().is_root()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::path::PathBuf;

    /// Runner that records invocations and replays scripted outcomes.
    #[derive(Default)]
    pub(crate) struct ScriptedRunner {
        pub calls: RefCell<Vec<Invocation>>,
        pub outcomes: RefCell<VecDeque<CommandOutcome>>,
    }

    impl ScriptedRunner {
        pub(crate) fn with(outcomes: Vec<CommandOutcome>) -> Rc<Self> {
            Rc::new(Self {
                calls: RefCell::new(Vec::new()),
                outcomes: RefCell::new(outcomes.into()),
            })
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, invocation: &Invocation, _timeout: Option<Duration>) -> CommandOutcome {
            self.calls.borrow_mut().push(invocation.clone());
            self.outcomes
                .borrow_mut()
                .pop_front()
                .unwrap_or(CommandOutcome::Success {
                    stdout: String::new(),
                })
        }
    }

    fn ok(stdout: &str) -> CommandOutcome {
        CommandOutcome::Success {
            stdout: stdout.into(),
        }
    }

    fn caps(tools: &[&str]) -> Capabilities {
        Capabilities::from_tools(
            tools
                .iter()
                .map(|t| (t.to_string(), PathBuf::from(format!("/usr/bin/{}", t)))),
        )
    }

    fn adapter(
        kind: PackageManagerKind,
        platform: Platform,
        runner: &Rc<ScriptedRunner>,
        use_sudo: bool,
    ) -> CliAdapter {
        let runner: Rc<dyn CommandRunner> = runner.clone();
        CliAdapter::new(
            commands_for(kind, platform, AurHelper::Yay).unwrap(),
            runner,
            use_sudo,
        )
    }

    #[test]
    fn test_already_installed_skips_installer() {
        let runner = ScriptedRunner::with(vec![ok("git\nneovim\n")]);
        let caps = caps(&["pacman", "sudo"]);
        let mut pacman = adapter(PackageManagerKind::System, Platform::Arch, &runner, true);

        assert!(pacman.is_installed("git", &caps));
        assert!(!pacman.is_installed("zsh", &caps));
        // Listing ran once and was cached
        assert_eq!(runner.calls.borrow().len(), 1);
        assert_eq!(runner.calls.borrow()[0].args, vec!["-Qq"]);
    }

    #[test]
    fn test_install_prepends_sudo_for_root_managers() {
        let runner = ScriptedRunner::with(vec![ok("")]);
        let caps = caps(&["pacman", "sudo"]);
        let mut pacman = adapter(PackageManagerKind::System, Platform::Arch, &runner, true);

        let result = pacman.install("zsh", &caps, Duration::from_secs(300));
        assert_eq!(result, InstallResult::Installed);

        let calls = runner.calls.borrow();
        assert_eq!(calls[0].program, PathBuf::from("/usr/bin/sudo"));
        assert_eq!(
            calls[0].args,
            vec!["/usr/bin/pacman", "-S", "--needed", "--noconfirm", "zsh"]
        );
    }

    #[test]
    fn test_no_sudo_when_root_or_not_needed() {
        let runner = ScriptedRunner::with(vec![ok(""), ok("")]);
        let caps = caps(&["pacman", "sudo", "cargo"]);

        let mut pacman = adapter(PackageManagerKind::System, Platform::Arch, &runner, false);
        pacman.install("zsh", &caps, Duration::from_secs(1));
        let mut cargo = adapter(PackageManagerKind::Cargo, Platform::Arch, &runner, true);
        cargo.install("ripgrep", &caps, Duration::from_secs(1));

        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].program, PathBuf::from("/usr/bin/pacman"));
        assert_eq!(calls[1].program, PathBuf::from("/usr/bin/cargo"));
        assert_eq!(calls[1].args, vec!["install", "ripgrep"]);
    }

    #[test]
    fn test_install_on_cold_cache_skips_listing() {
        let runner = ScriptedRunner::with(vec![ok(""), ok("zsh
")]);
        let caps = caps(&["pacman"]);
        let mut pacman = adapter(PackageManagerKind::System, Platform::Arch, &runner, false);

        assert_eq!(
            pacman.install("zsh", &caps, Duration::from_secs(1)),
            InstallResult::Installed
        );
        assert_eq!(runner.calls.borrow().len(), 1);
        assert_eq!(runner.calls.borrow()[0].args, vec!["-S", "--needed", "--noconfirm", "zsh"]);

        // The listing loads lazily on the next lookup
        assert!(pacman.is_installed("zsh", &caps));
        assert_eq!(runner.calls.borrow()[1].args, vec!["-Qq"]);
    }

    #[test]
    fn test_install_failure_is_reported_not_raised() {
        let runner = ScriptedRunner::with(vec![CommandOutcome::Failed {
            code: Some(1),
            stderr: "Error: No available formula with the name \"nope\".\n".into(),
        }]);
        let caps = caps(&["brew"]);
        let mut brew = adapter(PackageManagerKind::Brew, Platform::Mac, &runner, true);

        let result = brew.install("nope", &caps, Duration::from_secs(1));
        assert_eq!(
            result,
            InstallResult::failed(FailureReason::ExitStatus {
                code: Some(1),
                message: Some("Error: No available formula with the name \"nope\".".into()),
            })
        );
    }

    #[test]
    fn test_missing_tool_fails_without_running() {
        let runner = ScriptedRunner::with(vec![]);
        let mut mas = adapter(PackageManagerKind::Mas, Platform::Mac, &runner, false);

        let result = mas.install("497799835", &caps(&[]), Duration::from_secs(1));
        assert!(matches!(
            result,
            InstallResult::Failed {
                reason: FailureReason::Bootstrap { .. }
            }
        ));
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_successful_install_updates_cache() {
        let runner = ScriptedRunner::with(vec![ok("{}"), ok("")]);
        let caps = caps(&["npm"]);
        let mut npm = adapter(PackageManagerKind::Npm, Platform::Wsl, &runner, false);

        assert!(!npm.is_installed("typescript@5", &caps));
        assert_eq!(
            npm.install("typescript@5", &caps, Duration::from_secs(1)),
            InstallResult::Installed
        );
        assert!(npm.is_installed("typescript", &caps));
        assert_eq!(runner.calls.borrow().len(), 2);
    }

    #[test]
    fn test_listing_failure_means_not_installed() {
        let runner = ScriptedRunner::with(vec![CommandOutcome::SpawnError("boom".into())]);
        let caps = caps(&["cargo"]);
        let mut cargo = adapter(PackageManagerKind::Cargo, Platform::Mac, &runner, false);
        assert!(!cargo.is_installed("bat", &caps));
    }

    #[test]
    fn test_prepare_runs_once() {
        let runner = ScriptedRunner::with(vec![ok("")]);
        let caps = caps(&["apt-get", "sudo"]);
        let mut apt = adapter(PackageManagerKind::System, Platform::Wsl, &runner, true);

        apt.prepare(&caps, Duration::from_secs(1)).unwrap();
        apt.prepare(&caps, Duration::from_secs(1)).unwrap();
        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args, vec!["/usr/bin/apt-get", "update"]);
    }

    #[test]
    fn test_adapters_for_platform() {
        let runner: Rc<dyn CommandRunner> = ScriptedRunner::with(vec![]);
        let arch = adapters_for(Platform::Arch, Rc::clone(&runner), AurHelper::Yay, false);
        assert!(arch.contains_key(&PackageManagerKind::Aur));
        assert!(!arch.contains_key(&PackageManagerKind::Cask));

        let mac = adapters_for(Platform::Mac, runner, AurHelper::Yay, false);
        assert!(mac.contains_key(&PackageManagerKind::Mas));
        assert!(!mac.contains_key(&PackageManagerKind::Aur));
    }
}
