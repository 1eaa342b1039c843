//! Runs a plan phase by phase.
//!
//! Nothing in here aborts a run: a package failure is recorded and the next
//! package starts, a tool that cannot be bootstrapped fails its own phase
//! only. The capability snapshot is re-probed after the system phase and
//! after every bootstrap attempt.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Duration;

use serde_json::json;

use super::PackageManagerKind;
use super::adapter::PackageManagerAdapter;
use super::bootstrap::Bootstrapper;
use super::capability::{Capabilities, CapabilityProbe};
use super::outcome::{FailureReason, InstallResult, MultiPackagePolicy};
use super::plan::{InstallationPhase, Plan};
use super::report::{PackageReport, PhaseReport, PhaseState, RunReport};
use super::runner::{CommandRunner, Invocation};
use super::spec::PackageSpec;
use super::translate::translate;
use crate::common::progress::create_spinner;
use crate::error::RestoreError;
use crate::platform::Platform;
use crate::ui::prelude::*;

pub const DEFAULT_INSTALL_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(1800);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Limit for each installer invocation
    pub timeout: Duration,
    /// Limit for each tool bootstrap
    pub bootstrap_timeout: Duration,
    pub policy: MultiPackagePolicy,
    /// Try to install missing package-manager tools
    pub bootstrap: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_INSTALL_TIMEOUT,
            bootstrap_timeout: DEFAULT_BOOTSTRAP_TIMEOUT,
            policy: MultiPackagePolicy::All,
            bootstrap: true,
        }
    }
}

pub struct Executor<'a> {
    platform: Platform,
    options: ExecutorOptions,
    adapters: BTreeMap<PackageManagerKind, Box<dyn PackageManagerAdapter>>,
    runner: Rc<dyn CommandRunner>,
    probe: &'a dyn CapabilityProbe,
    bootstrapper: Bootstrapper,
    caps: Capabilities,
    /// Tools whose bootstrap already failed this run, with the reason.
    failed_tools: HashMap<String, String>,
    use_sudo: bool,
    sudo_primed: bool,
}

impl<'a> Executor<'a> {
    pub fn new(
        platform: Platform,
        adapters: BTreeMap<PackageManagerKind, Box<dyn PackageManagerAdapter>>,
        runner: Rc<dyn CommandRunner>,
        probe: &'a dyn CapabilityProbe,
        bootstrapper: Bootstrapper,
        options: ExecutorOptions,
    ) -> Self {
        Self {
            platform,
            options,
            adapters,
            runner,
            probe,
            bootstrapper,
            caps: probe.probe(),
            failed_tools: HashMap::new(),
            use_sudo: false,
            sudo_primed: false,
        }
    }

    /// Ask for the sudo password once before the first root install.
    pub fn with_sudo(mut self, use_sudo: bool) -> Self {
        self.use_sudo = use_sudo;
        self
    }

    /// Re-probe which executables are visible.
    pub fn refresh(&mut self) {
        self.caps = self.probe.probe();
        emit(
            Level::Debug,
            "restore.capabilities.refresh",
            &format!(
                "Visible tools: {}",
                self.caps.available().collect::<Vec<_>>().join(", ")
            ),
            None,
        );
    }

    pub fn execute(&mut self, plan: &Plan) -> RunReport {
        let phases = plan
            .phases
            .iter()
            .map(|phase| {
                let report = self.run_phase(phase);
                if phase.kind == PackageManagerKind::System {
                    // Runtimes from the system phase unlock the language managers
                    self.refresh();
                }
                report
            })
            .collect();

        RunReport {
            platform: self.platform,
            policy: self.options.policy,
            phases,
            skipped: plan.skipped.clone(),
        }
    }

    fn run_phase(&mut self, phase: &InstallationPhase) -> PhaseReport {
        let mut report = PhaseReport::new(phase.kind);
        if phase.packages.is_empty() {
            report.state = PhaseState::Completed;
            return report;
        }

        report.state = PhaseState::Running;
        emit(
            Level::Info,
            "restore.phase.start",
            &format!(
                "{} {} ({} package{})",
                char::from(NerdFont::Package),
                phase.kind.display_name(),
                phase.packages.len(),
                if phase.packages.len() == 1 { "" } else { "s" }
            ),
            Some(json!({ "kind": phase.kind, "packages": phase.packages.len() })),
        );

        let Some(mut adapter) = self.adapters.remove(&phase.kind) else {
            let reason = format!("no {} adapter on {}", phase.kind, self.platform);
            report.packages = fail_all(&phase.packages, "none", &reason);
            report.bootstrap_error = Some(reason);
            report.state = PhaseState::Completed;
            return report;
        };

        match self.ensure_tool(adapter.as_ref()) {
            Ok(()) => {
                report.packages = phase
                    .packages
                    .iter()
                    .map(|spec| self.install_spec(adapter.as_mut(), spec))
                    .collect();
            }
            Err(RestoreError::BootstrapFailure { tool, reason, .. }) => {
                report.packages = fail_all(&phase.packages, &tool, &reason);
                report.bootstrap_error = Some(format!("{}: {}", tool, reason));
            }
            Err(other) => {
                let reason = other.to_string();
                report.packages = fail_all(&phase.packages, "", &reason);
                report.bootstrap_error = Some(reason);
            }
        }

        self.adapters.insert(phase.kind, adapter);
        report.state = PhaseState::Completed;

        let counts = report.counts();
        emit(
            Level::Info,
            "restore.phase.complete",
            &format!(
                "{} {}: {} installed, {} present, {} failed",
                char::from(NerdFont::List),
                phase.kind.display_name(),
                counts.installed,
                counts.already_present,
                counts.failed
            ),
            Some(json!({ "kind": phase.kind, "counts": counts })),
        );
        report
    }

    /// Make sure `adapter` has an executable, bootstrapping it if allowed.
    fn ensure_tool(&mut self, adapter: &dyn PackageManagerAdapter) -> Result<(), RestoreError> {
        if adapter.resolve_tool(&self.caps).is_some() {
            return Ok(());
        }

        let kind = adapter.kind();
        let tool = adapter.tools().first().copied().unwrap_or("unknown");
        let failure = |reason: String| RestoreError::BootstrapFailure {
            kind,
            tool: tool.to_string(),
            reason,
        };

        if let Some(reason) = self.failed_tools.get(tool) {
            return Err(failure(reason.clone()));
        }
        if !self.options.bootstrap {
            return Err(failure("not found and bootstrapping is disabled".into()));
        }

        let invocation = match self.bootstrapper.invocation(tool, &self.caps) {
            Ok(invocation) => invocation,
            Err(reason) => {
                self.failed_tools.insert(tool.to_string(), reason.clone());
                return Err(failure(reason));
            }
        };

        emit(
            Level::Info,
            "restore.bootstrap.start",
            &format!(
                "{} {} not found, bootstrapping it for {} packages",
                char::from(NerdFont::Wrench),
                tool,
                kind.display_name()
            ),
            Some(json!({ "tool": tool, "kind": kind })),
        );
        let outcome = self
            .runner
            .run(&invocation, Some(self.options.bootstrap_timeout));
        self.refresh();

        let reason = match InstallResult::from_outcome(outcome) {
            InstallResult::Failed { reason } => Some(reason.to_string()),
            _ if adapter.resolve_tool(&self.caps).is_none() => {
                Some("still not found after bootstrap".to_string())
            }
            _ => None,
        };

        match reason {
            None => {
                emit(
                    Level::Success,
                    "restore.bootstrap.done",
                    &format!("{} {} is ready", char::from(NerdFont::Check), tool),
                    Some(json!({ "tool": tool, "kind": kind })),
                );
                Ok(())
            }
            Some(reason) => {
                let err = failure(reason.clone());
                emit(
                    Level::Error,
                    "restore.bootstrap.failed",
                    &format!("{} {}", char::from(NerdFont::CrossCircle), err),
                    Some(json!({ "tool": tool, "kind": kind, "reason": reason })),
                );
                self.failed_tools.insert(tool.to_string(), reason);
                Err(err)
            }
        }
    }

    fn install_spec(
        &mut self,
        adapter: &mut dyn PackageManagerAdapter,
        spec: &PackageSpec,
    ) -> PackageReport {
        let concrete = if spec.kind == PackageManagerKind::System {
            translate(self.platform, &spec.name)
        } else {
            vec![spec.name.clone()]
        };

        let results: Vec<(String, InstallResult)> = concrete
            .iter()
            .map(|package| {
                let result = self.install_concrete(adapter, package);
                (package.clone(), result)
            })
            .collect();
        let result = self.options.policy.combine(&results);

        let partial: Vec<&str> = results
            .iter()
            .filter(|(_, r)| r.is_failed())
            .map(|(name, _)| name.as_str())
            .collect();
        if !result.is_failed() && !partial.is_empty() {
            emit(
                Level::Warn,
                "restore.package.partial",
                &format!(
                    "{} {}: could not install {}",
                    char::from(NerdFont::Warning),
                    spec.name,
                    partial.join(", ")
                ),
                Some(json!({ "kind": spec.kind, "package": spec.name, "failed": partial })),
            );
        }

        report_package(spec, &concrete, &result);
        PackageReport {
            name: spec.name.clone(),
            concrete,
            result,
        }
    }

    fn install_concrete(
        &mut self,
        adapter: &mut dyn PackageManagerAdapter,
        package: &str,
    ) -> InstallResult {
        if adapter.is_installed(package, &self.caps) {
            return InstallResult::AlreadyPresent;
        }

        if adapter.needs_root() {
            self.prime_sudo();
        }
        if let Err(e) = adapter.prepare(&self.caps, self.options.timeout) {
            emit(
                Level::Warn,
                "restore.adapter.prepare_failed",
                &format!(
                    "{} Could not prepare {}: {:#}",
                    char::from(NerdFont::Warning),
                    adapter.kind().display_name(),
                    e
                ),
                None,
            );
        }

        let spinner = create_spinner(format!("Installing {}", package));
        let result = adapter.install(package, &self.caps, self.options.timeout);
        spinner.finish_and_clear();
        result
    }

    /// Validate sudo credentials up front so captured installs never prompt.
    fn prime_sudo(&mut self) {
        if !self.use_sudo || self.sudo_primed {
            return;
        }
        self.sudo_primed = true;

        let Some(sudo) = self.caps.resolve("sudo") else {
            return;
        };
        let invocation = Invocation::new(sudo, ["-v"]).interactive();
        let outcome = self
            .runner
            .run(&invocation, Some(self.options.bootstrap_timeout));
        if !outcome.is_success() {
            emit(
                Level::Warn,
                "restore.sudo.failed",
                &format!(
                    "{} sudo -v did not succeed; root installs may fail",
                    char::from(NerdFont::Warning)
                ),
                None,
            );
        }
    }
}

fn fail_all(packages: &[PackageSpec], tool: &str, reason: &str) -> Vec<PackageReport> {
    packages
        .iter()
        .map(|spec| {
            let result = InstallResult::failed(FailureReason::Bootstrap {
                tool: tool.to_string(),
                message: reason.to_string(),
            });
            report_package(spec, std::slice::from_ref(&spec.name), &result);
            PackageReport {
                name: spec.name.clone(),
                concrete: vec![spec.name.clone()],
                result,
            }
        })
        .collect()
}

fn report_package(spec: &PackageSpec, concrete: &[String], result: &InstallResult) {
    let shown = if concrete.len() == 1 && concrete[0] == spec.name {
        spec.name.clone()
    } else {
        format!("{} → {}", spec.name, concrete.join(", "))
    };
    let data = Some(json!({
        "kind": spec.kind,
        "package": spec.name,
        "concrete": concrete,
        "result": result,
    }));

    match result {
        InstallResult::Installed => emit(
            Level::Success,
            "restore.package.installed",
            &format!("  {} {}", char::from(NerdFont::Check), shown),
            data,
        ),
        InstallResult::AlreadyPresent => emit(
            Level::Info,
            "restore.package.present",
            &format!("  {} {} (already installed)", char::from(NerdFont::Minus), shown),
            data,
        ),
        InstallResult::Failed { reason } => emit(
            Level::Error,
            "restore.package.failed",
            &format!(
                "  {} {}: {}",
                char::from(NerdFont::CrossCircle),
                shown,
                RestoreError::PackageInstallFailure {
                    kind: spec.kind,
                    package: spec.name.clone(),
                    reason: reason.to_string(),
                }
            ),
            data,
        ),
    }
}
