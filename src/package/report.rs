//! Run results and their text/JSON rendering.

use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets};
use serde::Serialize;

use super::PackageManagerKind;
use super::outcome::{InstallResult, MultiPackagePolicy};
use super::plan::{Plan, SkippedKind};
use crate::error::RestoreError;
use crate::platform::Platform;
use crate::ui::prelude::*;

/// Lifecycle of one phase. Every phase ends `Completed`, failures included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    #[default]
    Pending,
    Running,
    Completed,
}

/// Result for one list entry, under the name the user wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageReport {
    pub name: String,
    /// Concrete packages the entry was translated to.
    pub concrete: Vec<String>,
    #[serde(flatten)]
    pub result: InstallResult,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub installed: usize,
    pub already_present: usize,
    pub failed: usize,
}

impl Counts {
    fn add(&mut self, result: &InstallResult) {
        match result {
            InstallResult::Installed => self.installed += 1,
            InstallResult::AlreadyPresent => self.already_present += 1,
            InstallResult::Failed { .. } => self.failed += 1,
        }
    }

    fn merge(&mut self, other: Counts) {
        self.installed += other.installed;
        self.already_present += other.already_present;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    pub kind: PackageManagerKind,
    pub state: PhaseState,
    /// Set when the kind's tool could not be made available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap_error: Option<String>,
    pub packages: Vec<PackageReport>,
}

impl PhaseReport {
    pub fn new(kind: PackageManagerKind) -> Self {
        Self {
            kind,
            state: PhaseState::Pending,
            bootstrap_error: None,
            packages: Vec::new(),
        }
    }

    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for package in &self.packages {
            counts.add(&package.result);
        }
        counts
    }

    pub fn failures(&self) -> impl Iterator<Item = &PackageReport> {
        self.packages.iter().filter(|p| p.result.is_failed())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub platform: Platform,
    pub policy: MultiPackagePolicy,
    pub phases: Vec<PhaseReport>,
    pub skipped: Vec<SkippedKind>,
}

impl RunReport {
    pub fn totals(&self) -> Counts {
        let mut totals = Counts::default();
        for phase in &self.phases {
            totals.merge(phase.counts());
        }
        totals
    }

    /// Failed entries with the kind they belong to, in phase order.
    pub fn failures(&self) -> Vec<(PackageManagerKind, &PackageReport)> {
        self.phases
            .iter()
            .flat_map(|phase| phase.failures().map(move |p| (phase.kind, p)))
            .collect()
    }

    /// True when there was work to do and no phase got a working tool.
    pub fn no_manager_available(&self) -> bool {
        let with_work: Vec<&PhaseReport> = self
            .phases
            .iter()
            .filter(|p| !p.packages.is_empty())
            .collect();
        !with_work.is_empty() && with_work.iter().all(|p| p.bootstrap_error.is_some())
    }

    /// The error the process should exit with, if any.
    pub fn exit_error(&self) -> Option<RestoreError> {
        self.no_manager_available()
            .then_some(RestoreError::NoPackageManager)
    }
}

fn result_cell(counts: usize, color: Color) -> Cell {
    let cell = Cell::new(counts).set_alignment(CellAlignment::Right);
    if counts > 0 { cell.fg(color) } else { cell }
}

/// Print the end-of-run summary.
///
/// JSON mode emits a single `restore.summary` event carrying the whole
/// report.
pub fn print_summary(report: &RunReport) {
    let totals = report.totals();
    let headline = format!(
        "{} installed, {} already present, {} failed",
        totals.installed, totals.already_present, totals.failed
    );

    if matches!(get_output_format(), OutputFormat::Json) {
        emit(
            Level::Info,
            "restore.summary",
            &headline,
            serde_json::to_value(report).ok(),
        );
        return;
    }

    println!();
    println!(
        "{} {}",
        char::from(NerdFont::List),
        format!("Restore summary for {}", report.platform.name()).bold()
    );

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Phase", "Installed", "Present", "Failed", "Note"]);
    for phase in &report.phases {
        let counts = phase.counts();
        table.add_row(vec![
            Cell::new(phase.kind.display_name()),
            result_cell(counts.installed, Color::Green),
            result_cell(counts.already_present, Color::Reset),
            result_cell(counts.failed, Color::Red),
            Cell::new(phase.bootstrap_error.as_deref().unwrap_or("")),
        ]);
    }
    for skipped in &report.skipped {
        table.add_row(vec![
            Cell::new(skipped.kind.display_name()).fg(Color::DarkGrey),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
            Cell::new(format!(
                "{} package(s) skipped: not available on {}",
                skipped.packages,
                report.platform.name()
            ))
            .fg(Color::DarkGrey),
        ]);
    }
    println!("{table}");

    let failures = report.failures();
    if failures.is_empty() {
        emit(
            Level::Success,
            "restore.summary",
            &format!("{} {}", char::from(NerdFont::Check), headline),
            None,
        );
        return;
    }

    emit(
        Level::Warn,
        "restore.summary",
        &format!("{} {}", char::from(NerdFont::Warning), headline),
        None,
    );
    let timed_out = failures.iter().any(|(_, package)| {
        matches!(&package.result, InstallResult::Failed { reason } if reason.is_timeout())
    });
    println!("{}", "Failed packages:".red().bold());
    for (kind, package) in failures {
        let reason = match &package.result {
            InstallResult::Failed { reason } => reason.to_string(),
            _ => String::new(),
        };
        println!("  - {} ({}): {}", package.name, kind, reason);
    }

    if timed_out {
        emit(
            Level::Info,
            "restore.hint.timeout",
            "Some installs hit the time limit; rerun with a larger --timeout",
            None,
        );
    }
}

/// Print what a restore would do, without touching the host.
pub fn print_plan(plan: &Plan) {
    if matches!(get_output_format(), OutputFormat::Json) {
        emit(
            Level::Info,
            "restore.plan",
            &format!(
                "{} package(s) in {} phase(s)",
                plan.total_packages(),
                plan.phases.len()
            ),
            serde_json::to_value(plan).ok(),
        );
        return;
    }

    println!(
        "{} {}",
        char::from(NerdFont::List),
        format!("Restore plan for {}", plan.platform.name()).bold()
    );
    if plan.phases.is_empty() {
        println!("  Nothing to install.");
    }
    for (index, phase) in plan.phases.iter().enumerate() {
        println!(
            "{}. {} {}",
            index + 1,
            phase.kind.display_name().bold(),
            format!("({})", phase.packages.len()).dimmed()
        );
        for name in phase.names() {
            println!("     {}", name);
        }
    }
    for skipped in &plan.skipped {
        println!(
            "{} {}",
            char::from(NerdFont::Minus),
            format!(
                "{}: {} package(s) skipped, not available on {}",
                skipped.kind.display_name(),
                skipped.packages,
                plan.platform.name()
            )
            .dimmed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::outcome::FailureReason;

    fn package(name: &str, result: InstallResult) -> PackageReport {
        PackageReport {
            name: name.into(),
            concrete: vec![name.into()],
            result,
        }
    }

    fn failed() -> InstallResult {
        InstallResult::failed(FailureReason::ExitStatus {
            code: Some(1),
            message: None,
        })
    }

    fn report(phases: Vec<PhaseReport>) -> RunReport {
        RunReport {
            platform: Platform::Arch,
            policy: MultiPackagePolicy::All,
            phases,
            skipped: Vec::new(),
        }
    }

    #[test]
    fn test_counts_and_failures() {
        let mut system = PhaseReport::new(PackageManagerKind::System);
        system.packages = vec![
            package("git", InstallResult::AlreadyPresent),
            package("zsh", InstallResult::Installed),
            package("nope", failed()),
        ];
        let mut cargo = PhaseReport::new(PackageManagerKind::Cargo);
        cargo.packages = vec![package("bat", failed())];

        let report = report(vec![system, cargo]);
        assert_eq!(
            report.totals(),
            Counts {
                installed: 1,
                already_present: 1,
                failed: 2
            }
        );
        let names: Vec<_> = report
            .failures()
            .iter()
            .map(|(kind, p)| (*kind, p.name.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                (PackageManagerKind::System, "nope"),
                (PackageManagerKind::Cargo, "bat")
            ]
        );
        assert!(report.exit_error().is_none());
    }

    #[test]
    fn test_no_manager_available_needs_every_phase_to_fail_bootstrap() {
        let mut cargo = PhaseReport::new(PackageManagerKind::Cargo);
        cargo.bootstrap_error = Some("curl missing".into());
        cargo.packages = vec![package("bat", failed())];
        let mut npm = PhaseReport::new(PackageManagerKind::Npm);
        npm.bootstrap_error = Some("no recipe".into());
        npm.packages = vec![package("typescript", failed())];

        let all_failed = report(vec![cargo.clone(), npm]);
        assert!(all_failed.no_manager_available());
        assert!(matches!(
            all_failed.exit_error(),
            Some(RestoreError::NoPackageManager)
        ));

        let mut system = PhaseReport::new(PackageManagerKind::System);
        system.packages = vec![package("git", InstallResult::AlreadyPresent)];
        assert!(!report(vec![system, cargo]).no_manager_available());

        assert!(!report(Vec::new()).no_manager_available());
    }

    #[test]
    fn test_report_json_shape() {
        let mut phase = PhaseReport::new(PackageManagerKind::System);
        phase.state = PhaseState::Completed;
        phase.packages = vec![package("nodejs", failed())];
        let value = serde_json::to_value(report(vec![phase])).unwrap();

        assert_eq!(value["platform"], "arch");
        assert_eq!(value["policy"], "all");
        let entry = &value["phases"][0];
        assert_eq!(entry["state"], "completed");
        assert_eq!(entry["packages"][0]["name"], "nodejs");
        assert_eq!(entry["packages"][0]["status"], "failed");
        assert_eq!(entry["packages"][0]["reason"]["type"], "exit_status");
    }
}
