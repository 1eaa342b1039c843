//! Subcommand handlers.

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use colored::*;
use serde_json::json;

use crate::cli::{BackupArgs, Cli, Commands, PlanArgs, RestoreArgs, SourceArgs};
use crate::config::RestoreConfig;
use crate::package::adapter::needs_sudo;
use crate::package::backup::backup;
use crate::package::bootstrap::Bootstrapper;
use crate::package::install::commands_for;
use crate::package::report::{print_plan, print_summary};
use crate::package::{
    AurHelper, Capabilities, CapabilityProbe, CommandRunner, DuctRunner, Executor,
    PackageManagerKind, PathProbe, Plan, adapters_for, plan, read_sources,
};
use crate::platform::{HostProbe, Platform, SystemProbe, detect};
use crate::ui::prelude::*;

pub fn dispatch(cli: Cli) -> Result<()> {
    dispatch_on(cli, &SystemProbe)
}

/// Detect first: loading the config may write the default file.
fn dispatch_on(cli: Cli, host: &dyn HostProbe) -> Result<()> {
    let platform = resolve_platform(cli.platform, host)?;
    let config = RestoreConfig::load(cli.config_file.as_deref())?;
    emit(
        Level::Debug,
        "platform.selected",
        &format!("Platform: {}", platform.name()),
        None,
    );

    match cli.command {
        Commands::Restore(args) => handle_restore(platform, &config, args),
        Commands::Plan(args) => handle_plan(platform, &config, args),
        Commands::Backup(args) => handle_backup(platform, &config, args),
        Commands::Detect => handle_detect(platform, &config),
    }
}

fn resolve_platform(forced: Option<Platform>, host: &dyn HostProbe) -> Result<Platform> {
    match forced {
        Some(platform) => Ok(platform),
        None => Ok(detect(host)?),
    }
}

fn source_dirs(args: &SourceArgs, config: &RestoreConfig) -> Vec<PathBuf> {
    if args.config_dirs.is_empty() {
        vec![config.list_dir()]
    } else {
        args.config_dirs.clone()
    }
}

fn build_plan(platform: Platform, config: &RestoreConfig, args: &SourceArgs) -> Result<Plan> {
    let dirs = source_dirs(args, config);
    let sources = read_sources(&dirs).context("reading package lists")?;
    Ok(plan(platform, &sources).restrict_to(&args.only))
}

/// `paru` when it is the only helper around, otherwise the configured or default one.
fn aur_helper(config: &RestoreConfig, caps: &Capabilities) -> AurHelper {
    config.aur_helper.unwrap_or_else(|| {
        if caps.has("paru") && !caps.has("yay") {
            AurHelper::Paru
        } else {
            AurHelper::default()
        }
    })
}

fn handle_plan(platform: Platform, config: &RestoreConfig, args: PlanArgs) -> Result<()> {
    let plan = build_plan(platform, config, &args.sources)?;
    print_plan(&plan);
    Ok(())
}

fn handle_restore(platform: Platform, config: &RestoreConfig, args: RestoreArgs) -> Result<()> {
    let plan = build_plan(platform, config, &args.sources)?;
    if plan.phases.is_empty() {
        emit(
            Level::Info,
            "restore.nothing",
            &format!(
                "{} Nothing to restore for {}",
                char::from(NerdFont::Info),
                platform.name()
            ),
            None,
        );
        if !plan.skipped.is_empty() {
            print_plan(&plan);
        }
        return Ok(());
    }

    let mut options = config.executor_options();
    if let Some(secs) = args.timeout {
        options.timeout = std::time::Duration::from_secs(secs);
    }
    if let Some(policy) = args.policy {
        options.policy = policy;
    }
    if args.no_bootstrap {
        options.bootstrap = false;
    }

    let probe = PathProbe::new(config.extra_dirs());
    let caps = probe.probe();
    let use_sudo = needs_sudo();
    let runner: Rc<dyn CommandRunner> = Rc::new(DuctRunner::default());
    let adapters = adapters_for(platform, Rc::clone(&runner), aur_helper(config, &caps), use_sudo);
    let bootstrapper =
        Bootstrapper::new(platform, use_sudo).with_overrides(config.bootstrap_overrides());

    emit(
        Level::Info,
        "restore.start",
        &format!(
            "{} Restoring {} package(s) on {}",
            char::from(NerdFont::Download),
            plan.total_packages(),
            platform.name()
        ),
        Some(json!({
            "platform": platform,
            "packages": plan.total_packages(),
            "policy": options.policy,
            "timeout_secs": options.timeout.as_secs(),
        })),
    );
    separator();

    let mut executor =
        Executor::new(platform, adapters, runner, &probe, bootstrapper, options).with_sudo(use_sudo);
    let report = executor.execute(&plan);

    separator();
    print_summary(&report);

    match report.exit_error() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn handle_backup(platform: Platform, config: &RestoreConfig, args: BackupArgs) -> Result<()> {
    let dir = args.config_dir.unwrap_or_else(|| config.list_dir());
    let probe = PathProbe::new(config.extra_dirs());
    let caps = probe.probe();
    let runner: Rc<dyn CommandRunner> = Rc::new(DuctRunner::default());
    let mut adapters = adapters_for(platform, runner, aur_helper(config, &caps), needs_sudo());

    emit(
        Level::Info,
        "backup.start",
        &format!(
            "{} Backing up {} packages into {}",
            char::from(NerdFont::Save),
            platform.name(),
            dir.display()
        ),
        None,
    );
    let entries = backup(platform, &mut adapters, &caps, &dir, args.force)?;

    emit(
        Level::Success,
        "backup.summary",
        &format!(
            "{} Wrote {} package list(s)",
            char::from(NerdFont::Check),
            entries.len()
        ),
        Some(json!({ "platform": platform, "lists": entries })),
    );
    Ok(())
}

fn handle_detect(platform: Platform, config: &RestoreConfig) -> Result<()> {
    let caps = PathProbe::new(config.extra_dirs()).probe();
    let helper = aur_helper(config, &caps);

    let managers: Vec<(PackageManagerKind, Vec<&'static str>, Option<PathBuf>)> =
        PackageManagerKind::ALL
            .into_iter()
            .filter_map(|kind| commands_for(kind, platform, helper))
            .map(|row| {
                let found = row
                    .tools
                    .iter()
                    .find_map(|tool| caps.resolve(tool))
                    .map(|p| p.to_path_buf());
                (row.kind, row.tools.to_vec(), found)
            })
            .collect();

    if matches!(get_output_format(), OutputFormat::Json) {
        let data: Vec<_> = managers
            .iter()
            .map(|(kind, tools, found)| json!({ "kind": kind, "tools": tools, "path": found }))
            .collect();
        emit(
            Level::Info,
            "detect.result",
            &format!("Platform: {}", platform),
            Some(json!({ "platform": platform, "managers": data, "root": !needs_sudo() })),
        );
        return Ok(());
    }

    println!(
        "{} {} {}",
        char::from(NerdFont::Desktop),
        "Platform:".bold(),
        platform.name()
    );
    for (kind, tools, found) in &managers {
        match found {
            Some(path) => println!(
                "  {} {:<14} {}",
                char::from(NerdFont::Check).to_string().green(),
                kind.display_name(),
                path.display()
            ),
            None => println!(
                "  {} {:<14} {}",
                char::from(NerdFont::CrossCircle).to_string().red(),
                kind.display_name(),
                format!("{} not found", tools.join(" / ")).dimmed()
            ),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::tests::FakeProbe;
    use clap::Parser;

    #[test]
    fn test_unsupported_platform_leaves_config_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("devrestore").join("devrestore.toml");
        let cli = Cli::parse_from([
            "devrestore",
            "--config-file",
            config_file.to_str().unwrap(),
            "plan",
        ]);
        let host = FakeProbe {
            os: "windows",
            ..Default::default()
        };

        let err = dispatch_on(cli, &host).unwrap_err();
        assert!(err.to_string().contains("Unsupported platform"));
        assert!(!config_file.exists());
        assert!(!dir.path().join("devrestore").exists());
    }
}
