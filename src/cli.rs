use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::package::{MultiPackagePolicy, PackageManagerKind};
use crate::platform::Platform;
use crate::ui::OutputFormat;

/// Restore a development environment's packages from plain-text lists
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Skip detection and assume this platform
    #[arg(long, value_enum, global = true)]
    pub platform: Option<Platform>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install every listed package that is not already present
    Restore(RestoreArgs),

    /// Show the ordered install phases without installing anything
    Plan(PlanArgs),

    /// Write the currently installed packages into the package lists
    Backup(BackupArgs),

    /// Print the detected platform and the package-manager tools on PATH
    Detect,
}

#[derive(Args, Debug, Default, Clone)]
pub struct SourceArgs {
    /// Directory with packages.<kind> lists (repeat to merge several)
    #[arg(long = "config-dir", value_name = "DIR")]
    pub config_dirs: Vec<PathBuf>,

    /// Only handle these kinds
    #[arg(long, value_enum, value_delimiter = ',')]
    pub only: Vec<PackageManagerKind>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub sources: SourceArgs,
}

#[derive(Args, Debug, Default, Clone)]
pub struct RestoreArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Seconds before a single installer invocation is killed
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Whether a name translated to several packages needs all or any of them
    #[arg(long, value_enum)]
    pub policy: Option<MultiPackagePolicy>,

    /// Do not try to install missing package-manager tools
    #[arg(long)]
    pub no_bootstrap: bool,
}

#[derive(Args, Debug, Default, Clone)]
pub struct BackupArgs {
    /// Directory to write packages.<kind> lists into
    #[arg(long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Replace existing lists instead of merging into them
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_restore_flags() {
        let cli = Cli::try_parse_from([
            "devrestore",
            "--platform",
            "arch",
            "restore",
            "--config-dir",
            "a",
            "--config-dir",
            "b",
            "--only",
            "system,aur",
            "--timeout",
            "60",
            "--policy",
            "any",
            "--no-bootstrap",
        ])
        .unwrap();

        assert_eq!(cli.platform, Some(Platform::Arch));
        let Commands::Restore(args) = cli.command else {
            panic!("expected restore");
        };
        assert_eq!(args.sources.config_dirs, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(
            args.sources.only,
            vec![PackageManagerKind::System, PackageManagerKind::Aur]
        );
        assert_eq!(args.timeout, Some(60));
        assert_eq!(args.policy, Some(MultiPackagePolicy::Any));
        assert!(args.no_bootstrap);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(Cli::try_parse_from(["devrestore", "restore", "--timeout", "0"]).is_err());
    }

    #[test]
    fn test_global_output_after_subcommand() {
        let cli = Cli::try_parse_from(["devrestore", "plan", "--output", "json"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
    }
}
