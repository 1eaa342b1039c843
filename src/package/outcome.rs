//! Per-package install outcomes and how multi-package translations combine.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::runner::{CommandOutcome, last_line};

/// Outcome of installing one package. Never fatal on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstallResult {
    Installed,
    AlreadyPresent,
    Failed { reason: FailureReason },
}

impl InstallResult {
    pub fn failed(reason: FailureReason) -> Self {
        InstallResult::Failed { reason }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, InstallResult::Failed { .. })
    }

    /// Map a finished installer command to a result.
    pub fn from_outcome(outcome: CommandOutcome) -> Self {
        match outcome {
            CommandOutcome::Success { .. } => InstallResult::Installed,
            CommandOutcome::Failed { code, stderr } => Self::failed(FailureReason::ExitStatus {
                code,
                message: last_line(&stderr).map(str::to_string),
            }),
            CommandOutcome::TimedOut(limit) => Self::failed(FailureReason::timeout(limit)),
            CommandOutcome::SpawnError(message) => {
                Self::failed(FailureReason::Spawn { message })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureReason {
    /// Installer exited non-zero
    ExitStatus {
        code: Option<i32>,
        message: Option<String>,
    },
    /// Installer was killed after the per-package timeout
    Timeout { millis: u64 },
    /// Installer could not be started
    Spawn { message: String },
    /// The kind's tool is missing and could not be bootstrapped
    Bootstrap { tool: String, message: String },
    /// Some concrete packages of a translated name failed
    Expanded { failed: Vec<String> },
}

impl FailureReason {
    pub fn timeout(limit: Duration) -> Self {
        FailureReason::Timeout {
            millis: limit.as_millis() as u64,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FailureReason::Timeout { .. })
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::ExitStatus { code, message } => {
                match code {
                    Some(code) => write!(f, "exit code {}", code)?,
                    None => write!(f, "terminated by signal")?,
                }
                if let Some(message) = message {
                    write!(f, ": {}", message)?;
                }
                Ok(())
            }
            FailureReason::Timeout { millis } if millis % 1000 == 0 => {
                write!(f, "timed out after {}s", millis / 1000)
            }
            FailureReason::Timeout { millis } => {
                write!(f, "timed out after {:.1}s", *millis as f64 / 1000.0)
            }
            FailureReason::Spawn { message } => write!(f, "could not start installer: {}", message),
            FailureReason::Bootstrap { tool, message } => {
                write!(f, "{} unavailable: {}", tool, message)
            }
            FailureReason::Expanded { failed } => {
                write!(f, "failed concrete packages: {}", failed.join(", "))
            }
        }
    }
}

/// How an abstract package that expands to several concrete packages is
/// judged.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MultiPackagePolicy {
    /// Every concrete package must end up installed
    #[default]
    All,
    /// One installed concrete package is enough; the rest are warnings
    Any,
}

impl MultiPackagePolicy {
    /// Fold concrete results into the result reported for the abstract name.
    pub fn combine(self, results: &[(String, InstallResult)]) -> InstallResult {
        if let [(_, single)] = results {
            return single.clone();
        }

        let failed: Vec<String> = results
            .iter()
            .filter(|(_, r)| r.is_failed())
            .map(|(name, _)| name.clone())
            .collect();
        let any_installed = results
            .iter()
            .any(|(_, r)| matches!(r, InstallResult::Installed));
        let any_present = results
            .iter()
            .any(|(_, r)| matches!(r, InstallResult::AlreadyPresent));

        match self {
            MultiPackagePolicy::All if !failed.is_empty() => {
                InstallResult::failed(FailureReason::Expanded { failed })
            }
            MultiPackagePolicy::All if any_installed => InstallResult::Installed,
            MultiPackagePolicy::All => InstallResult::AlreadyPresent,
            MultiPackagePolicy::Any if any_installed => InstallResult::Installed,
            MultiPackagePolicy::Any if any_present => InstallResult::AlreadyPresent,
            MultiPackagePolicy::Any => InstallResult::failed(FailureReason::Expanded { failed }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exit_failure() -> InstallResult {
        InstallResult::failed(FailureReason::ExitStatus {
            code: Some(100),
            message: Some("E: Unable to locate package npm".into()),
        })
    }

    fn results(items: &[(&str, InstallResult)]) -> Vec<(String, InstallResult)> {
        items
            .iter()
            .map(|(n, r)| (n.to_string(), r.clone()))
            .collect()
    }

    #[test]
    fn test_single_result_passes_through() {
        let r = results(&[("node", exit_failure())]);
        assert_eq!(MultiPackagePolicy::All.combine(&r), exit_failure());
        assert_eq!(MultiPackagePolicy::Any.combine(&r), exit_failure());
    }

    #[test]
    fn test_all_policy_fails_on_any_failure() {
        let r = results(&[
            ("nodejs", InstallResult::Installed),
            ("npm", exit_failure()),
        ]);
        assert_eq!(
            MultiPackagePolicy::All.combine(&r),
            InstallResult::failed(FailureReason::Expanded {
                failed: vec!["npm".into()]
            })
        );
    }

    #[test]
    fn test_any_policy_accepts_partial_success() {
        let r = results(&[
            ("nodejs", InstallResult::Installed),
            ("npm", exit_failure()),
        ]);
        assert_eq!(MultiPackagePolicy::Any.combine(&r), InstallResult::Installed);
    }

    #[test]
    fn test_any_policy_fails_when_nothing_succeeds() {
        let r = results(&[("nodejs", exit_failure()), ("npm", exit_failure())]);
        assert_eq!(
            MultiPackagePolicy::Any.combine(&r),
            InstallResult::failed(FailureReason::Expanded {
                failed: vec!["nodejs".into(), "npm".into()]
            })
        );
    }

    #[test]
    fn test_all_present_is_already_present() {
        let r = results(&[
            ("python", InstallResult::AlreadyPresent),
            ("python-pip", InstallResult::AlreadyPresent),
        ]);
        assert_eq!(
            MultiPackagePolicy::All.combine(&r),
            InstallResult::AlreadyPresent
        );
        let mixed = results(&[
            ("python", InstallResult::AlreadyPresent),
            ("python-pip", InstallResult::Installed),
        ]);
        assert_eq!(MultiPackagePolicy::All.combine(&mixed), InstallResult::Installed);
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(
            InstallResult::from_outcome(CommandOutcome::TimedOut(Duration::from_secs(300))),
            InstallResult::failed(FailureReason::Timeout { millis: 300_000 })
        );
        assert_eq!(
            InstallResult::from_outcome(CommandOutcome::Failed {
                code: Some(1),
                stderr: "resolving\nerror: target not found: nope\n".into(),
            }),
            InstallResult::failed(FailureReason::ExitStatus {
                code: Some(1),
                message: Some("error: target not found: nope".into()),
            })
        );
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(
            FailureReason::Timeout { millis: 300_000 }.to_string(),
            "timed out after 300s"
        );
        assert_eq!(
            FailureReason::Timeout { millis: 1500 }.to_string(),
            "timed out after 1.5s"
        );
        assert_eq!(
            FailureReason::ExitStatus {
                code: Some(1),
                message: None
            }
            .to_string(),
            "exit code 1"
        );
    }
}
