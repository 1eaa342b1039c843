//! Subprocess execution with a bounded wait.

use std::ffi::OsString;
use std::io::IsTerminal;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use duct::{Handle, cmd};
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;

use crate::common::shell::shell_quote;
use crate::ui::prelude::*;

/// A fully resolved external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// `PATH` for the child; inherited when `None`.
    pub path_env: Option<OsString>,
    /// Inherit the terminal instead of capturing output (password prompts).
    pub interactive: bool,
}

impl Invocation {
    pub fn new<P, I, S>(program: P, args: I) -> Self
    where
        P: Into<PathBuf>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            path_env: None,
            interactive: false,
        }
    }

    pub fn with_path_env(mut self, path_env: Option<OsString>) -> Self {
        self.path_env = path_env;
        self
    }

    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }

    /// Shell-like rendering for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .map(|part| shell_quote(&part))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Success { stdout: String },
    Failed { code: Option<i32>, stderr: String },
    TimedOut(Duration),
    SpawnError(String),
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Success { .. })
    }
}

/// Seam between adapters and real processes.
pub trait CommandRunner {
    /// Run to completion, or kill the child once `timeout` elapses.
    fn run(&self, invocation: &Invocation, timeout: Option<Duration>) -> CommandOutcome;
}

/// Runs commands through `duct`.
///
/// Captured commands start in their own process group so a timeout takes
/// down everything they spawned (`sudo pacman`, `sh -c` recipes), not just
/// the direct child.
pub struct DuctRunner {
    poll_interval: Duration,
    /// Time between SIGTERM and SIGKILL on timeout.
    kill_grace: Duration,
}

impl Default for DuctRunner {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            kill_grace: Duration::from_secs(5),
        }
    }
}

impl DuctRunner {
    /// Stop a timed-out child and its process group, then reap it.
    fn terminate(&self, handle: &Handle, group: Option<Pid>) {
        let Some(group) = group else {
            let _ = handle.kill();
            return;
        };

        let _ = killpg(group, Signal::SIGTERM);
        let until = Instant::now() + self.kill_grace;
        while Instant::now() < until {
            if matches!(handle.try_wait(), Ok(Some(_))) {
                break;
            }
            thread::sleep(self.poll_interval);
        }
        // Stragglers that ignored SIGTERM or outlived the leader
        let _ = killpg(group, Signal::SIGKILL);
        let _ = handle.kill();
    }
}

impl CommandRunner for DuctRunner {
    fn run(&self, invocation: &Invocation, timeout: Option<Duration>) -> CommandOutcome {
        let mut expr = cmd(&invocation.program, &invocation.args).unchecked();
        if !invocation.interactive {
            expr = expr.stdin_null().stdout_capture().stderr_capture();
        } else if stdout_to_stderr(invocation, get_output_format()) {
            expr = expr.stdout_to_stderr();
        }
        if let Some(path) = &invocation.path_env {
            expr = expr.env("PATH", path);
        }

        // A background group cannot read the terminal, so interactive
        // commands stay in ours while a terminal is attached
        let own_group = !invocation.interactive || !std::io::stdin().is_terminal();
        if own_group {
            expr = expr.before_spawn(|command| {
                command.process_group(0);
                Ok(())
            });
        }

        let handle = match expr.start() {
            Ok(handle) => handle,
            Err(e) => {
                return CommandOutcome::SpawnError(format!(
                    "{}: {}",
                    invocation.program.display(),
                    e
                ));
            }
        };
        let group = handle
            .pids()
            .first()
            .filter(|_| own_group)
            .map(|pid| Pid::from_raw(*pid as i32));

        // A deadline too far out to represent is no deadline
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t).map(|at| (at, t)));
        loop {
            match handle.try_wait() {
                Ok(Some(output)) => {
                    return if output.status.success() {
                        CommandOutcome::Success {
                            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                        }
                    } else {
                        CommandOutcome::Failed {
                            code: output.status.code(),
                            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                        }
                    };
                }
                Ok(None) => {}
                Err(e) => return CommandOutcome::SpawnError(e.to_string()),
            }

            if let Some((at, limit)) = deadline
                && Instant::now() >= at
            {
                self.terminate(&handle, group);
                return CommandOutcome::TimedOut(limit);
            }

            thread::sleep(self.poll_interval);
        }
    }
}

/// Interactive output would otherwise land between JSON events on stdout.
fn stdout_to_stderr(invocation: &Invocation, format: OutputFormat) -> bool {
    invocation.interactive && matches!(format, OutputFormat::Json)
}

/// Last non-empty line of installer output, for one-line failure reasons.
pub fn last_line(output: &str) -> Option<&str> {
    output.lines().map(str::trim).rfind(|line| !line.is_empty())
}
