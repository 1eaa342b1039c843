use anyhow::{Context, Result};
use std::process::Command;

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Run the built binary against the test environment's config file.
pub fn run_devrestore_command(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    let config_file = env.config_file();
    let output = Command::new(env!("CARGO_BIN_EXE_devrestore"))
        .arg("--config-file")
        .arg(&config_file)
        .arg("--no-color")
        .args(args)
        .current_dir(env.path())
        .output()
        .context("running devrestore")?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

/// Parse every stdout line as a JSON event.
pub fn json_events(output: &CommandOutput) -> Result<Vec<serde_json::Value>> {
    output
        .stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).with_context(|| format!("not JSON: {}", line)))
        .collect()
}

/// The first event with the given code.
pub fn find_event<'a>(events: &'a [serde_json::Value], code: &str) -> Option<&'a serde_json::Value> {
    events.iter().find(|event| event["code"] == code)
}
