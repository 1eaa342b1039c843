use anyhow::{Context, Result};
use std::path::PathBuf;

/// Centralized path management for devrestore

/// Get the devrestore config directory
pub fn devrestore_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("devrestore");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Default location of `devrestore.toml`
pub fn config_file() -> Result<PathBuf> {
    Ok(devrestore_config_dir()?.join("devrestore.toml"))
}

/// Expand `~` and environment variables in a user-supplied path.
///
/// Unknown variables are left as written.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_expand_plain_path_unchanged() {
        assert_eq!(expand_path("config"), PathBuf::from("config"));
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/dotfiles/config"), home.join("dotfiles/config"));
        }
    }

    #[test]
    #[serial]
    fn test_expand_env_var() {
        unsafe { std::env::set_var("DEVRESTORE_TEST_ROOT", "/srv/backup") };
        assert_eq!(
            expand_path("$DEVRESTORE_TEST_ROOT/config"),
            PathBuf::from("/srv/backup/config")
        );
        unsafe { std::env::remove_var("DEVRESTORE_TEST_ROOT") };
        // Unknown variables fall back to tilde-only expansion
        assert_eq!(
            expand_path("$DEVRESTORE_TEST_ROOT/config"),
            PathBuf::from("$DEVRESTORE_TEST_ROOT/config")
        );
    }
}
