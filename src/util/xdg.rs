use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Get the XDG config directory for idebox
///
/// Returns `$XDG_CONFIG_HOME/idebox` or `~/.config/idebox` if not set
pub fn config_dir() -> Result<PathBuf> {
    let base = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            directories::BaseDirs::new()
                .expect("Failed to get home directory")
                .home_dir()
                .join(".config")
        });

    Ok(base.join("idebox"))
}

/// Get the XDG state directory for idebox
///
/// Returns `$XDG_STATE_HOME/idebox` or `~/.local/state/idebox` if not set
pub fn state_dir() -> Result<PathBuf> {
    let base = env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            directories::BaseDirs::new()
                .expect("Failed to get home directory")
                .home_dir()
                .join(".local/state")
        });

    Ok(base.join("idebox"))
}

/// Get the user's local bin directory, where exported launchers land
///
/// Returns `$HOME/.local/bin`
pub fn bin_dir() -> Result<PathBuf> {
    let base_dirs = directories::BaseDirs::new().context("Failed to get home directory")?;
    Ok(base_dirs.home_dir().join(".local/bin"))
}

/// Path of the wrapper registration file
pub fn registry_path() -> Result<PathBuf> {
    Ok(state_dir()?.join("wrappers.toml"))
}

/// Directory holding generated wrapper programs
pub fn wrapper_dir() -> Result<PathBuf> {
    Ok(state_dir()?.join("wrappers"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir() {
        let dir = config_dir().unwrap();
        assert!(dir.to_string_lossy().contains("idebox"));
    }

    #[test]
    fn test_state_dir() {
        let dir = state_dir().unwrap();
        assert!(dir.to_string_lossy().contains("idebox"));
    }

    #[test]
    fn test_bin_dir() {
        let dir = bin_dir().unwrap();
        assert!(dir.to_string_lossy().contains(".local/bin"));
    }

    #[test]
    fn test_registry_path() {
        let path = registry_path().unwrap();
        assert!(path.to_string_lossy().ends_with("wrappers.toml"));
    }
}
