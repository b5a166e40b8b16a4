use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::util::xdg;

const DEFAULT_CONTAINER: &str = "idebox";
const DEFAULT_IMAGE: &str = "localhost/idebox:latest";

/// Run configuration loaded from `$XDG_CONFIG_HOME/idebox/config.toml`.
///
/// The container and image names live here rather than in module constants
/// so isolated runs (and tests) can orchestrate against distinct names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Container name used for create/export.
    #[serde(default = "default_container")]
    pub container: String,
    /// Image tag produced by the build phase.
    #[serde(default = "default_image")]
    pub image: String,
    /// Build context directory handed to the image build.
    #[serde(default = "default_build_context")]
    pub build_context: String,
    /// Grace period between container creation and export, in seconds.
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
    /// Delay before a background activation cycle starts reconciling.
    #[serde(default = "default_activation_settle_secs")]
    pub activation_settle_secs: u64,
    /// How many activation logs to keep per IDE.
    #[serde(default = "default_log_retention")]
    pub log_retention: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            container: DEFAULT_CONTAINER.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            build_context: default_build_context(),
            settle_secs: default_settle_secs(),
            activation_settle_secs: default_activation_settle_secs(),
            log_retention: default_log_retention(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file {:?}", path))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            toml::to_string_pretty(self).context("Failed to serialize idebox config file")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {:?}", path))?;
        Ok(())
    }

    /// Load from the standard location, falling back to defaults when the
    /// file does not exist.
    pub fn load_default() -> Result<Self> {
        Self::load(&xdg::config_dir()?.join("config.toml"))
    }
}

fn default_container() -> String {
    DEFAULT_CONTAINER.to_string()
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

fn default_build_context() -> String {
    ".".to_string()
}

fn default_settle_secs() -> u64 {
    5
}

fn default_activation_settle_secs() -> u64 {
    20
}

fn default_log_retention() -> usize {
    5
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(&temp.path().join("config.toml")).unwrap();
        assert_eq!(config.container, "idebox");
        assert_eq!(config.settle_secs, 5);
        assert_eq!(config.log_retention, 5);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "container = \"scratch\"\nsettle_secs = 0\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.container, "scratch");
        assert_eq!(config.settle_secs, 0);
        assert_eq!(config.image, "localhost/idebox:latest");
    }

    #[test]
    fn test_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.toml");

        let mut config = Config::default();
        config.container = "alt".to_string();
        config.log_retention = 9;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.container, "alt");
        assert_eq!(loaded.log_retention, 9);
    }
}
