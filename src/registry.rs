use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persistent record of wrapped IDE launchers
/// Outlives any single run; consulted by every wrapper invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WrapperRegistry {
    #[serde(default)]
    pub wrappers: Vec<WrapperRegistration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrapperRegistration {
    /// Canonical IDE id
    pub ide: String,
    /// Launcher path the user invokes (now a symlink to the wrapper)
    pub original_path: PathBuf,
    /// Sidecar path holding the real, unwrapped executable
    pub real_path: PathBuf,
    /// Generated wrapper program
    pub wrapper_path: PathBuf,
    /// When this registration was made
    pub registered_at: String,
}

impl WrapperRegistry {
    /// Load the registry from disk; a missing file is an empty registry
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read wrapper registry from {:?}", path))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse wrapper registry from {:?}", path))
    }

    /// Save the registry to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create registry directory {:?}", parent))?;
        }

        let contents =
            toml::to_string_pretty(self).context("Failed to serialize wrapper registry")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write wrapper registry to {:?}", path))?;

        Ok(())
    }

    pub fn get(&self, ide: &str) -> Option<&WrapperRegistration> {
        self.wrappers.iter().find(|w| w.ide == ide)
    }

    /// Add or replace the registration for an IDE; at most one per id
    pub fn upsert(&mut self, registration: WrapperRegistration) {
        if let Some(existing) = self.wrappers.iter_mut().find(|w| w.ide == registration.ide) {
            *existing = registration;
        } else {
            self.wrappers.push(registration);
        }
    }
}
