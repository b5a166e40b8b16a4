use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::symlink;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::activation::ActivationError;
use crate::catalog::Component;
use crate::registry::{WrapperRegistration, WrapperRegistry};
use crate::util::xdg;

/// Wrapper program template; the IDE id and the idebox binary path are
/// baked in at generation time so the wrapper never has to infer its own
/// identity.
const WRAPPER_TEMPLATE: &str = include_str!("../../templates/wrapper.sh");

/// Outcome of a registration attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Registration {
    Installed,
    /// A previous registration is already in place; nothing was touched.
    AlreadyRegistered,
}

/// Where registration state lives; explicit so tests can run against a
/// temporary tree.
#[derive(Debug, Clone)]
pub struct RegistrarPaths {
    pub wrapper_dir: PathBuf,
    pub registry_path: PathBuf,
}

impl RegistrarPaths {
    pub fn from_xdg() -> Result<Self> {
        Ok(Self {
            wrapper_dir: xdg::wrapper_dir()?,
            registry_path: xdg::registry_path()?,
        })
    }
}

/// Sidecar path preserving the real executable next to the launcher.
pub fn sidecar_path(original: &Path) -> PathBuf {
    let name = original
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    original.with_file_name(format!("{name}-real"))
}

/// Wrap an exported launcher so its first real use triggers deferred
/// extension activation.
///
/// Moves the launcher to its sidecar path, installs a generated wrapper,
/// and replaces the launcher with a symlink to the wrapper. Idempotent: an
/// existing sidecar or a launcher already pointing at the wrapper is a
/// no-op. Any failure rolls back the earlier steps so the IDE stays
/// launchable.
pub fn register(
    component: &Component,
    original: &Path,
    paths: &RegistrarPaths,
) -> Result<Registration, ActivationError> {
    let fail = |reason: String| ActivationError::WrapperInstallFailed {
        ide: component.id.to_string(),
        reason,
    };

    let real_path = sidecar_path(original);
    let wrapper_path = paths.wrapper_dir.join(component.id);

    if real_path.exists() {
        return Ok(Registration::AlreadyRegistered);
    }
    if let Ok(target) = fs::read_link(original) {
        if target == wrapper_path {
            return Ok(Registration::AlreadyRegistered);
        }
    }

    if !original.is_file() {
        return Err(fail(format!(
            "launcher {} does not exist",
            original.display()
        )));
    }

    write_wrapper(component, &wrapper_path).map_err(|e| fail(format!("{e:#}")))?;

    if let Err(e) = fs::rename(original, &real_path) {
        let _ = fs::remove_file(&wrapper_path);
        return Err(fail(format!("failed to move launcher aside: {e}")));
    }

    if let Err(e) = symlink(&wrapper_path, original) {
        let _ = fs::rename(&real_path, original);
        let _ = fs::remove_file(&wrapper_path);
        return Err(fail(format!("failed to link launcher to wrapper: {e}")));
    }

    let registration = WrapperRegistration {
        ide: component.id.to_string(),
        original_path: original.to_path_buf(),
        real_path: real_path.clone(),
        wrapper_path: wrapper_path.clone(),
        registered_at: chrono::Utc::now().to_rfc3339(),
    };

    if let Err(e) = record(registration, &paths.registry_path) {
        let _ = fs::remove_file(original);
        let _ = fs::rename(&real_path, original);
        let _ = fs::remove_file(&wrapper_path);
        return Err(fail(format!("failed to record registration: {e:#}")));
    }

    Ok(Registration::Installed)
}

fn write_wrapper(component: &Component, wrapper_path: &Path) -> Result<()> {
    if let Some(parent) = wrapper_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create wrapper directory {:?}", parent))?;
    }

    let idebox = std::env::current_exe().context("Failed to resolve the idebox binary path")?;
    let contents = WRAPPER_TEMPLATE
        .replace("{IDE_ID}", component.id)
        .replace("{IDEBOX_BIN}", &idebox.display().to_string());

    fs::write(wrapper_path, contents)
        .with_context(|| format!("Failed to write wrapper {:?}", wrapper_path))?;

    let mut perms = fs::metadata(wrapper_path)
        .with_context(|| format!("Failed to stat wrapper {:?}", wrapper_path))?
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(wrapper_path, perms)
        .with_context(|| format!("Failed to mark wrapper {:?} executable", wrapper_path))?;

    Ok(())
}

fn record(registration: WrapperRegistration, registry_path: &Path) -> Result<()> {
    let mut registry = WrapperRegistry::load(registry_path)?;
    registry.upsert(registration);
    registry.save(registry_path)
}
