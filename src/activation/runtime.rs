use anyhow::{Context, Result};
use std::env;
use std::ffi::OsString;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::activation::ActivationError;
use crate::registry::WrapperRegistry;

/// Set to `1` or `true` to disable background extension installation.
pub const DISABLE_ENV: &str = "IDEBOX_NO_AUTO_EXTENSIONS";

/// Whether background extension activation is enabled.
pub fn activation_enabled() -> bool {
    match env::var(DISABLE_ENV) {
        Ok(value) => {
            let value = value.trim();
            !(value == "1" || value.eq_ignore_ascii_case("true"))
        }
        Err(_) => true,
    }
}

/// Entry point for generated wrappers.
///
/// Launching the real binary is the primary, blocking action: output and
/// exit code are indistinguishable from a direct launch because this
/// process is replaced by it. The reconciliation task is spawned first,
/// detached, so it survives the exec.
pub fn run_wrapped(ide: &str, args: &[OsString], registry_path: &Path) -> Result<()> {
    let registry = WrapperRegistry::load(registry_path)?;
    let registration = registry
        .get(ide)
        .ok_or_else(|| ActivationError::NotRegistered {
            ide: ide.to_string(),
        })?;

    if !registration.real_path.is_file() {
        return Err(ActivationError::RealBinaryMissing {
            ide: ide.to_string(),
            path: registration.real_path.clone(),
        }
        .into());
    }

    if activation_enabled() {
        // A failed spawn must not block the launch the user asked for.
        if let Err(e) = spawn_reconciler(ide) {
            tracing::warn!("could not schedule extension reconciliation: {e:#}");
        }
    }

    // The wrapper may receive a literal `--` separator from the shell;
    // the real binary must not see it.
    let args = match args.first() {
        Some(first) if first.as_os_str() == "--" => &args[1..],
        _ => args,
    };

    // Replaces this process; only returns on failure.
    let err = Command::new(&registration.real_path).args(args).exec();
    Err(anyhow::Error::new(err)
        .context(format!("Failed to launch {}", registration.real_path.display())))
}

fn spawn_reconciler(ide: &str) -> Result<()> {
    let idebox = env::current_exe().context("Failed to resolve the idebox binary path")?;

    Command::new(idebox)
        .arg("reconcile")
        .arg("--ide")
        .arg(ide)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        // Own process group: the task must outlive this process and its
        // terminal, which are about to be taken over by the real binary.
        .process_group(0)
        .spawn()
        .context("Failed to spawn the reconciliation task")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::WrapperRegistration;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_activation_enabled_by_default() {
        env::remove_var(DISABLE_ENV);
        assert!(activation_enabled());
    }

    #[test]
    #[serial]
    fn test_activation_disabled_by_affirmative_values() {
        for value in ["1", "true", "TRUE", " true "] {
            env::set_var(DISABLE_ENV, value);
            assert!(!activation_enabled(), "value {value:?} should disable");
        }
        // Only affirmative values disable; anything else stays enabled.
        for value in ["0", "false", "yes", ""] {
            env::set_var(DISABLE_ENV, value);
            assert!(activation_enabled(), "value {value:?} should not disable");
        }
        env::remove_var(DISABLE_ENV);
    }

    #[test]
    fn test_unregistered_ide_fails() {
        let temp = TempDir::new().unwrap();
        let registry_path = temp.path().join("wrappers.toml");

        let err = run_wrapped("vscode", &[], &registry_path).unwrap_err();
        let err = err.downcast::<ActivationError>().unwrap();
        assert!(matches!(err, ActivationError::NotRegistered { .. }));
    }

    #[test]
    fn test_missing_real_binary_fails_fast() {
        let temp = TempDir::new().unwrap();
        let registry_path = temp.path().join("wrappers.toml");

        let mut registry = WrapperRegistry::default();
        registry.upsert(WrapperRegistration {
            ide: "vscode".to_string(),
            original_path: temp.path().join("code"),
            real_path: temp.path().join("code-real"),
            wrapper_path: temp.path().join("wrappers/vscode"),
            registered_at: "2026-01-01T00:00:00Z".to_string(),
        });
        registry.save(&registry_path).unwrap();

        let err = run_wrapped("vscode", &[], &registry_path).unwrap_err();
        let err = err.downcast::<ActivationError>().unwrap();
        match err {
            ActivationError::RealBinaryMissing { ide, path } => {
                assert_eq!(ide, "vscode");
                assert_eq!(path, temp.path().join("code-real"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
