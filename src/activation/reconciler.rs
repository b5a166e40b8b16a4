use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use crate::activation::runtime;
use crate::catalog::{Component, CATALOG, REQUIRED_EXTENSIONS};
use crate::registry::WrapperRegistry;

const LOG_PREFIX: &str = "idebox-activation";

/// Override where activation logs are written (tests); defaults to the
/// shared temp directory.
pub const LOG_DIR_ENV: &str = "IDEBOX_LOG_DIR";

pub fn log_dir() -> PathBuf {
    env::var_os(LOG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(env::temp_dir)
}

/// One background activation cycle.
///
/// Reconciliation is global: every extension-capable IDE resolvable on the
/// host is brought up to the required set, not just the one whose launch
/// triggered the cycle. Repeated runs with nothing missing are cheap
/// no-ops, and cycles for different IDEs share no mutable state beyond
/// their own log files.
///
/// Returns the written log path, or `None` when activation is disabled
/// (checked first, before any side effect).
pub fn run(
    trigger: &str,
    settle: Duration,
    retention: usize,
    registry_path: &Path,
    log_dir: &Path,
) -> Result<Option<PathBuf>> {
    if !runtime::activation_enabled() {
        return Ok(None);
    }

    // Let the freshly launched IDE finish its own startup first.
    thread::sleep(settle);

    let registry = WrapperRegistry::load(registry_path).unwrap_or_default();
    let mut lines = vec![format!("activation cycle triggered by {trigger}")];

    for component in CATALOG.iter().filter(|c| c.extension_cli) {
        match resolve_binary(&registry, component) {
            Some(binary) => reconcile_ide(component, &binary, &mut lines),
            None => lines.push(format!("{}: not installed, skipping", component.id)),
        }
    }

    let path = write_log(log_dir, trigger, &lines)?;
    prune_logs(log_dir, trigger, retention)?;
    Ok(Some(path))
}

/// Bring one IDE up to the required extension set, tolerating individual
/// install failures (they are retried on the next launch).
fn reconcile_ide(component: &Component, binary: &Path, lines: &mut Vec<String>) {
    let installed = match installed_extensions(binary) {
        Ok(installed) => installed,
        Err(e) => {
            lines.push(format!("{}: failed to list extensions: {e:#}", component.id));
            return;
        }
    };

    let missing = missing_extensions(&installed);
    lines.push(format!("{}: {} missing", component.id, missing.len()));

    for extension in missing {
        match install_extension(binary, extension) {
            Ok(()) => lines.push(format!("{}: installed {extension}", component.id)),
            Err(e) => lines.push(format!(
                "{}: failed to install {extension}: {e:#}",
                component.id
            )),
        }
    }
}

/// Required extensions not present in the installed set (ids compared
/// case-insensitively).
fn missing_extensions(installed: &BTreeSet<String>) -> Vec<&'static str> {
    REQUIRED_EXTENSIONS
        .iter()
        .copied()
        .filter(|required| !installed.contains(*required))
        .collect()
}

/// Find the IDE's real binary: the registered sidecar first (never the
/// wrapper, which would recurse), then a plain `$PATH` lookup for
/// unwrapped installs.
fn resolve_binary(registry: &WrapperRegistry, component: &Component) -> Option<PathBuf> {
    if let Some(registration) = registry.get(component.id) {
        if registration.real_path.is_file() {
            return Some(registration.real_path.clone());
        }
    }

    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(component.binary))
        .find(|candidate| candidate.is_file())
}

fn installed_extensions(binary: &Path) -> Result<BTreeSet<String>> {
    let output = Command::new(binary)
        .arg("--list-extensions")
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to run {}", binary.display()))?;

    if !output.status.success() {
        bail!(
            "{} --list-extensions exited with {}",
            binary.display(),
            output.status
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| line.trim().to_lowercase())
        .filter(|line| !line.is_empty())
        .collect())
}

fn install_extension(binary: &Path, extension: &str) -> Result<()> {
    let output = Command::new(binary)
        .arg("--install-extension")
        .arg(extension)
        .arg("--force")
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to run {}", binary.display()))?;

    // The IDE reports install and already-installed as success; anything
    // else surfaces its stderr.
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("exited with {}: {}", output.status, stderr.trim());
    }
    Ok(())
}

fn write_log(dir: &Path, trigger: &str, lines: &[String]) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {:?}", dir))?;

    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S%3f");
    let path = dir.join(format!("{LOG_PREFIX}-{trigger}-{stamp}.log"));

    fs::write(&path, lines.join("\n") + "\n")
        .with_context(|| format!("Failed to write activation log {:?}", path))?;
    Ok(path)
}

/// Keep only the newest `keep` logs for an IDE; other IDEs' logs are left
/// alone. Timestamped names sort chronologically.
fn prune_logs(dir: &Path, ide: &str, keep: usize) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Ok(()),
    };

    let prefix = format!("{LOG_PREFIX}-{ide}-");
    let mut logs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|name| name.starts_with(&prefix) && name.ends_with(".log"))
                .unwrap_or(false)
        })
        .collect();

    logs.sort();

    let excess = logs.len().saturating_sub(keep);
    for stale in &logs[..excess] {
        fs::remove_file(stale)
            .with_context(|| format!("Failed to prune activation log {:?}", stale))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::WrapperRegistration;
    use serial_test::serial;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn stub_registry(temp: &TempDir, real_path: &Path) -> PathBuf {
        let registry_path = temp.path().join("wrappers.toml");
        let mut registry = WrapperRegistry::default();
        registry.upsert(WrapperRegistration {
            ide: "vscode".to_string(),
            original_path: temp.path().join("code"),
            real_path: real_path.to_path_buf(),
            wrapper_path: temp.path().join("wrappers/vscode"),
            registered_at: "2026-01-01T00:00:00Z".to_string(),
        });
        registry.save(&registry_path).unwrap();
        registry_path
    }

    /// Stub that reports every required extension as installed and records
    /// any install attempt to a file.
    fn satisfied_stub(temp: &TempDir) -> PathBuf {
        let list = REQUIRED_EXTENSIONS.join(" ");
        write_stub(
            temp.path(),
            "code-real",
            &format!(
                "if [ \"$1\" = --list-extensions ]; then\n\
                 for e in {list}; do echo \"$e\"; done\n\
                 exit 0\n\
                 fi\n\
                 echo \"$@\" >> \"${{0%/*}}/installs.txt\"\n"
            ),
        )
    }

    #[test]
    #[serial]
    fn test_zero_missing_performs_no_installs() {
        let temp = TempDir::new().unwrap();
        let stub = satisfied_stub(&temp);
        let registry_path = stub_registry(&temp, &stub);
        let log_dir = temp.path().join("logs");

        // Hermetic PATH so unregistered IDEs resolve nowhere.
        env::remove_var(runtime::DISABLE_ENV);
        let old_path = env::var_os("PATH");
        env::set_var("PATH", temp.path().join("empty"));

        let log = run(
            "vscode",
            Duration::ZERO,
            5,
            &registry_path,
            &log_dir,
        )
        .unwrap()
        .expect("cycle should write a log");

        if let Some(path) = old_path {
            env::set_var("PATH", path);
        }

        let contents = fs::read_to_string(&log).unwrap();
        assert!(contents.contains("vscode: 0 missing"));
        assert!(contents.contains("cursor: not installed, skipping"));
        // Idempotence: zero install attempts were made.
        assert!(!temp.path().join("installs.txt").exists());
    }

    #[test]
    #[serial]
    fn test_missing_extensions_are_installed() {
        let temp = TempDir::new().unwrap();
        let stub = write_stub(
            temp.path(),
            "code-real",
            "if [ \"$1\" = --list-extensions ]; then\n\
             echo rust-lang.rust-analyzer\n\
             exit 0\n\
             fi\n\
             echo \"$@\" >> \"${0%/*}/installs.txt\"\n",
        );
        let registry_path = stub_registry(&temp, &stub);
        let log_dir = temp.path().join("logs");

        env::remove_var(runtime::DISABLE_ENV);
        let old_path = env::var_os("PATH");
        env::set_var("PATH", temp.path().join("empty"));

        let log = run("vscode", Duration::ZERO, 5, &registry_path, &log_dir)
            .unwrap()
            .unwrap();

        if let Some(path) = old_path {
            env::set_var("PATH", path);
        }

        let contents = fs::read_to_string(&log).unwrap();
        assert!(contents.contains(&format!(
            "vscode: {} missing",
            REQUIRED_EXTENSIONS.len() - 1
        )));

        let installs = fs::read_to_string(temp.path().join("installs.txt")).unwrap();
        assert!(!installs.contains("rust-lang.rust-analyzer"));
        assert!(installs.contains("--install-extension golang.go --force"));
        assert!(installs.contains("--install-extension ms-python.python --force"));
    }

    #[test]
    #[serial]
    fn test_disabled_cycle_has_no_side_effects() {
        let temp = TempDir::new().unwrap();
        let registry_path = temp.path().join("wrappers.toml");
        let log_dir = temp.path().join("logs");

        env::set_var(runtime::DISABLE_ENV, "1");
        let result = run("vscode", Duration::ZERO, 5, &registry_path, &log_dir).unwrap();
        env::remove_var(runtime::DISABLE_ENV);

        assert!(result.is_none());
        // Zero log entries for the cycle.
        assert!(!log_dir.exists());
    }

    #[test]
    fn test_missing_extensions_excludes_installed() {
        let installed: BTreeSet<String> = ["rust-lang.rust-analyzer", "golang.go"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let missing = missing_extensions(&installed);
        assert!(!missing.contains(&"rust-lang.rust-analyzer"));
        assert!(!missing.contains(&"golang.go"));
        assert!(missing.contains(&"ms-python.python"));

        let none = BTreeSet::new();
        assert_eq!(missing_extensions(&none).len(), REQUIRED_EXTENSIONS.len());
    }

    #[test]
    fn test_prune_keeps_newest_per_ide() {
        let temp = TempDir::new().unwrap();

        for stamp in ["20260101-000000000", "20260102-000000000", "20260103-000000000"] {
            fs::write(
                temp.path()
                    .join(format!("{LOG_PREFIX}-vscode-{stamp}.log")),
                "",
            )
            .unwrap();
        }
        fs::write(
            temp.path()
                .join(format!("{LOG_PREFIX}-cursor-20260101-000000000.log")),
            "",
        )
        .unwrap();

        prune_logs(temp.path(), "vscode", 2).unwrap();

        let remaining: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();

        // Oldest vscode log gone, newest two kept, cursor untouched.
        assert_eq!(remaining.len(), 3);
        assert!(!remaining
            .iter()
            .any(|n| n.contains("vscode-20260101")));
        assert!(remaining.iter().any(|n| n.contains("vscode-20260103")));
        assert!(remaining.iter().any(|n| n.contains("cursor-20260101")));
    }

    #[test]
    fn test_prune_missing_dir_is_noop() {
        let temp = TempDir::new().unwrap();
        prune_logs(&temp.path().join("nope"), "vscode", 2).unwrap();
    }
}
