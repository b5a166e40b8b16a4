use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::catalog::Component;
use crate::util::xdg;

/// Override the container image builder binary (tests substitute a stub).
pub const PODMAN_ENV: &str = "IDEBOX_PODMAN";
/// Override the container multiplexer binary.
pub const DISTROBOX_ENV: &str = "IDEBOX_DISTROBOX";

/// The external container toolchain, behind a seam so orchestration runs
/// without podman or distrobox installed.
pub trait ContainerEngine {
    /// Build the named image from a component selection and an optional
    /// language-server selection.
    fn build_image(&self, image: &str, selection: &str, language_servers: Option<&str>)
        -> Result<()>;

    fn container_exists(&self, name: &str) -> Result<bool>;

    fn remove_container(&self, name: &str) -> Result<()>;

    fn create_container(&self, name: &str, image: &str, mount_containers: bool) -> Result<()>;

    /// Whether a binary resolves inside the container.
    fn probe_binary(&self, name: &str, binary: &str) -> Result<bool>;

    /// Expose a component to the host menu and command path.
    fn export_component(&self, name: &str, component: &Component) -> Result<()>;
}

/// Engine shelling out to the podman and distrobox command lines.
pub struct CliEngine {
    podman: String,
    distrobox: String,
    build_context: PathBuf,
    verbose: bool,
}

impl CliEngine {
    pub fn from_env(verbose: bool, build_context: PathBuf) -> Self {
        Self {
            podman: std::env::var(PODMAN_ENV).unwrap_or_else(|_| "podman".to_string()),
            distrobox: std::env::var(DISTROBOX_ENV).unwrap_or_else(|_| "distrobox".to_string()),
            build_context,
            verbose,
        }
    }

    /// Run to completion; stream output when verbose, otherwise capture and
    /// surface stderr on failure.
    fn run(&self, program: &str, args: &[String], action: &str) -> Result<()> {
        tracing::debug!("running {} {}", program, args.join(" "));

        if self.verbose {
            let status = Command::new(program)
                .args(args)
                .status()
                .with_context(|| format!("Failed to run {program} (is it installed?)"))?;
            if !status.success() {
                bail!("{action} exited with {status}");
            }
            return Ok(());
        }

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run {program} (is it installed?)"))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{action} exited with {}: {}", output.status, stderr.trim());
        }
        Ok(())
    }

    /// Run and capture stdout regardless of verbosity.
    fn capture(&self, program: &str, args: &[String], action: &str) -> Result<String> {
        tracing::debug!("running {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run {program} (is it installed?)"))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{action} exited with {}: {}", output.status, stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run and report only whether the command succeeded.
    fn check(&self, program: &str, args: &[String]) -> Result<bool> {
        tracing::debug!("running {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run {program} (is it installed?)"))?;
        Ok(output.status.success())
    }
}

/// Parse container names out of `distrobox list` output
/// (`ID | NAME | STATUS | IMAGE`, one header line).
fn list_names(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split('|').nth(1))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

impl ContainerEngine for CliEngine {
    fn build_image(
        &self,
        image: &str,
        selection: &str,
        language_servers: Option<&str>,
    ) -> Result<()> {
        let mut args = vec![
            "build".to_string(),
            "--tag".to_string(),
            image.to_string(),
            "--build-arg".to_string(),
            format!("IDES={selection}"),
        ];
        if let Some(servers) = language_servers {
            args.push("--build-arg".to_string());
            args.push(format!("LANGUAGE_SERVERS={servers}"));
        }
        args.push(self.build_context.display().to_string());

        self.run(&self.podman, &args, "image build")
    }

    fn container_exists(&self, name: &str) -> Result<bool> {
        let stdout = self.capture(
            &self.distrobox,
            &["list".to_string(), "--no-color".to_string()],
            "container list",
        )?;
        Ok(list_names(&stdout).iter().any(|n| n == name))
    }

    fn remove_container(&self, name: &str) -> Result<()> {
        self.run(
            &self.distrobox,
            &["rm".to_string(), "--force".to_string(), name.to_string()],
            "container removal",
        )
    }

    fn create_container(&self, name: &str, image: &str, mount_containers: bool) -> Result<()> {
        let mut args = vec![
            "create".to_string(),
            "--yes".to_string(),
            "--name".to_string(),
            name.to_string(),
            "--image".to_string(),
            image.to_string(),
        ];
        if mount_containers {
            args.push("--additional-flags".to_string());
            args.push("--volume /run/podman/podman.sock:/run/podman/podman.sock".to_string());
        }

        self.run(&self.distrobox, &args, "container creation")
    }

    fn probe_binary(&self, name: &str, binary: &str) -> Result<bool> {
        self.check(
            &self.distrobox,
            &[
                "enter".to_string(),
                name.to_string(),
                "--".to_string(),
                "sh".to_string(),
                "-lc".to_string(),
                format!("command -v {binary}"),
            ],
        )
    }

    fn export_component(&self, name: &str, component: &Component) -> Result<()> {
        if component.is_gui() {
            self.run(
                &self.distrobox,
                &[
                    "enter".to_string(),
                    name.to_string(),
                    "--".to_string(),
                    "distrobox-export".to_string(),
                    "--app".to_string(),
                    component.binary.to_string(),
                ],
                &format!("{} app export", component.id),
            )?;
        }

        let bin_dir = xdg::bin_dir()?;
        self.run(
            &self.distrobox,
            &[
                "enter".to_string(),
                name.to_string(),
                "--".to_string(),
                "distrobox-export".to_string(),
                "--bin".to_string(),
                format!("/usr/bin/{}", component.binary),
                "--export-path".to_string(),
                bin_dir.display().to_string(),
            ],
            &format!("{} binary export", component.id),
        )
    }
}
