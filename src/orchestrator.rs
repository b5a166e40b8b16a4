use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::catalog::Component;
use crate::engine::ContainerEngine;
use crate::selection::{LanguageServers, Selection};
use crate::ui;

/// Phases of an installation run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Build,
    Create,
    Export,
}

/// Result of one step within a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Skipped(String),
    Failed(String),
}

/// Structured progress record; the test harness asserts on these instead of
/// text output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub phase: Phase,
    /// Component id for export-phase events; `None` for whole-run phases.
    pub component: Option<&'static str>,
    pub outcome: Outcome,
}

impl Event {
    fn phase(phase: Phase, outcome: Outcome) -> Self {
        Self {
            phase,
            component: None,
            outcome,
        }
    }

    fn component(phase: Phase, id: &'static str, outcome: Outcome) -> Self {
        Self {
            phase,
            component: Some(id),
            outcome,
        }
    }
}

/// Final disposition of a run that got past the fatal phases.
///
/// `PartialSuccess` lists the components whose export failed; both variants
/// map to a zero exit code. Note that `Success` does not imply a freshly
/// built container: declining recreation reuses the existing one and is
/// reported as a create-phase skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    PartialSuccess(Vec<String>),
}

#[derive(Debug)]
pub struct RunReport {
    pub status: RunStatus,
    pub events: Vec<Event>,
}

impl RunReport {
    pub fn failed_components(&self) -> Vec<&str> {
        match &self.status {
            RunStatus::Success => Vec::new(),
            RunStatus::PartialSuccess(failed) => failed.iter().map(String::as_str).collect(),
        }
    }
}

/// Fatal run failures; export problems are never fatal and live in the
/// report instead.
#[derive(Debug, Error)]
pub enum OrchestrateError {
    #[error("container image build failed: {reason}")]
    BuildFailed { reason: String },
    #[error("container creation failed: {reason}")]
    CreateFailed { reason: String },
}

/// Interactive confirmation seam; the default reads stdin, tests script it.
pub trait Prompt {
    fn confirm(&mut self, message: &str) -> bool;
}

/// Reads y/N from stdin; a closed stdin answers no, so non-interactive runs
/// keep an existing container.
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn confirm(&mut self, message: &str) -> bool {
        ui::confirm(message)
    }
}

/// Per-run configuration, threaded explicitly so isolated runs can target
/// distinct containers.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub container: String,
    pub image: String,
    /// Recreate an existing container without prompting.
    pub force: bool,
    /// Skip the export phase entirely.
    pub skip_export: bool,
    /// Mount the host container socket into the environment.
    pub mount_containers: bool,
    /// Grace period between container creation and export.
    pub settle: Duration,
}

type PostExportHook = Box<dyn FnMut(&'static Component) -> anyhow::Result<()>>;

/// Sequences Build -> Create -> Export over a component selection.
///
/// Build and create failures abort the run; per-component export failures
/// are recorded and the run continues.
pub struct Orchestrator<E, P> {
    engine: E,
    prompt: P,
    options: RunOptions,
    post_export: Option<PostExportHook>,
}

impl<E: ContainerEngine, P: Prompt> Orchestrator<E, P> {
    pub fn new(engine: E, prompt: P, options: RunOptions) -> Self {
        Self {
            engine,
            prompt,
            options,
            post_export: None,
        }
    }

    /// Run a hook after each successful export; a hook failure counts as an
    /// export failure for that component.
    pub fn with_post_export(
        mut self,
        hook: impl FnMut(&'static Component) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.post_export = Some(Box::new(hook));
        self
    }

    pub fn run(
        &mut self,
        selection: &Selection,
        language_servers: &LanguageServers,
    ) -> Result<RunReport, OrchestrateError> {
        let mut events = Vec::new();

        self.build(selection, language_servers, &mut events)?;
        self.create(&mut events)?;

        let mut failed: Vec<String> = Vec::new();
        if self.options.skip_export {
            ui::info("Skipping export phase");
        } else {
            self.export(selection, &mut events, &mut failed);
        }

        let status = if failed.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::PartialSuccess(failed)
        };

        Ok(RunReport { status, events })
    }

    fn build(
        &mut self,
        selection: &Selection,
        language_servers: &LanguageServers,
        events: &mut Vec<Event>,
    ) -> Result<(), OrchestrateError> {
        ui::status("Building", format!("image {}", self.options.image));

        self.engine
            .build_image(
                &self.options.image,
                &selection.build_arg(),
                language_servers.build_arg().as_deref(),
            )
            .map_err(|e| OrchestrateError::BuildFailed {
                reason: format!("{e:#}"),
            })?;

        events.push(Event::phase(Phase::Build, Outcome::Success));
        ui::success("Built", &self.options.image);
        Ok(())
    }

    fn create(&mut self, events: &mut Vec<Event>) -> Result<(), OrchestrateError> {
        let fatal = |e: anyhow::Error| OrchestrateError::CreateFailed {
            reason: format!("{e:#}"),
        };
        let name = self.options.container.clone();

        if self.engine.container_exists(&name).map_err(fatal)? {
            let recreate = self.options.force
                || self
                    .prompt
                    .confirm(&format!("Container '{name}' already exists. Recreate it?"));

            if !recreate {
                ui::info(format!("Reusing existing container '{name}'"));
                events.push(Event::phase(
                    Phase::Create,
                    Outcome::Skipped("existing container reused".to_string()),
                ));
                return Ok(());
            }

            ui::status("Removing", format!("container {name}"));
            self.engine.remove_container(&name).map_err(fatal)?;
        }

        ui::status(
            "Creating",
            format!("container {name} from {}", self.options.image),
        );
        self.engine
            .create_container(&name, &self.options.image, self.options.mount_containers)
            .map_err(fatal)?;

        events.push(Event::phase(Phase::Create, Outcome::Success));
        ui::success("Created", &name);
        Ok(())
    }

    fn export(
        &mut self,
        selection: &Selection,
        events: &mut Vec<Event>,
        failed: &mut Vec<String>,
    ) {
        if !self.options.settle.is_zero() {
            ui::status(
                "Waiting",
                format!("{}s for container readiness", self.options.settle.as_secs()),
            );
            thread::sleep(self.options.settle);
        }

        let name = self.options.container.clone();

        for component in selection.components().iter().copied() {
            // For `all`, only components that actually landed in the image
            // are export candidates; absent ones are skips, not failures.
            if selection.is_all() {
                match self.engine.probe_binary(&name, component.binary) {
                    Ok(true) => {}
                    Ok(false) => {
                        ui::status("Skipped", format!("{} (not installed)", component.id));
                        events.push(Event::component(
                            Phase::Export,
                            component.id,
                            Outcome::Skipped("not installed in container".to_string()),
                        ));
                        continue;
                    }
                    Err(e) => {
                        ui::warn(format!("Could not probe for {}: {e:#}", component.id));
                        events.push(Event::component(
                            Phase::Export,
                            component.id,
                            Outcome::Failed(format!("probe failed: {e:#}")),
                        ));
                        failed.push(component.id.to_string());
                        continue;
                    }
                }
            }

            match self.engine.export_component(&name, component) {
                Ok(()) => {
                    let outcome = match self.run_post_export(component) {
                        Ok(()) => {
                            ui::success("Exported", component.id);
                            Outcome::Success
                        }
                        Err(e) => {
                            ui::warn(format!(
                                "Exported {} but wrapping failed: {e:#}",
                                component.id
                            ));
                            failed.push(component.id.to_string());
                            Outcome::Failed(format!("wrapper install failed: {e:#}"))
                        }
                    };
                    events.push(Event::component(Phase::Export, component.id, outcome));
                }
                Err(e) => {
                    ui::warn(format!("Export of {} failed: {e:#}", component.id));
                    events.push(Event::component(
                        Phase::Export,
                        component.id,
                        Outcome::Failed(format!("{e:#}")),
                    ));
                    failed.push(component.id.to_string());
                }
            }
        }
    }

    fn run_post_export(&mut self, component: &'static Component) -> anyhow::Result<()> {
        match self.post_export.as_mut() {
            Some(hook) => hook(component),
            None => Ok(()),
        }
    }
}
