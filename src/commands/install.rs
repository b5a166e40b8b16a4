use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

use crate::activation::registrar::{self, RegistrarPaths};
use crate::catalog::CATALOG;
use crate::config::Config;
use crate::engine::CliEngine;
use crate::orchestrator::{Orchestrator, RunOptions, RunStatus, StdinPrompt};
use crate::selection::{self, LanguageServers, Selection};
use crate::ui;
use crate::util::xdg;

pub struct InstallArgs {
    pub selection: Option<String>,
    pub language_servers: Option<String>,
    pub force: bool,
    pub no_export: bool,
    pub verbose: bool,
    pub debug: bool,
    pub interactive: bool,
    pub mount_containers: bool,
}

pub fn execute(args: InstallArgs) -> Result<()> {
    let verbose = args.verbose || args.debug;
    let config = Config::load_default()?;

    if args.debug {
        dump_config(&config);
    }

    // The LSP prefix decides which positional is which.
    let (selection_raw, lsp_raw) = selection::split_raw(args.selection, args.language_servers);

    let selection_raw = if args.interactive {
        Some(interactive_selection()?)
    } else {
        selection_raw
    };

    let selection = match selection_raw {
        Some(raw) => Selection::parse(&raw)?,
        None => Selection::all(),
    };

    let language_servers = match lsp_raw {
        Some(raw) => LanguageServers::parse(&raw)?,
        None => LanguageServers::default(),
    };

    if !language_servers.is_empty() && !selection.uses_language_servers() {
        ui::warn(
            "Language servers were selected but no terminal editor in the selection uses them; \
             they will be installed but unused",
        );
    }

    let engine = CliEngine::from_env(verbose, PathBuf::from(&config.build_context));
    let options = RunOptions {
        container: config.container.clone(),
        image: config.image.clone(),
        force: args.force,
        skip_export: args.no_export,
        mount_containers: args.mount_containers,
        settle: Duration::from_secs(config.settle_secs),
    };

    // Fires on every fatal exit path until the run gets past the fatal
    // phases.
    let tip = ui::FailureTip::arm(format!(
        "Re-run with --debug for stage-level diagnostics, or try the failing stage manually:\n\
         podman build --tag {image} {context}\n\
         distrobox create --yes --name {container} --image {image}",
        image = config.image,
        context = config.build_context,
        container = config.container,
    ));

    let wrapper_paths = RegistrarPaths::from_xdg()?;
    let bin_dir = xdg::bin_dir()?;
    let mut orchestrator =
        Orchestrator::new(engine, StdinPrompt, options).with_post_export(move |component| {
            if !component.extension_cli {
                return Ok(());
            }
            let launcher = bin_dir.join(component.binary);
            registrar::register(component, &launcher, &wrapper_paths)?;
            Ok(())
        });

    let report = match orchestrator.run(&selection, &language_servers) {
        Ok(report) => report,
        Err(e) => {
            ui::error(&e);
            drop(tip);
            std::process::exit(1);
        }
    };
    tip.disarm();

    match &report.status {
        RunStatus::Success => {
            ui::success(
                "Done",
                format!("{} component(s) ready", selection.components().len()),
            );
        }
        RunStatus::PartialSuccess(failed) => {
            ui::warn(format!(
                "Completed with export failures: {}",
                failed.join(", ")
            ));
            ui::info("Re-run the same selection to retry the failed exports");
        }
    }

    Ok(())
}

fn dump_config(config: &Config) {
    ui::info(format!(
        "container={} image={} build_context={} settle={}s activation_settle={}s log_retention={}",
        config.container,
        config.image,
        config.build_context,
        config.settle_secs,
        config.activation_settle_secs,
        config.log_retention,
    ));
}

fn interactive_selection() -> Result<String> {
    ui::info("Available components:");
    for component in CATALOG {
        println!("  {:<10} {} ({})", component.id, component.name, component.kind);
    }
    Ok(ui::prompt_line(
        "Select components (comma-separated, or 'all')",
    )?)
}
