use crate::cli::{Cli, Commands};
use anyhow::Result;

mod install;
mod reconcile;
mod run;
mod wrap;

pub fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Wrap { ide, path }) => wrap::execute(&ide, path),

        Some(Commands::Run { ide, args }) => run::execute(&ide, &args),

        Some(Commands::Reconcile { ide, settle }) => reconcile::execute(&ide, settle),

        None => install::execute(install::InstallArgs {
            selection: cli.selection,
            language_servers: cli.language_servers,
            force: cli.force,
            no_export: cli.no_export,
            verbose: cli.verbose,
            debug: cli.debug,
            interactive: cli.interactive,
            mount_containers: cli.mount_containers,
        }),
    }
}
