use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// idebox - containerized IDE provisioning
///
/// Builds a developer container image with your selected IDEs and language
/// servers, creates the container, and exports launchers to the host.
/// Exported VS Code-family IDEs are wrapped so required extensions install
/// in the background the first time you actually launch them.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Comma-separated components to install (e.g. "zed,cursor"); "all" or
    /// no selection installs everything
    #[arg(value_name = "COMPONENTS")]
    pub selection: Option<String>,

    /// Language servers to bake into the image, prefixed with "LSP:"
    /// (e.g. "LSP:rust-analyzer,gopls")
    #[arg(value_name = "LSP")]
    pub language_servers: Option<String>,

    /// Recreate an existing container without prompting
    #[arg(short, long)]
    pub force: bool,

    /// Skip exporting launchers to the host
    #[arg(short = 'n', long = "no-export")]
    pub no_export: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug output (implies --verbose, dumps resolved configuration)
    #[arg(short, long)]
    pub debug: bool,

    /// Prompt for the component selection even if one was supplied
    #[arg(short, long)]
    pub interactive: bool,

    /// Mount the host container socket into the environment
    #[arg(long)]
    pub mount_containers: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Wrap an exported IDE launcher for deferred extension activation
    ///
    /// Normally invoked by the export phase; useful manually when a
    /// launcher was installed outside idebox.
    Wrap {
        /// Canonical IDE id (e.g. "vscode")
        #[arg(value_name = "IDE")]
        ide: String,

        /// Launcher path to wrap (defaults to ~/.local/bin/<binary>)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },

    /// Launch a wrapped IDE (invoked by generated wrappers)
    #[command(hide = true)]
    Run {
        /// Canonical IDE id
        #[arg(value_name = "IDE")]
        ide: String,

        /// Arguments passed through to the real binary
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },

    /// Reconcile installed vs required IDE extensions (background task body)
    #[command(hide = true)]
    Reconcile {
        /// IDE whose launch triggered this cycle
        #[arg(long, value_name = "IDE")]
        ide: String,

        /// Seconds to wait before reconciling (defaults from config)
        #[arg(long, value_name = "SECS")]
        settle: Option<u64>,
    },
}
