//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// Live-reloading documentation preview server
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: docserve.toml, searched upward)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Print debug output (watch events, poll traffic)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve the site, rebuilding and reloading browsers on change
    #[command(visible_alias = "s")]
    Serve {
        /// Directory served over HTTP
        #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
        root: Option<PathBuf>,

        /// Directory to watch (repeatable; replaces the configured list)
        #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
        watch: Vec<PathBuf>,

        #[command(flatten)]
        build: BuildArgs,

        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Skip the build that normally runs before serving
        #[arg(long)]
        no_initial_build: bool,
    },

    /// Run the build command once and exit
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build: BuildArgs,
    },
}

/// Shared build arguments for Build and Serve commands
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Build command, split on whitespace (e.g. "mkdocs build"); "" disables it
    #[arg(short = 'b', long = "build", value_name = "CMD")]
    pub command: Option<String>,
}

impl BuildArgs {
    /// The command as argv, if given on the command line.
    pub fn argv(&self) -> Option<Vec<String>> {
        self.command
            .as_ref()
            .map(|cmd| cmd.split_whitespace().map(str::to_owned).collect())
    }
}

impl Cli {
    pub fn build_args(&self) -> &BuildArgs {
        match &self.command {
            Commands::Serve { build, .. } | Commands::Build { build } => build,
        }
    }
}
