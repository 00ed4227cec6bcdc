//! docserve - live-reloading documentation preview server.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use docserve::cli::{self, Cli, Commands};
use docserve::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    docserve::logger::set_verbose(cli.verbose);

    let config = Config::load(&cli)?;

    match &cli.command {
        Commands::Serve {
            no_initial_build, ..
        } => cli::serve::run_serve(&config, !no_initial_build),
        Commands::Build { .. } => cli::build::run_build(&config),
    }
}
