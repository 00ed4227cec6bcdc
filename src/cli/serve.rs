//! `docserve serve`: build, serve, and rebuild on change until Ctrl+C.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::build::{build_command, command_builder, run_once};
use crate::config::Config;
use crate::core::{is_shutdown, setup_shutdown_handler};
use crate::scheduler::Builder;
use crate::server::LiveReloadServer;
use crate::{log, warn};

pub fn run_serve(config: &Config, initial_build: bool) -> Result<()> {
    let serve = &config.serve;
    let command = build_command(config);
    let shutdown = setup_shutdown_handler()?;

    if let Some(cmd) = &command {
        // Fail before binding when the program does not exist at all.
        cmd.resolve_program()?;
        if initial_build && let Err(e) = run_once(cmd) {
            warn!("build"; "initial build failed: {:#}", e);
        }
    }

    let server = LiveReloadServer::new(serve.server_options());
    if let Some(page) = serve.error_page_path() {
        server.set_error_handler(move |code| not_found_page(&page, code));
    }

    // Without a command, changes still reload browsers.
    let builder = command
        .map(command_builder)
        .unwrap_or_else(|| Builder::named("reload", || Ok(())));
    for dir in &serve.watch {
        server.watch(dir, builder.clone());
    }

    // Ctrl+C during the initial build.
    if is_shutdown() {
        return Ok(());
    }

    server.start()?;
    let _ = shutdown.recv();

    log!("serve"; "shutting down");
    server.shutdown();
    Ok(())
}

/// Error hook body: the site's own 404 page when it has one.
fn not_found_page(page: &Path, code: u16) -> Result<Option<Vec<u8>>> {
    if code != 404 {
        return Ok(None);
    }
    match fs::read(page) {
        Ok(body) => Ok(Some(body)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", page.display())),
    }
}
