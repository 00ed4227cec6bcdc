//! Process-wide shutdown state.
//!
//! `SHUTDOWN` flips on the first Ctrl+C; the main thread is woken through a
//! channel and performs a graceful server shutdown. A second Ctrl+C exits
//! immediately, for when a build command refuses to die.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel::{self, Receiver};

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Install the Ctrl+C handler. Call once at program start.
///
/// The returned receiver yields one message per Ctrl+C press.
pub fn setup_shutdown_handler() -> anyhow::Result<Receiver<()>> {
    let (tx, rx) = channel::unbounded();

    ctrlc::set_handler(move || {
        if SHUTDOWN.swap(true, Ordering::SeqCst) {
            crate::log!("serve"; "forced exit");
            std::process::exit(130);
        }
        let _ = tx.send(());
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))?;

    Ok(rx)
}

/// Check if shutdown has been requested
///
/// Uses Relaxed ordering - worst case is one more request served before
/// stopping, which is acceptable
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
