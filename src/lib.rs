//! docserve - a live-reloading preview server for documentation sites.
//!
//! Watches source directories, reruns the site build when they change, and
//! reloads every open browser tab through an HTTP long-poll once the rebuild
//! is done.

// Builder and error-hook panics are contained with `catch_unwind`.
#[cfg(panic = "abort")]
compile_error!("docserve must be built with `panic = \"unwind\"`");

pub mod cli;
pub mod config;
pub mod core;
pub mod embed;
pub mod logger;
pub mod scheduler;
pub mod serve;
pub mod server;
pub mod utils;
pub mod watch;

pub use crate::core::EpochBroadcaster;
pub use scheduler::Builder;
pub use server::{LiveReloadServer, ServeError, ServerOptions};
