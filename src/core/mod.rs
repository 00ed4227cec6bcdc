//! Core types - shared state between the build side and the serving side.

mod epoch;
mod state;

pub use epoch::EpochBroadcaster;
pub use state::{is_shutdown, setup_shutdown_handler};
