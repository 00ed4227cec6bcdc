//! Server lifecycle errors.

use std::net::IpAddr;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind {interface} on ports {first}-{last}")]
    Bind {
        interface: IpAddr,
        first: u16,
        last: u16,
        #[source]
        source: BoxError,
    },

    #[error("failed to start the {what}")]
    Start {
        what: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("server is already running")]
    AlreadyRunning,

    #[error("server has been shut down and cannot be restarted")]
    ShutDown,
}

impl ServeError {
    pub(super) fn start(what: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Start {
            what,
            source: source.into(),
        }
    }
}
