//! Socket binding.

use std::net::{IpAddr, SocketAddr};

use tiny_http::Server;

use super::ServeError;
use crate::log;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Bind to the specified interface and port, with automatic port retry.
///
/// Port 0 asks the OS for any free port and is tried once. The returned
/// address is the one actually bound.
pub(super) fn bind_with_retry(
    interface: IpAddr,
    base_port: u16,
) -> Result<(Server, SocketAddr), ServeError> {
    let attempts = if base_port == 0 { 1 } else { MAX_PORT_RETRIES };
    let mut last_port = base_port;
    let mut last_err = None;

    for offset in 0..attempts {
        let Some(port) = base_port.checked_add(offset) else {
            break;
        };
        last_port = port;
        let requested = SocketAddr::new(interface, port);

        match Server::http(requested) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                let addr = server.server_addr().to_ip().unwrap_or(requested);
                return Ok((server, addr));
            }
            Err(e) => last_err = Some(e),
        }
    }

    Err(ServeError::Bind {
        interface,
        first: base_port,
        last: last_port,
        source: last_err.unwrap_or_else(|| "no port available".into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    const LOCALHOST: IpAddr = IpAddr::V4(std::net::Ipv4Addr::LOCALHOST);

    #[test]
    fn test_port_zero_reports_real_port() {
        let (_server, addr) = bind_with_retry(LOCALHOST, 0).unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(addr.ip(), LOCALHOST);
    }

    #[test]
    fn test_taken_port_is_retried() {
        let taken = TcpListener::bind((LOCALHOST, 0)).unwrap();
        let port = taken.local_addr().unwrap().port();
        if port > u16::MAX - MAX_PORT_RETRIES {
            return;
        }

        let (_server, addr) = bind_with_retry(LOCALHOST, port).unwrap();
        assert!(addr.port() > port);
        assert!(addr.port() < port + MAX_PORT_RETRIES);
    }
}
