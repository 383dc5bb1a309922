//! Listening socket setup with busy-port fallback.

use std::io;
use std::net::{IpAddr, SocketAddr};

use thiserror::Error;
use tokio::net::TcpListener;

#[derive(Debug, Error)]
pub enum BindError {
    #[error("no free port in {first}..={last} after {attempts} attempt(s)")]
    Exhausted { first: u16, last: u16, attempts: u32 },

    #[error("failed to bind {addr}: {source}")]
    Io {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Bind `host:port`, moving to the next port while the address is in use.
///
/// Tries at most `max_attempts` ports (at least one) and never wraps past
/// 65535. Errors other than `AddrInUse` are returned immediately.
pub async fn bind_with_retry(
    host: IpAddr,
    port: u16,
    max_attempts: u32,
) -> Result<TcpListener, BindError> {
    let max_attempts = max_attempts.max(1);
    let mut current = port;
    let mut attempts = 0;

    loop {
        attempts += 1;
        let addr = SocketAddr::new(host, current);
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                if attempts > 1 {
                    tracing::info!(requested = port, bound = current, "Bound fallback port");
                }
                return Ok(listener);
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                let next = current.checked_add(1).filter(|_| attempts < max_attempts);
                let Some(next) = next else {
                    tracing::error!(first = port, last = current, attempts, "No free port found");
                    return Err(BindError::Exhausted {
                        first: port,
                        last: current,
                        attempts,
                    });
                };
                tracing::warn!("Port {current} is busy, trying {next}...");
                current = next;
            }
            Err(source) => return Err(BindError::Io { addr, source }),
        }
    }
}
