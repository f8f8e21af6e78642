//! Network infrastructure for the broker.
//!
//! # Sub-modules
//!
//! - **`listener`** – Binds the TCP listener, logs the advertised servers, and
//!   runs the accept loop that spawns one task per client.  Enforces the
//!   optional connection cap.
//!
//! - **`connection`** – Owns one client connection: reads a frame, dispatches
//!   it, writes the response, and repeats until the peer goes away, an I/O
//!   error occurs, or the idle timeout expires.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

pub mod connection;
pub mod listener;

pub use connection::{CloseReason, ConnectionHandler};
pub use listener::BrokerService;

/// Error type for socket-level operations.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),
    #[error("could not determine local address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// Socket-level settings for the broker service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Address the TCP listener binds to.
    pub bind_addr: SocketAddr,
    /// Maximum number of simultaneous client connections; `None` = unlimited.
    pub max_connections: Option<usize>,
    /// Close a connection after this long without receiving any bytes.
    pub idle_timeout: Option<Duration>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8372)),
            max_connections: None,
            idle_timeout: None,
        }
    }
}
