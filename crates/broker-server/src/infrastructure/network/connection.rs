//! Per-connection task: read a frame, dispatch it, write the response.
//!
//! # Lifecycle
//!
//! ```text
//!           ┌──────────────┐  read n ≥ 6   ┌─────────────┐
//!  accept ─►│ AwaitingFrame│──────────────►│ Dispatching │
//!           └──────────────┘◄──────────────└─────────────┘
//!              │   ▲   n < 6: log, discard      │ write error
//!              │   └────────┘                   ▼
//!              │ EOF / read error / idle     ┌────────┐
//!              └────────────────────────────►│ Closed │
//!                                            └────────┘
//! ```
//!
//! One socket read is treated as one complete frame; bytes are never carried
//! over between reads.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use broker_core::protocol::{decode_header, Command};

use crate::application::dispatch::{CommandDispatcher, DispatchOutcome};
use crate::infrastructure::network::NetworkError;

/// Size of the per-connection read buffer.
pub const READ_BUFFER_SIZE: usize = 1024;

/// Why a connection ended without an I/O error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed its side (read returned 0 bytes).
    PeerClosed,
    /// Nothing was received within the configured idle timeout.
    IdleTimeout,
}

/// Drives a single client connection.
///
/// The handler is shared by every connection task; it holds no
/// per-connection state.
pub struct ConnectionHandler {
    dispatcher: Arc<CommandDispatcher>,
    idle_timeout: Option<Duration>,
}

impl ConnectionHandler {
    pub fn new(dispatcher: Arc<CommandDispatcher>, idle_timeout: Option<Duration>) -> Self {
        Self {
            dispatcher,
            idle_timeout,
        }
    }

    /// Runs the connection until it closes and logs the outcome.
    ///
    /// The stream is dropped (and therefore closed) on return.
    pub async fn handle<S>(&self, stream: S, peer: &str)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match self.run(stream, peer).await {
            Ok(CloseReason::PeerClosed) => info!("connection {peer} closed by peer"),
            Ok(CloseReason::IdleTimeout) => info!("connection {peer} closed after idle timeout"),
            Err(e) => warn!("connection {peer} closed with error: {e}"),
        }
    }

    /// Reads and answers frames until the connection ends.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Read`] or [`NetworkError::Write`] on socket
    /// failure; either ends the connection.
    pub async fn run<S>(&self, mut stream: S, peer: &str) -> Result<CloseReason, NetworkError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let mut received_total: usize = 0;

        loop {
            let n = match self.read_with_timeout(&mut stream, &mut buf).await? {
                Some(0) => return Ok(CloseReason::PeerClosed),
                Some(n) => n,
                None => return Ok(CloseReason::IdleTimeout),
            };
            received_total += n;
            let packet = &buf[..n];

            let header = match decode_header(packet) {
                Ok(header) => header,
                Err(e) => {
                    warn!("invalid packet from {peer}: {e}; bytes {packet:02X?}");
                    continue;
                }
            };
            debug!(
                "{peer}: frame command=0x{:04X} length={} (received {received_total} bytes so far)",
                header.command, header.length
            );

            match self.dispatcher.dispatch(&header) {
                Ok(DispatchOutcome::Reply { command, frame }) => {
                    match command {
                        Command::AuthAck => info!("{peer}: authentication request acknowledged"),
                        Command::DirectoryResponse => info!(
                            "{peer}: server directory sent ({} servers, {} bytes)",
                            self.dispatcher.directory().len(),
                            frame.len()
                        ),
                        _ => {}
                    }
                    stream.write_all(&frame).await.map_err(NetworkError::Write)?;
                    stream.flush().await.map_err(NetworkError::Write)?;
                }
                Ok(DispatchOutcome::Unknown(code)) => {
                    warn!("{peer}: unknown command 0x{code:04X}");
                }
                Err(e) => {
                    let code = header.command;
                    error!("{peer}: failed to build response to 0x{code:04X}: {e}");
                }
            }
        }
    }

    /// Reads once, returning `None` if the idle timeout expires first.
    async fn read_with_timeout<S>(
        &self,
        stream: &mut S,
        buf: &mut [u8],
    ) -> Result<Option<usize>, NetworkError>
    where
        S: AsyncRead + Unpin,
    {
        match self.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, stream.read(buf)).await {
                Ok(result) => result.map(Some).map_err(NetworkError::Read),
                Err(_) => Ok(None),
            },
            None => stream.read(buf).await.map(Some).map_err(NetworkError::Read),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
