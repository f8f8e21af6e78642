//! CommandDispatcher: maps inbound command codes to response frames.
//!
//! | Inbound  | Response                                             |
//! |----------|------------------------------------------------------|
//! | `0x1013` | `0x1312` with body `00 00`, sequence `0xCBEB`         |
//! | `0x1100` | `0x1102` with the serialized directory                |
//! | other    | nothing                                              |
//!
//! The login request is acknowledged unconditionally; credentials are not
//! checked at this layer.

use std::sync::Arc;

use broker_core::protocol::{encode_frame, Command, FrameHeader, ProtocolError, SequenceBase};
use broker_core::{Directory, LiveSessionCount};

/// Body of the login acknowledgement.
pub const LOGIN_ACK_BODY: [u8; 2] = [0x00, 0x00];

/// Source of the occupancy value stamped into directory responses.
///
/// The production implementation is [`LiveSessionCount`]; tests substitute a
/// mock to observe how often the value is read.
#[cfg_attr(test, mockall::automock)]
pub trait OccupancySource: Send + Sync {
    /// Returns the current number of connected world sessions.
    fn occupancy(&self) -> u16;
}

impl OccupancySource for LiveSessionCount {
    fn occupancy(&self) -> u16 {
        LiveSessionCount::occupancy(self)
    }
}

/// What the connection should do after a frame has been dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Write `frame` back to the client.
    Reply { command: Command, frame: Vec<u8> },
    /// The command code is not handled; nothing is written.
    Unknown(u16),
}

/// Stateless dispatcher shared by every connection task.
pub struct CommandDispatcher {
    directory: Arc<Directory>,
    occupancy: Arc<dyn OccupancySource>,
}

impl CommandDispatcher {
    pub fn new(directory: Arc<Directory>, occupancy: Arc<dyn OccupancySource>) -> Self {
        Self {
            directory,
            occupancy,
        }
    }

    /// Returns the advertised directory.
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Produces the response for one decoded frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the directory cannot be serialized or the
    /// response does not fit a frame.  The connection stays open either way.
    pub fn dispatch(&self, header: &FrameHeader) -> Result<DispatchOutcome, ProtocolError> {
        match header.known_command() {
            Ok(Command::AuthRequest) => {
                let command = Command::AuthAck;
                let frame =
                    encode_frame(SequenceBase::FreshLogin, command.code(), &LOGIN_ACK_BODY)?;
                Ok(DispatchOutcome::Reply { command, frame })
            }
            Ok(Command::DirectoryRequest) => {
                // One read per response: every entry carries the same value.
                let occupancy = self.occupancy.occupancy();
                let body = self.directory.encode(occupancy)?;
                let command = Command::DirectoryResponse;
                let frame = encode_frame(SequenceBase::Cumulative(0), command.code(), &body)?;
                Ok(DispatchOutcome::Reply { command, frame })
            }
            // Outbound-only codes sent by a client are treated like any other
            // unhandled command.
            Ok(other) => Ok(DispatchOutcome::Unknown(other.code())),
            Err(code) => Ok(DispatchOutcome::Unknown(code)),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
