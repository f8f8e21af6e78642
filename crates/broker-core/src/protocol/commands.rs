//! Command codes carried in bytes 4..6 of every frame header.

/// All command codes the broker understands or emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Command {
    /// Client → broker: login request.  The body is not inspected.
    AuthRequest = 0x1013,
    /// Broker → client: login acknowledgement, body `00 00`.
    AuthAck = 0x1312,
    /// Client → broker: request for the world-server directory.
    DirectoryRequest = 0x1100,
    /// Broker → client: serialized world-server directory.
    DirectoryResponse = 0x1102,
}

impl Command {
    /// Returns the wire value of this command.
    pub fn code(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for Command {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, u16> {
        match value {
            0x1013 => Ok(Command::AuthRequest),
            0x1312 => Ok(Command::AuthAck),
            0x1100 => Ok(Command::DirectoryRequest),
            0x1102 => Ok(Command::DirectoryResponse),
            other => Err(other),
        }
    }
}

impl From<Command> for u16 {
    fn from(command: Command) -> Self {
        command.code()
    }
}
