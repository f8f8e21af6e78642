//! World-server advertisements and the immutable directory built from them.
//!
//! A [`Directory`] is constructed once at startup from the configured list of
//! [`ServerAdvertisement`]s and then shared read-only by every connection.
//! Occupancy is not a field of the advertisement: it is supplied
//! at encode time from the live-session count, so no shared record is ever
//! mutated.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::protocol::codec::ProtocolError;
use crate::protocol::directory::{build_directory, parse_ipv4_octets};

/// Maximum number of entries one directory response can describe.
pub const MAX_DIRECTORY_ENTRIES: usize = u8::MAX as usize;

/// Maximum encoded length of a one-byte length-prefixed string.
pub const MAX_SHORT_STRING: usize = u8::MAX as usize;

/// Errors raised while validating a directory.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("directory has {0} entries, at most {MAX_DIRECTORY_ENTRIES} are allowed")]
    TooManyEntries(usize),

    #[error("server #{position} name is {len} bytes, at most {MAX_SHORT_STRING} are allowed")]
    NameTooLong { position: usize, len: usize },
}

/// One world server listed in a directory response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAdvertisement {
    /// Display name shown in the client's server list.
    pub name: String,
    /// Free-form description; the occupancy line is appended when encoded.
    #[serde(default)]
    pub description: String,
    /// Dotted IPv4 address clients should connect to.
    pub address: String,
    /// World-server TCP port.
    pub port: u16,
    /// Maximum number of players.
    pub capacity: u16,
    /// Whether clients may join this server.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ServerAdvertisement {
    /// Convenience constructor for an enabled server.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        address: impl Into<String>,
        port: u16,
        capacity: u16,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            address: address.into(),
            port,
            capacity,
            enabled: true,
        }
    }
}

/// Validated, ordered list of advertisements.
///
/// The position of each entry in the list is its position index on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    entries: Vec<ServerAdvertisement>,
}

impl Directory {
    /// Validates `entries` against the wire-format limits.
    ///
    /// Addresses that do not parse as four numeric octets are accepted (the
    /// offending octets are encoded as 0) but logged here so the problem is
    /// visible at startup rather than per request.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when there are more than 255 entries or a
    /// name does not fit its one-byte length prefix.
    pub fn new(entries: Vec<ServerAdvertisement>) -> Result<Self, DirectoryError> {
        if entries.len() > MAX_DIRECTORY_ENTRIES {
            return Err(DirectoryError::TooManyEntries(entries.len()));
        }

        for (position, entry) in entries.iter().enumerate() {
            if entry.name.len() > MAX_SHORT_STRING {
                return Err(DirectoryError::NameTooLong {
                    position,
                    len: entry.name.len(),
                });
            }
            if parse_ipv4_octets(&entry.address).is_none() {
                warn!(
                    "server #{position} ({}) has malformed address {:?}; bad octets sent as 0",
                    entry.name, entry.address
                );
            }
        }

        Ok(Self { entries })
    }

    /// Returns the advertisements in wire order.
    pub fn entries(&self) -> &[ServerAdvertisement] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the directory with `occupancy` stamped into every entry.
    ///
    /// # Errors
    ///
    /// Propagates [`ProtocolError`] from [`build_directory`]; a directory that
    /// passed [`Directory::new`] never fails.
    pub fn encode(&self, occupancy: u16) -> Result<Vec<u8>, ProtocolError> {
        build_directory(&self.entries, occupancy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(name: &str) -> ServerAdvertisement {
        ServerAdvertisement::new(name, "desc", "10.0.0.1", 8360, 100)
    }

    #[test]
    fn test_directory_accepts_empty_list() {
        let dir = Directory::new(vec![]).unwrap();
        assert!(dir.is_empty());
        assert_eq!(dir.encode(0).unwrap(), vec![0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_directory_accepts_255_entries() {
        let entries = (0..255).map(|i| server(&format!("s{i}"))).collect();
        let dir = Directory::new(entries).unwrap();
        assert_eq!(dir.len(), 255);
    }

    #[test]
    fn test_directory_rejects_256_entries() {
        let entries = (0..256).map(|i| server(&format!("s{i}"))).collect();
        let result = Directory::new(entries);
        assert_eq!(result, Err(DirectoryError::TooManyEntries(256)));
    }

    #[test]
    fn test_directory_rejects_overlong_name() {
        // Arrange
        let mut long = server("ok");
        long.name = "x".repeat(256);

        // Act
        let result = Directory::new(vec![server("first"), long]);

        // Assert
        let expected = DirectoryError::NameTooLong {
            position: 1,
            len: 256,
        };
        assert_eq!(result, Err(expected));
    }

    #[test]
    fn test_directory_tolerates_malformed_address() {
        let mut bad = server("bad");
        bad.address = "10.0.x.1".to_string();
        assert!(Directory::new(vec![bad]).is_ok());
    }

    #[test]
    fn test_entries_preserve_order() {
        let dir = Directory::new(vec![server("a"), server("b"), server("c")]).unwrap();
        let names: Vec<_> = dir.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_new_advertisement_is_enabled() {
        assert!(server("x").enabled);
    }
}
