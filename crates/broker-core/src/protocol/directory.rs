//! Serializer for the world-server directory body (command `0x1102`).
//!
//! Layout:
//! ```text
//! 00 00 01 <count:1>
//! repeated <count> times:
//!   position(1) reserved(2) nameLen(1) name descLen(1) desc
//!   ip(4) port(2, BE) occupancy(2, LE) capacity(2, LE) enabled(1)
//! ```
//!
//! The port is the only big-endian field in the whole protocol.

use tracing::debug;

use crate::domain::advertisement::{ServerAdvertisement, MAX_DIRECTORY_ENTRIES, MAX_SHORT_STRING};
use crate::protocol::codec::{write_u16_be, write_u16_le, ProtocolError};

/// Fixed bytes that open every directory body, before the entry count.
const DIRECTORY_PREAMBLE: [u8; 3] = [0x00, 0x00, 0x01];

/// Serializes `servers` in list order, stamping `occupancy` into each entry.
///
/// Pure: the output depends only on the arguments.
///
/// # Errors
///
/// - [`ProtocolError::DirectoryTooLarge`] if there are more than 255 servers.
/// - [`ProtocolError::FieldTooLong`] if a server name exceeds 255 bytes.
///
/// # Examples
///
/// ```rust
/// use broker_core::domain::advertisement::ServerAdvertisement;
/// use broker_core::protocol::build_directory;
///
/// let servers = vec![
///     ServerAdvertisement::new("Avalon", "Beginners", "127.0.0.1", 8360, 100),
///     ServerAdvertisement::new("Bahamut", "Veterans", "10.0.0.2", 8361, 50),
/// ];
/// let body = build_directory(&servers, 3).unwrap();
/// assert_eq!(&body[..4], &[0x00, 0x00, 0x01, 0x02]);
/// ```
pub fn build_directory(
    servers: &[ServerAdvertisement],
    occupancy: u16,
) -> Result<Vec<u8>, ProtocolError> {
    if servers.len() > MAX_DIRECTORY_ENTRIES {
        return Err(ProtocolError::DirectoryTooLarge(servers.len()));
    }

    let mut buf = Vec::with_capacity(4 + servers.len() * 64);
    buf.extend_from_slice(&DIRECTORY_PREAMBLE);
    buf.push(servers.len() as u8);

    for (position, server) in servers.iter().enumerate() {
        encode_entry(&mut buf, position as u8, server, occupancy)?;
    }
    Ok(buf)
}

/// Formats the description shown by the client, with the occupancy line
/// appended.
///
/// The result always fits a one-byte length prefix.  When it would not, the
/// caller-supplied description is cut on a character boundary so the
/// `[occupancy/capacity]` suffix survives intact.
pub fn compose_description(description: &str, occupancy: u16, capacity: u16) -> String {
    let suffix = format!("\r\n[{occupancy}/{capacity}] players online");
    let budget = MAX_SHORT_STRING - suffix.len();

    let head = if description.len() > budget {
        debug!(
            "description of {} bytes truncated to {budget} to fit the directory entry",
            description.len()
        );
        truncate_on_char_boundary(description, budget)
    } else {
        description
    };

    let mut composed = String::with_capacity(head.len() + suffix.len());
    composed.push_str(head);
    composed.push_str(&suffix);
    composed
}

/// Parses a dotted IPv4 address strictly.
///
/// Returns `None` unless the address is exactly four decimal octets.
pub fn parse_ipv4_octets(address: &str) -> Option<[u8; 4]> {
    let mut octets = [0u8; 4];
    let mut parts = address.split('.');
    for slot in octets.iter_mut() {
        *slot = parts.next()?.trim().parse().ok()?;
    }
    match parts.next() {
        Some(_) => None,
        None => Some(octets),
    }
}

/// Best-effort octets for the wire: each unparseable part becomes 0, missing
/// parts are 0 and parts beyond the fourth are ignored.
pub fn ipv4_octets_lenient(address: &str) -> [u8; 4] {
    let mut octets = [0u8; 4];
    for (slot, part) in octets.iter_mut().zip(address.split('.')) {
        *slot = part.trim().parse().unwrap_or(0);
    }
    octets
}

// ── Entry encoding ────────────────────────────────────────────────────────────

fn encode_entry(
    buf: &mut Vec<u8>,
    position: u8,
    server: &ServerAdvertisement,
    occupancy: u16,
) -> Result<(), ProtocolError> {
    buf.push(position);
    buf.push(0x00); // reserved
    buf.push(0x00); // reserved

    write_short_string(buf, "server name", &server.name)?;
    let description = compose_description(&server.description, occupancy, server.capacity);
    write_short_string(buf, "server description", &description)?;

    buf.extend_from_slice(&ipv4_octets_lenient(&server.address));
    write_u16_be(buf, server.port);
    write_u16_le(buf, occupancy);
    write_u16_le(buf, server.capacity);
    buf.push(if server.enabled { 0x01 } else { 0x00 });
    Ok(())
}

fn write_short_string(
    buf: &mut Vec<u8>,
    field: &'static str,
    value: &str,
) -> Result<(), ProtocolError> {
    let len = value.len();
    if len > MAX_SHORT_STRING {
        return Err(ProtocolError::FieldTooLong { field, len });
    }
    buf.push(len as u8);
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

fn truncate_on_char_boundary(s: &str, max_len: usize) -> &str {
    let mut end = max_len.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn avalon() -> ServerAdvertisement {
        ServerAdvertisement::new("Avalon", "Beginners", "127.0.0.1", 8360, 100)
    }

    #[test]
    fn test_empty_directory_is_preamble_and_zero_count() {
        let body = build_directory(&[], 0).unwrap();
        assert_eq!(body, vec![0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_single_entry_exact_bytes() {
        // Arrange
        let servers = [avalon()];

        // Act
        let body = build_directory(&servers, 3).unwrap();

        // Assert
        let mut expected = vec![0x00, 0x00, 0x01, 0x01];
        expected.extend_from_slice(&[0x00, 0x00, 0x00]); // position + reserved
        expected.push(6);
        expected.extend_from_slice(b"Avalon");
        let desc = b"Beginners\r\n[3/100] players online";
        expected.push(desc.len() as u8);
        expected.extend_from_slice(desc);
        expected.extend_from_slice(&[127, 0, 0, 1]);
        expected.extend_from_slice(&[0x20, 0xA8]); // 8360 big-endian
        expected.extend_from_slice(&[0x03, 0x00]); // occupancy little-endian
        expected.extend_from_slice(&[0x64, 0x00]); // capacity little-endian
        expected.push(0x01);
        assert_eq!(body, expected);
    }

    #[test]
    fn test_position_index_follows_list_order() {
        // Arrange
        let servers: Vec<_> = (0..3)
            .map(|i| ServerAdvertisement::new(format!("s{i}"), "", "1.2.3.4", 1, 1))
            .collect();

        // Act
        let body = build_directory(&servers, 0).unwrap();

        // Assert – every entry has the same size, so positions sit at fixed offsets
        let entry_len = (body.len() - 4) / 3;
        for i in 0..3 {
            assert_eq!(body[4 + i * entry_len], i as u8);
        }
    }

    #[test]
    fn test_disabled_server_encodes_zero_flag() {
        let mut server = avalon();
        server.enabled = false;
        let body = build_directory(&[server], 0).unwrap();
        assert_eq!(*body.last().unwrap(), 0x00);
    }

    #[test]
    fn test_occupancy_is_stamped_into_every_entry() {
        // Arrange
        let bahamut = ServerAdvertisement::new("Bahamut", "Veterans", "10.0.0.2", 8361, 50);
        let servers = [avalon(), bahamut];

        // Act
        let body = build_directory(&servers, 7).unwrap();
        let text = String::from_utf8_lossy(&body);

        // Assert
        assert!(text.contains("[7/100] players online"));
        assert!(text.contains("[7/50] players online"));
    }

    #[test]
    fn test_too_many_entries_is_rejected() {
        let servers = vec![avalon(); 256];
        let result = build_directory(&servers, 0);
        assert_eq!(result, Err(ProtocolError::DirectoryTooLarge(256)));
    }

    #[test]
    fn test_overlong_name_is_rejected() {
        let mut server = avalon();
        server.name = "n".repeat(300);
        let expected = ProtocolError::FieldTooLong {
            field: "server name",
            len: 300,
        };
        assert_eq!(build_directory(&[server], 0), Err(expected));
    }

    #[test]
    fn test_compose_description_format() {
        assert_eq!(
            compose_description("Beginners", 12, 300),
            "Beginners\r\n[12/300] players online"
        );
    }

    #[test]
    fn test_compose_description_truncates_but_keeps_suffix() {
        // Arrange
        let long = "d".repeat(400);

        // Act
        let composed = compose_description(&long, 65_535, 65_535);

        // Assert
        assert_eq!(composed.len(), MAX_SHORT_STRING);
        assert!(composed.ends_with("\r\n[65535/65535] players online"));
    }

    #[test]
    fn test_compose_description_truncates_on_char_boundary() {
        // 'é' is two bytes; an odd budget would split it in half
        let long = "é".repeat(200);
        let composed = compose_description(&long, 1, 1);
        assert!(composed.len() <= MAX_SHORT_STRING);
        assert!(composed.ends_with("[1/1] players online"));
    }

    #[test]
    fn test_overlong_description_still_encodes() {
        let mut server = avalon();
        server.description = "x".repeat(1000);
        let body = build_directory(&[server], 0).unwrap();
        // nameLen at offset 7, descLen right after the 6-byte name
        assert_eq!(body[7 + 1 + 6], 255);
    }

    #[test]
    fn test_parse_ipv4_octets_strict() {
        assert_eq!(parse_ipv4_octets("192.168.0.10"), Some([192, 168, 0, 10]));
        assert_eq!(parse_ipv4_octets("192.168.0"), None);
        assert_eq!(parse_ipv4_octets("192.168.0.1.5"), None);
        assert_eq!(parse_ipv4_octets("192.abc.0.1"), None);
        assert_eq!(parse_ipv4_octets("256.0.0.1"), None);
    }

    #[test]
    fn test_lenient_octets_replace_bad_parts_with_zero() {
        assert_eq!(ipv4_octets_lenient("10.x.0.7"), [10, 0, 0, 7]);
        assert_eq!(ipv4_octets_lenient("10.1"), [10, 1, 0, 0]);
        assert_eq!(ipv4_octets_lenient("1.2.3.4.5"), [1, 2, 3, 4]);
        assert_eq!(ipv4_octets_lenient(""), [0, 0, 0, 0]);
    }

    #[test]
    fn test_malformed_address_only_affects_its_octets() {
        let mut server = avalon();
        server.address = "127.0.oops.1".to_string();
        let body = build_directory(&[server], 0).unwrap();
        let desc_len = body[7 + 1 + 6] as usize;
        let ip_offset = 7 + 1 + 6 + 1 + desc_len;
        assert_eq!(&body[ip_offset..ip_offset + 4], &[127, 0, 0, 1]);
    }
}
