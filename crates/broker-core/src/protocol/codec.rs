//! Binary codec for the broker frame header.
//!
//! Wire format:
//! ```text
//! [length:2][sequence:2][command:2][body:N]
//! ```
//! Header size: 6 bytes. `length` counts header + body. All three header
//! integers are little-endian; sub-formats inside the body may embed
//! big-endian fields (see [`crate::protocol::directory`]), which is why the
//! two integer writers below are kept separate.

use thiserror::Error;

use crate::protocol::commands::Command;
use crate::protocol::sequence::SequenceBase;

/// Size of the frame header in bytes.
pub const HEADER_SIZE: usize = 6;

/// Largest body that still fits the 16-bit length field.
pub const MAX_BODY_SIZE: usize = u16::MAX as usize - HEADER_SIZE;

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the minimum required length.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The body does not fit the 16-bit length field.
    #[error("frame body of {body_len} bytes exceeds the {MAX_BODY_SIZE}-byte limit")]
    OversizedFrame { body_len: usize },

    /// More advertisements than the one-byte count can describe.
    #[error("directory holds {0} entries, at most 255 can be encoded")]
    DirectoryTooLarge(usize),

    /// A length-prefixed field is longer than its one-byte prefix allows.
    #[error("{field} is {len} bytes, at most 255 can be encoded")]
    FieldTooLong { field: &'static str, len: usize },
}

/// The decoded part of a frame header.
///
/// Bytes 2..4 carry the sender's sequence value; the broker never checks it,
/// so it is not part of the decoded header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Total frame length as declared by the sender (header + body).
    pub length: u16,
    /// Raw command code.
    pub command: u16,
}

impl FrameHeader {
    /// Resolves the raw code into a known [`Command`], returning the raw value
    /// when it is not recognised.
    pub fn known_command(&self) -> Result<Command, u16> {
        Command::try_from(self.command)
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes the header at the beginning of `bytes`.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] when fewer than
/// [`HEADER_SIZE`] bytes are available.
///
/// # Examples
///
/// ```rust
/// use broker_core::protocol::{decode_header, encode_frame, Command, SequenceBase};
///
/// let frame = encode_frame(SequenceBase::FreshLogin, Command::AuthAck.code(), &[0, 0]).unwrap();
/// let header = decode_header(&frame).unwrap();
/// assert_eq!(header.length, 8);
/// assert_eq!(header.command, 0x1312);
/// ```
pub fn decode_header(bytes: &[u8]) -> Result<FrameHeader, ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let length = read_u16_le(bytes, 0);
    // bytes[2..4] is the sequence field – not consumed on decode
    let command = read_u16_le(bytes, 4);

    Ok(FrameHeader { length, command })
}

/// Encodes one frame: header followed by `body`.
///
/// The sequence value is derived from `base` and the length of this frame
/// (see [`SequenceBase::sequence_for`]).
///
/// # Errors
///
/// Returns [`ProtocolError::OversizedFrame`] if the body is longer than
/// [`MAX_BODY_SIZE`].
pub fn encode_frame(
    base: SequenceBase,
    command: u16,
    body: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    let body_len = body.len();
    if body_len > MAX_BODY_SIZE {
        return Err(ProtocolError::OversizedFrame { body_len });
    }

    let frame_length = body.len() + HEADER_SIZE;
    let sequence = base.sequence_for(frame_length);

    let mut buf = Vec::with_capacity(frame_length);
    write_u16_le(&mut buf, frame_length as u16);
    write_u16_le(&mut buf, sequence);
    write_u16_le(&mut buf, command);
    buf.extend_from_slice(body);
    Ok(buf)
}

// ── Integer primitives ────────────────────────────────────────────────────────

/// Appends `value` in little-endian byte order.
pub fn write_u16_le(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Appends `value` in big-endian (network) byte order.
pub fn write_u16_be(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn read_u16_le(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::sequence::{scramble, LOGIN_SEQUENCE};

    #[test]
    fn test_decode_header_rejects_short_input() {
        for len in 0..HEADER_SIZE {
            let bytes = vec![0xAA; len];
            assert_eq!(
                decode_header(&bytes),
                Err(ProtocolError::InsufficientData {
                    needed: HEADER_SIZE,
                    available: len,
                })
            );
        }
    }

    #[test]
    fn test_decode_header_reads_little_endian_length_and_command() {
        // Arrange: length 0x000A, sequence 0xFFFF (ignored), command 0x1100
        let bytes = [0x0A, 0x00, 0xFF, 0xFF, 0x00, 0x11];

        // Act
        let header = decode_header(&bytes).unwrap();

        // Assert
        let expected = FrameHeader {
            length: 10,
            command: 0x1100,
        };
        assert_eq!(header, expected);
    }

    #[test]
    fn test_decode_header_ignores_sequence_bytes() {
        let a = decode_header(&[0x06, 0x00, 0x00, 0x00, 0x13, 0x10]).unwrap();
        let b = decode_header(&[0x06, 0x00, 0x12, 0x34, 0x13, 0x10]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decode_header_ignores_trailing_body() {
        let header = decode_header(&[0x08, 0x00, 0x00, 0x00, 0x13, 0x10, 0xAB, 0xCD]).unwrap();
        assert_eq!(header.command, 0x1013);
        assert_eq!(header.known_command(), Ok(Command::AuthRequest));
    }

    #[test]
    fn test_encode_login_ack_exact_bytes() {
        // Act
        let command = Command::AuthAck.code();
        let frame = encode_frame(SequenceBase::FreshLogin, command, &[0x00, 0x00]).unwrap();

        // Assert
        assert_eq!(frame, vec![0x08, 0x00, 0xEB, 0xCB, 0x12, 0x13, 0x00, 0x00]);
    }

    #[test]
    fn test_encode_uses_cumulative_length_for_sequence() {
        // Arrange
        let body = [1u8, 2, 3, 4];

        // Act
        let frame = encode_frame(SequenceBase::Cumulative(40), 0x1102, &body).unwrap();

        // Assert
        let sequence = u16::from_le_bytes([frame[2], frame[3]]);
        assert_eq!(sequence, scramble(40 + 10));
        assert_eq!(&frame[6..], &body);
    }

    #[test]
    fn test_encode_empty_body_is_header_only() {
        let frame = encode_frame(SequenceBase::Cumulative(0), 0x1234, &[]).unwrap();
        assert_eq!(frame, vec![0x06, 0x00, 0xF1, 0x43, 0x34, 0x12]);
    }

    #[test]
    fn test_encode_fresh_login_sequence_independent_of_body() {
        for size in [0usize, 1, 2, 100, 1000] {
            let frame = encode_frame(SequenceBase::FreshLogin, 0x1312, &vec![0; size]).unwrap();
            assert_eq!(u16::from_le_bytes([frame[2], frame[3]]), LOGIN_SEQUENCE);
        }
    }

    #[test]
    fn test_encode_max_body_is_accepted() {
        let body = vec![0u8; MAX_BODY_SIZE];
        let frame = encode_frame(SequenceBase::Cumulative(0), 0x1102, &body).unwrap();
        assert_eq!(frame.len(), u16::MAX as usize);
        assert_eq!(decode_header(&frame).unwrap().length, u16::MAX);
    }

    #[test]
    fn test_encode_oversized_body_is_rejected() {
        let body_len = MAX_BODY_SIZE + 1;
        let body = vec![0u8; body_len];
        assert_eq!(
            encode_frame(SequenceBase::Cumulative(0), 0x1102, &body),
            Err(ProtocolError::OversizedFrame { body_len })
        );
    }

    #[test]
    fn test_write_primitives_differ_in_byte_order() {
        let mut le = Vec::new();
        let mut be = Vec::new();
        write_u16_le(&mut le, 0x20A8);
        write_u16_be(&mut be, 0x20A8);
        assert_eq!(le, vec![0xA8, 0x20]);
        assert_eq!(be, vec![0x20, 0xA8]);
    }
}
