//! Scrambled sequence values for outbound frames.
//!
//! # What is the sequence field?
//!
//! Every frame header carries a 16-bit *sequence* value.  Despite the name it
//! is not a monotonically increasing counter: it is derived from the total
//! number of bytes the session has sent, passed through a fixed
//! multiply-and-offset transform.  Clients expect exactly this value, so the
//! transform must be reproduced bit-for-bit.
//!
//! ```text
//! scramble(x) = ((x * 0x43FD) & 0xFFFF) - 0x53FD   (mod 65536)
//! ```
//!
//! The first frame of a fresh login exchange is special: it always carries
//! [`LOGIN_SEQUENCE`] regardless of its length.
//!
//! # Wrapping arithmetic
//!
//! Only the low 16 bits of the product survive the mask, so the whole
//! computation can be done in `u16` with `wrapping_mul`/`wrapping_sub`.  The
//! subtraction must wrap rather than go negative.

/// Sequence value forced onto the first frame of a fresh login exchange.
pub const LOGIN_SEQUENCE: u16 = 0xCBEB;

const SCRAMBLE_MULTIPLIER: u16 = 0x43FD;
const SCRAMBLE_OFFSET: u16 = 0x53FD;

/// Where the sequence of an outbound frame is derived from.
///
/// # Examples
///
/// ```rust
/// use broker_core::protocol::{SequenceBase, LOGIN_SEQUENCE};
///
/// assert_eq!(SequenceBase::FreshLogin.sequence_for(8), LOGIN_SEQUENCE);
/// assert_eq!(SequenceBase::Cumulative(0).sequence_for(10), 0x53E5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceBase {
    /// First frame of a login handshake; the sequence is [`LOGIN_SEQUENCE`].
    FreshLogin,
    /// Number of bytes already sent in this session before this frame.
    Cumulative(usize),
}

impl SequenceBase {
    /// Returns the sequence value for a frame of `frame_length` bytes
    /// (header included) sent after this base.
    pub fn sequence_for(self, frame_length: usize) -> u16 {
        match self {
            SequenceBase::FreshLogin => LOGIN_SEQUENCE,
            SequenceBase::Cumulative(prior) => scramble(prior.wrapping_add(frame_length)),
        }
    }
}

/// Applies the sequence transform to a cumulative byte count.
///
/// Deterministic and pure: the same input always yields the same output.
pub fn scramble(cumulative_length: usize) -> u16 {
    // Truncating to u16 keeps exactly the bits the 0xFFFF mask would keep.
    (cumulative_length as u16)
        .wrapping_mul(SCRAMBLE_MULTIPLIER)
        .wrapping_sub(SCRAMBLE_OFFSET)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Straight transcription of the transform in wide signed arithmetic,
    /// used as an oracle for the u16 implementation.
    fn reference_scramble(x: i64) -> u16 {
        ((((x * 0x43FD) & 0xFFFF) - 0x53FD) & 0xFFFF) as u16
    }

    #[test]
    fn test_scramble_matches_wide_arithmetic_reference() {
        for x in (0..200_000i64).step_by(7) {
            let expected = reference_scramble(x);
            assert_eq!(scramble(x as usize), expected, "mismatch for {x}");
        }
    }

    #[test]
    fn test_scramble_known_values() {
        assert_eq!(scramble(0), 0xAC03);
        assert_eq!(scramble(6), 0x43F1);
        assert_eq!(scramble(10), 0x53E5);
        assert_eq!(scramble(100), 0x3AD7);
    }

    #[test]
    fn test_scramble_is_periodic_in_16_bits() {
        // Only the low 16 bits of the input influence the result.
        assert_eq!(scramble(0x1_0000), scramble(0));
        assert_eq!(scramble(0x1_0000 + 57), scramble(57));
    }

    #[test]
    fn test_scramble_wraps_instead_of_going_negative() {
        // Arrange: 0x43FD * 1 = 0x43FD < 0x53FD, so the subtraction underflows.
        // Act
        let value = scramble(1);

        // Assert
        assert_eq!(value, 0x43FDu16.wrapping_sub(0x53FD));
        assert_eq!(value, 0xF000);
    }

    #[test]
    fn test_fresh_login_ignores_frame_length() {
        for len in [6usize, 8, 10, 255, 65_535] {
            assert_eq!(SequenceBase::FreshLogin.sequence_for(len), LOGIN_SEQUENCE);
        }
    }

    #[test]
    fn test_cumulative_base_adds_frame_length() {
        // Arrange
        let base = SequenceBase::Cumulative(100);

        // Act / Assert
        assert_eq!(base.sequence_for(19), scramble(119));
    }

    #[test]
    fn test_login_sequence_equals_scrambled_first_ack_length() {
        // An 8-byte acknowledgement at offset 0 scrambles to the same constant.
        assert_eq!(scramble(8), LOGIN_SEQUENCE);
    }
}
