//! Protocol module containing the frame codec, command codes, sequence
//! scrambling, and the directory serializer.

pub mod codec;
pub mod commands;
pub mod directory;
pub mod sequence;

pub use codec::{decode_header, encode_frame, FrameHeader, ProtocolError, HEADER_SIZE};
pub use commands::Command;
pub use directory::build_directory;
pub use sequence::{scramble, SequenceBase, LOGIN_SEQUENCE};
