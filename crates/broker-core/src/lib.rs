//! # broker-core
//!
//! Shared library for the discovery broker containing the frame codec, the
//! server directory serializer, domain entities, and the static-key block
//! decryption helper.
//!
//! This crate has zero dependencies on network sockets or async runtimes; the
//! `broker-server` crate wires it to TCP.
//!
//! # Architecture overview
//!
//! A game client first connects to the broker, acknowledges a login step, and
//! then asks for the list of world servers it may join.  The broker answers
//! with a binary directory that carries each server's address and live
//! occupancy.
//!
//! - **`protocol`** – How bytes travel over the wire.  Every frame carries a
//!   6-byte header (`length`, `sequence`, `command`) followed by an opaque body.
//!
//! - **`domain`** – The advertised world servers and the shared live-session
//!   count that is stamped into every directory response.
//!
//! - **`crypto`** – AES-ECB decryption with a fixed key, used to read login
//!   credential blobs.

pub mod crypto;
pub mod domain;
pub mod protocol;

pub use crypto::static_key::{
    decrypt_block, static_decrypt, string_decode, CryptoError, KeySlot, StaticKeys,
};
pub use domain::advertisement::{Directory, DirectoryError, ServerAdvertisement};
pub use domain::sessions::LiveSessionCount;
pub use protocol::codec::{decode_header, encode_frame, FrameHeader, ProtocolError};
pub use protocol::commands::Command;
pub use protocol::directory::build_directory;
pub use protocol::sequence::{scramble, SequenceBase};
