//! Cryptographic helpers.
//!
//! Only static-key block decryption lives here: login credential blobs are
//! AES-encrypted with a key baked into the game client, so no key exchange is
//! involved.

pub mod static_key;

pub use static_key::{
    decrypt_block, static_decrypt, string_decode, CryptoError, KeySlot, StaticKeys,
};
