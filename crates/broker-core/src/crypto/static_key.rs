//! AES-ECB decryption with fixed, hex-configured keys.
//!
//! The game client encrypts short credential blocks with one of two keys
//! compiled into it: one used by the launcher and one used when talking to the
//! broker.  [`KeySlot`] selects between them; the broker slot is the one this
//! service relies on, the launcher slot is optional.
//!
//! ECB mode means every 16-byte block is decrypted independently with the same
//! key.  There is no IV and no padding to strip.

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Hex form of the key the client uses for broker credential blocks.
pub const DEFAULT_BROKER_KEY: &str = "FFB3B3BEAE97AD83B9610E23A43C2EB0";

/// Errors returned by the static-key decryption helpers.
///
/// Only `PartialEq` is derived: [`hex::FromHexError`] does not implement `Eq`.
#[derive(Debug, Error, PartialEq)]
pub enum CryptoError {
    /// The configured key is not valid hexadecimal.
    #[error("static key is not valid hex: {0}")]
    KeyFormat(#[from] hex::FromHexError),

    /// The decoded key has a length AES does not support.
    #[error("cannot initialise AES with a {key_len}-byte key")]
    CipherInit { key_len: usize },

    /// The ciphertext is empty or not a whole number of blocks.
    #[error("ciphertext of {len} bytes is not a non-empty multiple of {BLOCK_SIZE}")]
    BlockLength { len: usize },

    /// No key is configured for the requested slot.
    #[error("no key configured for the {0:?} slot")]
    KeyNotConfigured(KeySlot),

    /// The numeric slot selector is not recognised.
    #[error("unknown key slot: {0}")]
    UnknownKeySlot(u8),
}

/// Which of the client's static keys a block was encrypted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum KeySlot {
    Launcher = 1,
    Broker = 2,
}

impl TryFrom<u8> for KeySlot {
    type Error = CryptoError;

    fn try_from(value: u8) -> Result<Self, CryptoError> {
        match value {
            1 => Ok(KeySlot::Launcher),
            2 => Ok(KeySlot::Broker),
            other => Err(CryptoError::UnknownKeySlot(other)),
        }
    }
}

/// Hex-encoded static keys, as read from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticKeys {
    #[serde(default = "default_broker_key")]
    pub broker_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launcher_key: Option<String>,
}

fn default_broker_key() -> String {
    DEFAULT_BROKER_KEY.to_string()
}

impl Default for StaticKeys {
    fn default() -> Self {
        Self {
            broker_key: default_broker_key(),
            launcher_key: None,
        }
    }
}

impl StaticKeys {
    /// Returns the hex key configured for `slot`.
    pub fn key_hex(&self, slot: KeySlot) -> Option<&str> {
        match slot {
            KeySlot::Broker => Some(self.broker_key.as_str()),
            KeySlot::Launcher => self.launcher_key.as_deref(),
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decrypts `ciphertext` with the key configured for `slot`.
///
/// # Errors
///
/// - [`CryptoError::KeyNotConfigured`] if the slot has no key.
/// - [`CryptoError::KeyFormat`] if the key is not valid hex.
/// - Any error from [`decrypt_block`].
pub fn static_decrypt(
    ciphertext: &[u8],
    slot: KeySlot,
    keys: &StaticKeys,
) -> Result<Vec<u8>, CryptoError> {
    let key_hex = keys
        .key_hex(slot)
        .ok_or(CryptoError::KeyNotConfigured(slot))?;
    let key = hex::decode(key_hex.trim())?;
    decrypt_block(ciphertext, &key)
}

/// AES-ECB decrypts every 16-byte block of `ciphertext` with `key`.
///
/// AES-128, AES-192 and AES-256 are selected by key length.
///
/// # Errors
///
/// - [`CryptoError::CipherInit`] if the key is not 16, 24 or 32 bytes.
/// - [`CryptoError::BlockLength`] if the ciphertext is empty or ragged.
pub fn decrypt_block(ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match key.len() {
        16 => decrypt_with::<Aes128>(ciphertext, key),
        24 => decrypt_with::<Aes192>(ciphertext, key),
        32 => decrypt_with::<Aes256>(ciphertext, key),
        key_len => Err(CryptoError::CipherInit { key_len }),
    }
}

/// Interprets `bytes` as a NUL-terminated string.
///
/// Each byte maps to the code point of the same value, so non-ASCII bytes
/// survive as Latin-1 characters.  Everything from the first zero byte on is
/// ignored.
pub fn string_decode(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| char::from(b))
        .collect()
}

fn decrypt_with<C>(ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    C: BlockDecrypt + KeyInit,
{
    let len = ciphertext.len();
    if len == 0 || len % BLOCK_SIZE != 0 {
        return Err(CryptoError::BlockLength { len });
    }
    let key_len = key.len();
    let cipher = C::new_from_slice(key).map_err(|_| CryptoError::CipherInit { key_len })?;

    let mut plaintext = ciphertext.to_vec();
    for block in plaintext.chunks_exact_mut(BLOCK_SIZE) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }
    Ok(plaintext)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
