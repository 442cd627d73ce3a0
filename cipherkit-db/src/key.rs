//! Key material accepted by the keying operations.

use std::fmt;

use secrecy::{SecretSlice, SecretString};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CipherError, CipherResult};

/// Length of a raw `SQLCipher` key in bytes.
pub const RAW_KEY_LEN: usize = 32;

/// 32 bytes of raw key material.
///
/// A raw key bypasses `SQLCipher`'s key derivation: it is handed over as
/// `PRAGMA key = "x'<64 hex chars>'"` and used directly as the page key
/// material. Zeroized on drop; never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RawKey([u8; RAW_KEY_LEN]);

impl RawKey {
    /// Wraps 32 bytes of key material.
    #[must_use]
    pub const fn new(bytes: [u8; RAW_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Copies a raw key out of a slice that must be exactly 32 bytes long.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidInput`] on a length mismatch.
    pub fn from_slice(bytes: &[u8]) -> CipherResult<Self> {
        let array: [u8; RAW_KEY_LEN] = bytes.try_into().map_err(|_| {
            CipherError::invalid_input(
                "raw key",
                format!(
                    "length mismatch: expected {RAW_KEY_LEN}, got {}",
                    bytes.len()
                ),
            )
        })?;
        Ok(Self(array))
    }

    /// Parses a raw key from 64 hex characters.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidInput`] if `hex_key` is not valid hex or
    /// does not decode to 32 bytes.
    pub fn from_hex(hex_key: &str) -> CipherResult<Self> {
        let bytes = Zeroizing::new(
            hex::decode(hex_key.trim())
                .map_err(|e| CipherError::invalid_input("raw key", e.to_string()))?,
        );
        Self::from_slice(&bytes)
    }

    /// Builds the `PRAGMA key` statement for this key. Treat the result as
    /// sensitive; it is zeroized on drop.
    pub(crate) fn key_pragma(&self) -> Zeroizing<String> {
        let key_hex = Zeroizing::new(hex::encode(self.0.as_slice()));
        Zeroizing::new(format!("PRAGMA key = \"x'{}'\";", key_hex.as_str()))
    }
}

impl fmt::Debug for RawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawKey([REDACTED])")
    }
}

/// Any of the key forms a connection can be keyed with.
///
/// Used by [`open_encrypted`](crate::open_encrypted) to pick the matching
/// [`SqlCipherExt`](crate::SqlCipherExt) keying method.
pub enum KeyMaterial {
    /// A text passphrase, run through `SQLCipher`'s KDF.
    Passphrase(SecretString),
    /// A passphrase given as raw bytes, run through the KDF.
    Bytes(SecretSlice<u8>),
    /// 32 bytes of raw key material, no KDF.
    Raw(RawKey),
}

impl KeyMaterial {
    /// Convenience constructor for a text passphrase.
    #[must_use]
    pub fn passphrase(passphrase: impl Into<String>) -> Self {
        Self::Passphrase(SecretString::from(passphrase.into()))
    }

    /// Convenience constructor for a byte passphrase.
    #[must_use]
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(SecretSlice::from(bytes.into()))
    }
}

impl From<RawKey> for KeyMaterial {
    fn from(key: RawKey) -> Self {
        Self::Raw(key)
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Passphrase(_) => "Passphrase",
            Self::Bytes(_) => "Bytes",
            Self::Raw(_) => "Raw",
        };
        write!(f, "KeyMaterial::{kind}([REDACTED])")
    }
}
