//! `SQLCipher` control surface for [`rusqlite::Connection`].
//!
//! `rusqlite` owns the connection; this crate only adds the cipher-specific
//! capabilities on top of it through the [`SqlCipherExt`] extension trait:
//!
//! * **Accessors** -- `cipher_version`, `cipher_fips_status`,
//!   `cipher_provider`, `cipher_provider_version`.
//! * **Keying** -- apply or change a passphrase (text or raw bytes), or apply
//!   32 bytes of raw key material.
//! * **Licensing** -- activate a commercial/enterprise `SQLCipher` build.
//! * **Cipher logging** -- route `SQLCipher`'s internal logger to a target at
//!   a [`CipherLogLevel`], or switch it off.
//!
//! Every call is forwarded synchronously to the `SQLCipher` amalgamation
//! compiled into `rusqlite` (`bundled-sqlcipher-vendored-openssl`). Nothing
//! is cached. The `ffi` module is the **only** file that contains `unsafe`
//! code.
//!
//! ```rust,no_run
//! use cipherkit_db::{CipherLogLevel, SqlCipherExt};
//! use rusqlite::Connection;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let conn = Connection::open("secrets.db")?;
//! conn.set_key("correct horse battery staple")?;
//! assert!(conn.cipher_provider()?.is_some());
//! conn.enable_cipher_logging(CipherLogLevel::Warn)?;
//! # Ok(())
//! # }
//! ```

mod ffi;

pub mod error;
mod ext;
pub mod key;
pub mod log_level;
pub mod open;
mod pragma;

pub use error::{CipherError, CipherResult};
pub use ext::{CipherStatus, SqlCipherExt};
pub use key::{KeyMaterial, RawKey};
pub use log_level::{CipherLogLevel, CipherLogTarget};
pub use open::{
    cipher_integrity_check, integrity_check, open_encrypted, require_cipher, OpenOptions,
};

#[cfg(test)]
mod tests;
