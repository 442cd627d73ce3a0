//! Standard open sequence for `SQLCipher`-encrypted databases.
//!
//! # Encryption flow
//!
//! The encryption is transparent to SQL -- once a database is opened and
//! keyed, every page read from disk is decrypted and every page written is
//! encrypted by the `SQLCipher` pager codec.
//!
//! The flow when opening a database is:
//!
//! 1. **Open** -- the file is opened (or created). At this point it is opaque
//!    and no data can be read.
//!
//! 2. **License** -- commercial and enterprise `SQLCipher` packages need
//!    `PRAGMA cipher_license` before any cryptographic operation, otherwise
//!    they fail with `SQLITE_AUTH`. Skipped when no code is configured.
//!
//! 3. **Cipher logging** -- optionally routes `SQLCipher`'s own log to a
//!    target so keying problems can be diagnosed.
//!
//! 4. **Key** -- a passphrase (run through the KDF) or 32 bytes of raw key
//!    material is handed to `SQLCipher`.
//!
//! 5. **Verify** -- we immediately read from `sqlite_master` to confirm the
//!    key is correct. If it is wrong, `SQLCipher` returns `SQLITE_NOTADB`
//!    because the decrypted page header won't match the `SQLite` magic bytes.
//!
//! 6. **Configure** -- WAL journal mode, `synchronous=FULL`, foreign keys and
//!    secure deletion. Skipped for read-only connections.

use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use secrecy::ExposeSecret;

use crate::error::{CipherError, CipherResult};
use crate::ext::SqlCipherExt;
use crate::key::KeyMaterial;
use crate::log_level::{CipherLogLevel, CipherLogTarget};
use crate::pragma;

/// Options for [`open_encrypted`].
#[derive(Debug, Clone)]
pub struct OpenOptions {
    read_only: bool,
    license_code: Option<String>,
    cipher_log: Option<(CipherLogLevel, CipherLogTarget)>,
    configure: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            license_code: None,
            cipher_log: None,
            configure: true,
        }
    }
}

impl OpenOptions {
    /// Read-write, create if missing, no license, no cipher logging, durable
    /// configuration applied.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens read-only. Read-only connections are never reconfigured.
    #[must_use]
    pub const fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// License code applied before keying.
    #[must_use]
    pub fn license_code(mut self, code: impl Into<String>) -> Self {
        self.license_code = Some(code.into());
        self
    }

    /// Enables `SQLCipher` logging at `level` to `target` before keying.
    #[must_use]
    pub fn cipher_log(mut self, level: CipherLogLevel, target: CipherLogTarget) -> Self {
        self.cipher_log = Some((level, target));
        self
    }

    /// Whether to apply WAL / `synchronous=FULL` / foreign keys / secure
    /// delete after keying. On by default.
    #[must_use]
    pub const fn configure(mut self, configure: bool) -> Self {
        self.configure = configure;
        self
    }
}

/// Opens a database, applies the encryption key, and configures the
/// connection.
///
/// See the [module-level documentation](self) for the full encryption flow.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, the license or key is
/// rejected, or configuration fails.
pub fn open_encrypted(
    path: &Path,
    key: &KeyMaterial,
    options: &OpenOptions,
) -> CipherResult<Connection> {
    let flags = if options.read_only {
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_FULL_MUTEX
    } else {
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX
    };
    let conn = Connection::open_with_flags(path, flags)?;
    require_cipher(&conn)?;

    if let Some(code) = &options.license_code {
        conn.apply_license(code)?;
    }
    if let Some((level, target)) = &options.cipher_log {
        conn.enable_cipher_logging_to(*level, target)?;
    }

    match key {
        KeyMaterial::Passphrase(passphrase) => conn.set_key(passphrase.expose_secret())?,
        KeyMaterial::Bytes(bytes) => conn.set_key_bytes(bytes.expose_secret())?,
        KeyMaterial::Raw(raw) => conn.set_raw_key(raw)?,
    }

    if options.configure && !options.read_only {
        configure_connection(&conn)?;
    }
    log::debug!("opened encrypted database at {}", path.display());
    Ok(conn)
}

/// Fails with [`CipherError::CipherUnavailable`] unless the linked `SQLite`
/// is `SQLCipher`.
///
/// # Errors
///
/// Returns an error if `cipher_version` is unset or cannot be queried.
pub fn require_cipher(conn: &Connection) -> CipherResult<()> {
    match conn.cipher_version()? {
        Some(version) if !version.trim().is_empty() => Ok(()),
        _ => Err(CipherError::CipherUnavailable),
    }
}

/// Configures durable WAL settings, foreign keys, and secure deletion.
///
/// - `journal_mode = WAL` -- enables concurrent readers during writes.
/// - `synchronous = FULL` -- all WAL pages are fsynced before a transaction
///   is reported as committed.
/// - `foreign_keys = ON` -- enforces referential integrity constraints.
/// - `secure_delete = ON` -- overwrites deleted content with zeroes.
fn configure_connection(conn: &Connection) -> CipherResult<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = FULL;
         PRAGMA secure_delete = ON;",
    )?;
    Ok(())
}

/// Runs `PRAGMA integrity_check` and returns whether the database is healthy.
///
/// # Errors
///
/// Returns an error if the pragma cannot be executed.
pub fn integrity_check(conn: &Connection) -> CipherResult<bool> {
    let result = pragma::query_text(conn, "PRAGMA integrity_check;")?;
    Ok(result.is_some_and(|r| r.trim() == "ok"))
}

/// Runs `PRAGMA cipher_integrity_check`, which verifies the HMAC of every
/// page, and returns the problems it reported. Empty means healthy.
///
/// # Errors
///
/// Returns an error if the pragma cannot be executed.
pub fn cipher_integrity_check(conn: &Connection) -> CipherResult<Vec<String>> {
    let problems = pragma::query_all_text(conn, "PRAGMA cipher_integrity_check;")?;
    if !problems.is_empty() {
        log::warn!("cipher integrity check reported {} problem(s)", problems.len());
    }
    Ok(problems)
}
