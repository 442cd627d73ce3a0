//! The `SQLCipher` capability extension for [`rusqlite::Connection`].

use rusqlite::Connection;
use serde::Serialize;

use crate::error::{CipherError, CipherResult};
use crate::ffi::{self, KeyOp};
use crate::key::RawKey;
use crate::log_level::{CipherLogLevel, CipherLogTarget};
use crate::pragma;

/// Statement used to touch the first page after keying.
const VERIFY_KEY_SQL: &str = "SELECT count(*) FROM sqlite_master;";

/// Point-in-time view of a connection's cipher state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CipherStatus {
    /// `SQLCipher` version, e.g. `4.6.1 community`.
    pub cipher_version: Option<String>,
    /// `"1"` in FIPS mode, `"0"` otherwise; unset until keyed.
    pub fips_status: Option<String>,
    /// Active crypto provider name; unset until keyed.
    pub provider: Option<String>,
    /// Crypto provider version; unset until keyed.
    pub provider_version: Option<String>,
}

impl CipherStatus {
    /// `true` once a crypto provider is attached, i.e. the connection is keyed.
    #[must_use]
    pub const fn is_keyed(&self) -> bool {
        self.provider.is_some()
    }
}

/// `SQLCipher` controls available on an open connection.
///
/// Every method forwards synchronously to the engine's control pragmas or
/// keying API and returns its outcome; nothing is cached or retried. A failed
/// keying call leaves the connection in an unknown state: reopen it rather
/// than keying again.
pub trait SqlCipherExt {
    /// `SQLCipher` version (`PRAGMA cipher_version`).
    ///
    /// `None` when the linked `SQLite` has no `SQLCipher`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pragma cannot be executed.
    fn cipher_version(&self) -> CipherResult<Option<String>>;

    /// FIPS status (`PRAGMA cipher_fips_status`): `"1"` for FIPS mode,
    /// `"0"` otherwise.
    ///
    /// Not initialized until the connection has been keyed; `None` before.
    ///
    /// # Errors
    ///
    /// Returns an error if the pragma cannot be executed.
    fn cipher_fips_status(&self) -> CipherResult<Option<String>>;

    /// Name of the active crypto provider (`PRAGMA cipher_provider`).
    ///
    /// `None` until the connection has been keyed.
    ///
    /// # Errors
    ///
    /// Returns an error if the pragma cannot be executed.
    fn cipher_provider(&self) -> CipherResult<Option<String>>;

    /// Version reported by the crypto provider
    /// (`PRAGMA cipher_provider_version`).
    ///
    /// `None` until the connection has been keyed.
    ///
    /// # Errors
    ///
    /// Returns an error if the pragma cannot be executed.
    fn cipher_provider_version(&self) -> CipherResult<Option<String>>;

    /// Parsed [`cipher_fips_status`](Self::cipher_fips_status).
    ///
    /// # Errors
    ///
    /// Returns an error if the pragma cannot be executed.
    fn is_fips_enabled(&self) -> CipherResult<Option<bool>> {
        Ok(self
            .cipher_fips_status()?
            .map(|status| status.trim() == "1"))
    }

    /// All four accessors in one snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the pragmas cannot be executed.
    fn cipher_status(&self) -> CipherResult<CipherStatus> {
        Ok(CipherStatus {
            cipher_version: self.cipher_version()?,
            fips_status: self.cipher_fips_status()?,
            provider: self.cipher_provider()?,
            provider_version: self.cipher_provider_version()?,
        })
    }

    /// Keys an unkeyed connection with a text passphrase.
    ///
    /// The passphrase is its UTF-8 bytes, so this is the same key as
    /// [`set_key_bytes`](Self::set_key_bytes) with `key.as_bytes()`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::KeyRejected`] if the database cannot be read
    /// with this key, or [`CipherError::InvalidInput`] for an empty key.
    fn set_key(&self, key: &str) -> CipherResult<()> {
        self.set_key_bytes(key.as_bytes())
    }

    /// Keys an unkeyed connection with a passphrase given as bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::KeyRejected`] if the database cannot be read
    /// with this key, or [`CipherError::InvalidInput`] for an empty key.
    fn set_key_bytes(&self, key: &[u8]) -> CipherResult<()>;

    /// Keys an unkeyed connection with 32 bytes of raw key material,
    /// bypassing key derivation.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::KeyRejected`] if the database cannot be read
    /// with this key.
    fn set_raw_key(&self, key: &RawKey) -> CipherResult<()>;

    /// Re-encrypts an already-keyed database under a new text passphrase.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::NotKeyed`] on an unkeyed connection, or the
    /// engine's error if re-encryption fails.
    fn rekey(&self, key: &str) -> CipherResult<()> {
        self.rekey_bytes(key.as_bytes())
    }

    /// Re-encrypts an already-keyed database under a new byte passphrase.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::NotKeyed`] on an unkeyed connection, or the
    /// engine's error if re-encryption fails.
    fn rekey_bytes(&self, key: &[u8]) -> CipherResult<()>;

    /// Activates a commercial or enterprise `SQLCipher` package
    /// (`PRAGMA cipher_license`).
    ///
    /// Call this before any cryptographic operation. Without a valid code
    /// those operations fail in the engine with `SQLITE_AUTH (23)`; see
    /// [`CipherError::is_auth_failure`]. Community builds ignore the pragma.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::LicenseRejected`] if the engine reports a
    /// non-zero status.
    fn apply_license(&self, license_code: &str) -> CipherResult<()>;

    /// Routes `SQLCipher`'s internal log to the host OS log facility at
    /// `level`.
    ///
    /// The logger is process-global: this affects every connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the target or level.
    fn enable_cipher_logging(&self, level: CipherLogLevel) -> CipherResult<()> {
        self.enable_cipher_logging_to(level, &CipherLogTarget::Device)
    }

    /// Routes `SQLCipher`'s internal log to `target` at `level`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::LogTargetRejected`] if the engine cannot use
    /// `target` (e.g. the file cannot be opened).
    fn enable_cipher_logging_to(
        &self,
        level: CipherLogLevel,
        target: &CipherLogTarget,
    ) -> CipherResult<()>;

    /// Switches `SQLCipher`'s internal logging off.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the change.
    fn disable_cipher_logging(&self) -> CipherResult<()>;
}

impl SqlCipherExt for Connection {
    fn cipher_version(&self) -> CipherResult<Option<String>> {
        pragma::query_text(self, "PRAGMA cipher_version;")
    }

    fn cipher_fips_status(&self) -> CipherResult<Option<String>> {
        pragma::query_text(self, "PRAGMA cipher_fips_status;")
    }

    fn cipher_provider(&self) -> CipherResult<Option<String>> {
        pragma::query_text(self, "PRAGMA cipher_provider;")
    }

    fn cipher_provider_version(&self) -> CipherResult<Option<String>> {
        pragma::query_text(self, "PRAGMA cipher_provider_version;")
    }

    fn set_key_bytes(&self, key: &[u8]) -> CipherResult<()> {
        require_key(key)?;
        ffi::apply(self, KeyOp::Key, key)?;
        verify_key(self)?;
        log::debug!("applied cipher key");
        Ok(())
    }

    fn set_raw_key(&self, key: &RawKey) -> CipherResult<()> {
        // The statement is zeroized on drop; it never reaches the logs.
        let pragma = key.key_pragma();
        self.execute_batch(&pragma)?;
        verify_key(self)?;
        log::debug!("applied raw cipher key");
        Ok(())
    }

    fn rekey_bytes(&self, key: &[u8]) -> CipherResult<()> {
        require_key(key)?;
        // sqlite3_rekey is a silent no-op without an attached codec.
        if self.cipher_provider()?.is_none() {
            return Err(CipherError::NotKeyed);
        }
        ffi::apply(self, KeyOp::Rekey, key)?;
        log::info!("database re-encrypted under a new key");
        Ok(())
    }

    fn apply_license(&self, license_code: &str) -> CipherResult<()> {
        pragma::require_non_empty("license code", license_code)?;
        let sql = format!(
            "PRAGMA cipher_license = {};",
            pragma::quote_literal(license_code.trim())
        );
        if let Some(status) = pragma::query_status(self, &sql)? {
            log::warn!("cipher license rejected with status {status}");
            return Err(CipherError::LicenseRejected { status });
        }
        log::debug!("cipher license applied");
        Ok(())
    }

    fn enable_cipher_logging_to(
        &self,
        level: CipherLogLevel,
        target: &CipherLogTarget,
    ) -> CipherResult<()> {
        let target_value = target.as_pragma_value();
        pragma::require_non_empty("cipher log target", &target_value)?;
        set_log_target(self, &target_value)?;
        set_log_level(self, level)?;
        log::debug!("cipher logging enabled at {level} to {target}");
        Ok(())
    }

    fn disable_cipher_logging(&self) -> CipherResult<()> {
        set_log_level(self, CipherLogLevel::None)?;
        set_log_target(self, "off")?;
        log::debug!("cipher logging disabled");
        Ok(())
    }
}

fn require_key(key: &[u8]) -> CipherResult<()> {
    if key.is_empty() {
        return Err(CipherError::invalid_input("key", "must not be empty"));
    }
    Ok(())
}

/// Touches a page so a wrong key fails here rather than on the first query.
fn verify_key(conn: &Connection) -> CipherResult<()> {
    conn.query_row(VERIFY_KEY_SQL, [], |row| row.get::<_, i64>(0))
        .map(|_| ())
        .map_err(|err| {
            log::warn!("cipher key verification failed: {err}");
            CipherError::KeyRejected(err)
        })
}

fn set_log_target(conn: &Connection, target: &str) -> CipherResult<()> {
    let sql = format!("PRAGMA cipher_log = {};", pragma::quote_literal(target));
    match pragma::query_status(conn, &sql)? {
        Some(status) => Err(CipherError::LogTargetRejected {
            target: target.to_string(),
            status,
        }),
        None => Ok(()),
    }
}

fn set_log_level(conn: &Connection, level: CipherLogLevel) -> CipherResult<()> {
    let sql = format!("PRAGMA cipher_log_level = {};", level.as_pragma_value());
    // The engine echoes the level it settled on; nothing to check.
    pragma::query_text(conn, &sql)?;
    Ok(())
}
