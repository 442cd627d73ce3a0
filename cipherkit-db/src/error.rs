//! Error types for `SQLCipher` control operations.

use std::os::raw::c_int;

use rusqlite::ffi;
use thiserror::Error;

/// Result type for `SQLCipher` control operations.
pub type CipherResult<T> = Result<T, CipherError>;

/// Errors raised while forwarding a control operation to `SQLCipher`.
///
/// The layer performs no recovery: an `Err` is the whole answer, and the
/// engine's own detail travels inside it.
#[derive(Debug, Error)]
pub enum CipherError {
    /// Executing a pragma failed inside the engine.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// `sqlite3_key` / `sqlite3_rekey` returned a non-OK result code.
    #[error("{operation} failed with sqlite code {code}: {message}")]
    Engine {
        /// The C API call that failed.
        operation: &'static str,
        /// Primary `SQLite` result code.
        code: c_int,
        /// Message reported by `sqlite3_errmsg`.
        message: String,
    },

    /// The key was accepted but the first page read failed with it.
    #[error("encryption key verification failed (is the key correct?)")]
    KeyRejected(#[source] rusqlite::Error),

    /// A rekey was attempted on a connection that has not been keyed.
    #[error("connection is not keyed")]
    NotKeyed,

    /// `PRAGMA cipher_license` reported a non-zero status.
    #[error("license rejected with status {status}")]
    LicenseRejected {
        /// Status reported by the engine.
        status: String,
    },

    /// `PRAGMA cipher_log` reported a non-zero status.
    #[error("cipher log target {target} rejected with status {status}")]
    LogTargetRejected {
        /// The target that was requested.
        target: String,
        /// Status reported by the engine.
        status: String,
    },

    /// The linked `SQLite` was built without `SQLCipher`.
    #[error("sqlcipher not available")]
    CipherUnavailable,

    /// Input rejected before it reached the engine.
    #[error("invalid {parameter}: {reason}")]
    InvalidInput {
        /// Name of the rejected parameter.
        parameter: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl CipherError {
    pub(crate) fn invalid_input(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            parameter,
            reason: reason.into(),
        }
    }

    /// Returns the primary `SQLite` result code behind this error, if any.
    #[must_use]
    pub fn sqlite_code(&self) -> Option<c_int> {
        match self {
            Self::Sqlite(err) | Self::KeyRejected(err) => {
                err.sqlite_error().map(|e| e.extended_code & 0xff)
            }
            Self::Engine { code, .. } => Some(*code & 0xff),
            _ => None,
        }
    }

    /// `true` when the engine refused the operation with `SQLITE_AUTH`.
    ///
    /// Commercial builds report this when no license, or an expired one,
    /// was applied before a cryptographic operation.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        self.sqlite_code() == Some(ffi::SQLITE_AUTH)
    }

    /// `true` when the engine could not read the file as a database, which
    /// for an encrypted file almost always means the key is wrong.
    #[must_use]
    pub fn is_not_a_database(&self) -> bool {
        self.sqlite_code() == Some(ffi::SQLITE_NOTADB)
    }
}
