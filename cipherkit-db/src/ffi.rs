//! `SQLCipher` C API entry points that `rusqlite` does not wrap.
//!
//! `sqlite3_key` and `sqlite3_rekey` are exported by the bundled `SQLCipher`
//! amalgamation (built with `SQLITE_HAS_CODEC`). They take the key as a byte
//! buffer, which is what lets callers key a connection with arbitrary bytes
//! rather than a SQL string literal.
//!
//! This is the **only** file in the crate that contains `unsafe` code.

#![allow(unsafe_code)]

use std::ffi::CStr;
use std::os::raw::{c_int, c_void};

use rusqlite::{ffi, Connection};

use crate::error::{CipherError, CipherResult};

extern "C" {
    fn sqlite3_key(db: *mut ffi::sqlite3, key: *const c_void, n_key: c_int) -> c_int;
    fn sqlite3_rekey(db: *mut ffi::sqlite3, key: *const c_void, n_key: c_int) -> c_int;
}

/// Which of the two keying entry points to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOp {
    /// `sqlite3_key`: key an unkeyed connection.
    Key,
    /// `sqlite3_rekey`: re-encrypt a keyed database under a new key.
    Rekey,
}

impl KeyOp {
    const fn name(self) -> &'static str {
        match self {
            Self::Key => "sqlite3_key",
            Self::Rekey => "sqlite3_rekey",
        }
    }
}

/// Passes `key` to `sqlite3_key` or `sqlite3_rekey` on the main database.
///
/// `key` must be non-empty; callers validate that before getting here.
pub fn apply(conn: &Connection, op: KeyOp, key: &[u8]) -> CipherResult<()> {
    let n_key = c_int::try_from(key.len())
        .map_err(|_| CipherError::invalid_input("key", "longer than i32::MAX bytes"))?;

    // SAFETY: `handle()` is valid for the lifetime of `conn`, which we borrow
    // for the whole call. `key` outlives the call and `n_key` is its exact
    // length; SQLCipher copies the buffer before returning.
    let rc = unsafe {
        let db = conn.handle();
        match op {
            KeyOp::Key => sqlite3_key(db, key.as_ptr().cast(), n_key),
            KeyOp::Rekey => sqlite3_rekey(db, key.as_ptr().cast(), n_key),
        }
    };

    if rc == ffi::SQLITE_OK {
        Ok(())
    } else {
        Err(CipherError::Engine {
            operation: op.name(),
            code: rc,
            message: last_error_message(conn),
        })
    }
}

fn last_error_message(conn: &Connection) -> String {
    // SAFETY: `sqlite3_errmsg` returns a NUL-terminated string owned by the
    // connection that stays valid until the next API call on it; we copy it
    // out immediately.
    unsafe {
        let ptr = ffi::sqlite3_errmsg(conn.handle());
        if ptr.is_null() {
            "unknown error".to_string()
        } else {
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }
}
