//! Helpers for `SQLCipher`'s pragma control surface.
//!
//! Cipher pragmas are evaluated while the statement is prepared and report
//! their result (if any) as a single text row. A pragma the engine does not
//! recognise, or one that has nothing to report yet, yields no row at all.

use rusqlite::types::ValueRef;
use rusqlite::Connection;

use crate::error::{CipherError, CipherResult};

/// Runs `sql` and returns the first column of its first row as text.
///
/// `Ok(None)` means the engine produced no row, or a NULL.
pub fn query_text(conn: &Connection, sql: &str) -> CipherResult<Option<String>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let value = match rows.next()? {
        Some(row) => value_to_text(row.get_ref(0)?),
        None => None,
    };
    Ok(value)
}

/// Runs `sql` and returns the first column of every row as text.
pub fn query_all_text(conn: &Connection, sql: &str) -> CipherResult<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        if let Some(text) = value_to_text(row.get_ref(0)?) {
            out.push(text);
        }
    }
    Ok(out)
}

/// Reads a status-reporting pragma (`cipher_license`, `cipher_log`).
///
/// Returns the status if the engine reported a non-zero numeric one. A
/// missing row is treated as success: builds without the pragma ignore it.
pub fn query_status(conn: &Connection, sql: &str) -> CipherResult<Option<String>> {
    Ok(query_text(conn, sql)?
        .map(|status| status.trim().to_string())
        .filter(|status| status.parse::<i64>().is_ok_and(|code| code != 0)))
}

fn value_to_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Quotes `value` as an SQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Rejects values the pragma grammar cannot carry.
pub fn require_non_empty(parameter: &'static str, value: &str) -> CipherResult<()> {
    if value.trim().is_empty() {
        return Err(CipherError::invalid_input(parameter, "must not be empty"));
    }
    if value.contains('\0') {
        return Err(CipherError::invalid_input(parameter, "contains a NUL byte"));
    }
    Ok(())
}
