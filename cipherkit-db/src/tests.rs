//! Contract tests against the bundled `SQLCipher` engine.

use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tempfile::TempDir;

use super::*;

fn temp_db() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("cipher-test.sqlite");
    (dir, path)
}

/// Creates an encrypted database at `path` holding one secret row.
fn create_keyed_db(path: &Path, key: &str) {
    let conn = Connection::open(path).expect("open db");
    conn.set_key(key).expect("set key");
    conn.execute_batch(
        "CREATE TABLE secret (id INTEGER PRIMARY KEY, val TEXT);
         INSERT INTO secret (id, val) VALUES (1, 'top-secret');",
    )
    .expect("write secret");
}

fn read_secret(conn: &Connection) -> rusqlite::Result<String> {
    conn.query_row("SELECT val FROM secret WHERE id = 1", [], |row| row.get(0))
}

#[test]
fn test_cipher_version_available_without_key() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    let version = conn.cipher_version().expect("cipher_version");
    assert!(version.is_some_and(|v| !v.trim().is_empty()));
    require_cipher(&conn).expect("sqlcipher linked");
}

#[test]
fn test_keyed_accessors_unset_before_key() {
    let (_dir, path) = temp_db();
    let conn = Connection::open(&path).expect("open db");
    assert_eq!(conn.cipher_fips_status().expect("fips status"), None);
    assert_eq!(conn.cipher_provider().expect("provider"), None);
    assert_eq!(conn.cipher_provider_version().expect("provider version"), None);
    assert_eq!(conn.is_fips_enabled().expect("fips"), None);
    assert!(!conn.cipher_status().expect("status").is_keyed());
}

#[test]
fn test_keyed_accessors_set_after_key() {
    let (_dir, path) = temp_db();
    let conn = Connection::open(&path).expect("open db");
    conn.set_key("correct horse battery staple").expect("set key");

    let fips = conn.cipher_fips_status().expect("fips status");
    assert!(fips.is_some_and(|s| !s.is_empty()));
    let provider_version = conn.cipher_provider_version().expect("provider version");
    assert!(provider_version.is_some_and(|v| !v.is_empty()));
    assert!(conn.cipher_provider().expect("provider").is_some());
    assert_eq!(conn.is_fips_enabled().expect("fips"), Some(false));

    let status = conn.cipher_status().expect("status");
    assert!(status.is_keyed());
    let json = serde_json::to_value(&status).expect("serialize status");
    assert!(json["cipher_version"].is_string());
    assert!(json["provider"].is_string());
}

#[test]
fn test_encrypted_round_trip() {
    let (_dir, path) = temp_db();
    create_keyed_db(&path, "hunter2");

    let conn = Connection::open(&path).expect("reopen db");
    conn.set_key("hunter2").expect("set key");
    assert_eq!(read_secret(&conn).expect("read"), "top-secret");
}

#[test]
fn test_wrong_key_rejected_and_connection_unusable() {
    let (_dir, path) = temp_db();
    create_keyed_db(&path, "hunter2");

    let conn = Connection::open(&path).expect("reopen db");
    let err = conn.set_key("hunter3").expect_err("wrong key");
    assert!(matches!(err, CipherError::KeyRejected(_)), "unexpected error: {err}");
    assert!(err.is_not_a_database(), "unexpected code: {:?}", err.sqlite_code());
    assert!(read_secret(&conn).is_err());
}

#[test]
fn test_unkeyed_open_of_encrypted_db_fails() {
    let (_dir, path) = temp_db();
    create_keyed_db(&path, "hunter2");

    let conn = Connection::open(&path).expect("reopen db");
    assert!(read_secret(&conn).is_err());
}

#[test]
fn test_text_and_byte_passphrases_are_the_same_key() {
    let (_dir, path) = temp_db();
    create_keyed_db(&path, "päss");

    let conn = Connection::open(&path).expect("reopen db");
    conn.set_key_bytes("päss".as_bytes()).expect("set key bytes");
    assert_eq!(read_secret(&conn).expect("read"), "top-secret");
}

#[test]
fn test_non_utf8_byte_passphrase() {
    let (_dir, path) = temp_db();
    let key = [0xFF_u8, 0x00, 0xFE, 0x10];
    {
        let conn = Connection::open(&path).expect("open db");
        conn.set_key_bytes(&key).expect("set key bytes");
        conn.execute_batch("CREATE TABLE t (id INTEGER);")
            .expect("create table");
    }
    let conn = Connection::open(&path).expect("reopen db");
    conn.set_key_bytes(&key).expect("set key bytes");
    let other = Connection::open(&path).expect("reopen db");
    assert!(other.set_key_bytes(&key[..3]).is_err());
}

#[test]
fn test_empty_key_rejected() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    for result in [conn.set_key(""), conn.set_key_bytes(&[]), conn.rekey("")] {
        match result {
            Err(CipherError::InvalidInput { parameter, .. }) => assert_eq!(parameter, "key"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

#[test]
fn test_rekey_round_trip() {
    let (_dir, path) = temp_db();
    create_keyed_db(&path, "old-key");
    {
        let conn = Connection::open(&path).expect("reopen db");
        conn.set_key("old-key").expect("set key");
        conn.rekey("new-key").expect("rekey");
        assert_eq!(read_secret(&conn).expect("read after rekey"), "top-secret");
    }

    let conn = Connection::open(&path).expect("reopen db");
    conn.set_key("new-key").expect("new key works");
    assert_eq!(read_secret(&conn).expect("read"), "top-secret");

    let stale = Connection::open(&path).expect("reopen db");
    assert!(stale.set_key("old-key").is_err(), "old key must stop working");
}

#[test]
fn test_rekey_bytes_round_trip() {
    let (_dir, path) = temp_db();
    create_keyed_db(&path, "old-key");
    {
        let conn = Connection::open(&path).expect("reopen db");
        conn.set_key("old-key").expect("set key");
        conn.rekey_bytes(&[1, 2, 3, 4]).expect("rekey bytes");
    }
    let conn = Connection::open(&path).expect("reopen db");
    conn.set_key_bytes(&[1, 2, 3, 4]).expect("new key works");
    assert_eq!(read_secret(&conn).expect("read"), "top-secret");
}

#[test]
fn test_rekey_requires_keyed_connection() {
    let (_dir, path) = temp_db();
    let conn = Connection::open(&path).expect("open db");
    match conn.rekey("new-key") {
        Err(CipherError::NotKeyed) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_raw_key_round_trip() {
    let (_dir, path) = temp_db();
    let key = RawKey::new([0xAB; 32]);
    {
        let conn = Connection::open(&path).expect("open db");
        conn.set_raw_key(&key).expect("set raw key");
        conn.execute_batch("CREATE TABLE secret (id INTEGER PRIMARY KEY, val TEXT);")
            .expect("create table");
        conn.execute("INSERT INTO secret (id, val) VALUES (1, 'top-secret')", [])
            .expect("insert");
    }
    {
        let conn = Connection::open(&path).expect("reopen db");
        conn.set_raw_key(&key).expect("set raw key");
        assert_eq!(read_secret(&conn).expect("read"), "top-secret");
    }
    let conn = Connection::open(&path).expect("reopen db");
    let err = conn
        .set_raw_key(&RawKey::new([0xCD; 32]))
        .expect_err("wrong raw key");
    assert!(matches!(err, CipherError::KeyRejected(_)), "unexpected error: {err}");
}

#[test]
fn test_open_encrypted_configures_connection() {
    let (_dir, path) = temp_db();
    let key = KeyMaterial::passphrase("hunter2");
    let conn = open_encrypted(&path, &key, &OpenOptions::new()).expect("open encrypted");
    let mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .expect("journal mode");
    assert_eq!(mode.to_lowercase(), "wal");
    let fk: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .expect("foreign keys");
    assert_eq!(fk, 1);
    assert!(integrity_check(&conn).expect("integrity check"));
}

#[test]
fn test_open_encrypted_key_forms() {
    let (_dir, path) = temp_db();
    let options = OpenOptions::new().configure(false);
    {
        let conn = open_encrypted(&path, &KeyMaterial::passphrase("abc"), &options)
            .expect("open with passphrase");
        conn.execute_batch("CREATE TABLE t (id INTEGER);")
            .expect("create table");
    }
    open_encrypted(&path, &KeyMaterial::bytes(b"abc".to_vec()), &options)
        .expect("byte passphrase matches text passphrase");

    let err = open_encrypted(&path, &KeyMaterial::passphrase("abd"), &options)
        .expect_err("wrong passphrase");
    assert!(err.is_not_a_database(), "unexpected error: {err}");

    let (_raw_dir, raw_path) = temp_db();
    let raw = KeyMaterial::from(RawKey::new([0x42; 32]));
    open_encrypted(&raw_path, &raw, &options).expect("create with raw key");
    open_encrypted(&raw_path, &raw, &options.clone().read_only(true))
        .expect("reopen read-only with raw key");
}

#[test]
fn test_open_encrypted_read_only_wrong_key_fails() {
    let (_dir, path) = temp_db();
    create_keyed_db(&path, "hunter2");
    let options = OpenOptions::new().read_only(true);
    open_encrypted(&path, &KeyMaterial::passphrase("hunter2"), &options)
        .expect("read-only open");
    assert!(open_encrypted(&path, &KeyMaterial::passphrase("nope"), &options).is_err());
}

#[test]
fn test_integrity_checks_on_healthy_db() {
    let (_dir, path) = temp_db();
    create_keyed_db(&path, "hunter2");
    let conn = Connection::open(&path).expect("reopen db");
    conn.set_key("hunter2").expect("set key");
    assert!(integrity_check(&conn).expect("integrity check"));
    assert!(cipher_integrity_check(&conn)
        .expect("cipher integrity check")
        .is_empty());
}

#[test]
fn test_apply_license_rejects_empty_code() {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    match conn.apply_license("   ") {
        Err(CipherError::InvalidInput { parameter, .. }) => assert_eq!(parameter, "license code"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_apply_license_ignored_by_community_build() {
    let (_dir, path) = temp_db();
    let conn = Connection::open(&path).expect("open db");
    conn.apply_license("AbC=").expect("license accepted");
    conn.set_key("hunter2").expect("keying still works");
    assert!(conn.cipher_provider().expect("provider").is_some());
}

#[test]
fn test_cipher_integrity_check_reports_tampered_page() {
    let (_dir, path) = temp_db();
    {
        let conn = Connection::open(&path).expect("open db");
        conn.set_key("hunter2").expect("set key");
        conn.execute_batch(
            "CREATE TABLE filler (id INTEGER PRIMARY KEY, val BLOB);
             WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 64)
             INSERT INTO filler (val) SELECT randomblob(512) FROM n;",
        )
        .expect("write filler rows");
    }

    let page_size: u64 = 4096;
    let offset = page_size * 2 + 1024;
    {
        let mut file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .expect("open db file");
        assert!(file.metadata().expect("metadata").len() > page_size * 4);
        let mut byte = [0_u8; 1];
        file.seek(SeekFrom::Start(offset)).expect("seek");
        file.read_exact(&mut byte).expect("read byte");
        byte[0] ^= 0xFF;
        file.seek(SeekFrom::Start(offset)).expect("seek");
        file.write_all(&byte).expect("write byte");
    }

    let conn = Connection::open(&path).expect("reopen db");
    conn.set_key("hunter2").expect("page 1 still decrypts");
    let problems = cipher_integrity_check(&conn).expect("cipher integrity check");
    assert!(!problems.is_empty(), "tampered page went unreported");
}
