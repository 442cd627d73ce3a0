//! Subcommand implementations.

use std::io::Write;
use std::path::Path;

use cipherkit_db::{
    cipher_integrity_check, integrity_check, open_encrypted, CipherStatus, KeyMaterial,
    OpenOptions, RawKey, SqlCipherExt,
};
use eyre::{bail, eyre, WrapErr};
use rusqlite::Connection;
use secrecy::{ExposeSecret, SecretString};

use crate::{Cli, Command, KeyArgs};

/// Passphrase variable used when `--passphrase-env` is not given.
pub const DEFAULT_PASSPHRASE_ENV: &str = "CIPHERKIT_PASSPHRASE";

/// Runs the parsed command. `lookup` resolves environment variables.
pub fn run(
    cli: &Cli,
    lookup: &dyn Fn(&str) -> Option<String>,
    out: &mut dyn Write,
) -> eyre::Result<()> {
    match &cli.command {
        Command::Status { db, json } => {
            let conn = open(db, &cli.key, lookup, true)?;
            let status = conn.cipher_status()?;
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&status)?)?;
            } else {
                write_status(out, &status)?;
            }
        }
        Command::Verify { db } => {
            let conn = open(db, &cli.key, lookup, true)?;
            if !integrity_check(&conn)? {
                bail!("integrity_check failed for {}", db.display());
            }
            let problems = cipher_integrity_check(&conn)?;
            if !problems.is_empty() {
                for problem in &problems {
                    writeln!(out, "{problem}")?;
                }
                bail!(
                    "cipher_integrity_check reported {} problem(s) for {}",
                    problems.len(),
                    db.display()
                );
            }
            writeln!(out, "ok")?;
        }
        Command::Rekey {
            db,
            new_passphrase_env,
        } => {
            let new_passphrase = read_secret(lookup, new_passphrase_env)?;
            let conn = open(db, &cli.key, lookup, false)?;
            conn.rekey(new_passphrase.expose_secret())
                .wrap_err_with(|| format!("failed to re-key {}", db.display()))?;
            tracing::info!(db = %db.display(), "re-keyed database");
            writeln!(out, "re-keyed {}", db.display())?;
        }
        Command::Version => {
            let conn = Connection::open_in_memory()?;
            if let Some(level) = cli.key.cipher_log {
                conn.enable_cipher_logging_to(level, &cli.key.cipher_log_target)?;
            }
            let cipher_version = conn
                .cipher_version()?
                .ok_or_else(|| eyre!("linked SQLite has no SQLCipher"))?;
            writeln!(out, "sqlcipher {cipher_version}")?;
            writeln!(out, "sqlite {}", rusqlite::version())?;
        }
    }
    Ok(())
}

fn open(
    db: &Path,
    args: &KeyArgs,
    lookup: &dyn Fn(&str) -> Option<String>,
    read_only: bool,
) -> eyre::Result<Connection> {
    if !db.exists() {
        bail!("database {} does not exist", db.display());
    }
    let key = key_material(args, lookup)?;
    let mut options = OpenOptions::new().read_only(read_only).configure(false);
    if let Some(code) = &args.license {
        options = options.license_code(code.clone());
    }
    if let Some(level) = args.cipher_log {
        options = options.cipher_log(level, args.cipher_log_target.clone());
    }
    tracing::debug!(db = %db.display(), read_only, "opening encrypted database");
    open_encrypted(db, &key, &options)
        .wrap_err_with(|| format!("failed to open {}", db.display()))
}

/// Picks the raw key when `--raw-key-env` is given, else the passphrase.
fn key_material(
    args: &KeyArgs,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> eyre::Result<KeyMaterial> {
    if let Some(var) = &args.raw_key_env {
        let hex_key = read_secret(lookup, var)?;
        let raw = RawKey::from_hex(hex_key.expose_secret())
            .wrap_err_with(|| format!("{var} does not hold a 32-byte hex key"))?;
        return Ok(KeyMaterial::Raw(raw));
    }
    Ok(KeyMaterial::Passphrase(read_secret(
        lookup,
        &args.passphrase_env,
    )?))
}

fn read_secret(
    lookup: &dyn Fn(&str) -> Option<String>,
    var: &str,
) -> eyre::Result<SecretString> {
    match lookup(var) {
        Some(value) if !value.is_empty() => Ok(SecretString::from(value)),
        _ => Err(eyre!("environment variable {var} is not set")),
    }
}

fn write_status(out: &mut dyn Write, status: &CipherStatus) -> std::io::Result<()> {
    let unset = "(unset)";
    writeln!(
        out,
        "cipher_version:          {}",
        status.cipher_version.as_deref().unwrap_or(unset)
    )?;
    writeln!(
        out,
        "cipher_fips_status:      {}",
        status.fips_status.as_deref().unwrap_or(unset)
    )?;
    writeln!(
        out,
        "cipher_provider:         {}",
        status.provider.as_deref().unwrap_or(unset)
    )?;
    writeln!(
        out,
        "cipher_provider_version: {}",
        status.provider_version.as_deref().unwrap_or(unset)
    )
}
