//! `cipherkit` -- developer CLI for inspecting, verifying and re-keying
//! `SQLCipher` databases through `cipherkit-db`.

mod commands;

use std::path::PathBuf;

use cipherkit_db::{CipherLogLevel, CipherLogTarget};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Inspect, verify and re-key `SQLCipher` databases.
#[derive(Debug, Parser)]
#[command(name = "cipherkit", version, about)]
struct Cli {
    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    key: KeyArgs,

    #[command(subcommand)]
    command: Command,
}

/// How to key the database and configure the engine before keying.
#[derive(Debug, Args)]
struct KeyArgs {
    /// Environment variable holding the passphrase.
    #[arg(long, global = true, default_value = commands::DEFAULT_PASSPHRASE_ENV)]
    passphrase_env: String,

    /// Environment variable holding a 32-byte raw key as hex. Takes
    /// precedence over the passphrase.
    #[arg(long, global = true)]
    raw_key_env: Option<String>,

    /// `SQLCipher` commercial/enterprise license code.
    #[arg(long, global = true, env = "CIPHERKIT_LICENSE", hide_env_values = true)]
    license: Option<String>,

    /// Enable `SQLCipher` logging at this level (NONE..TRACE).
    #[arg(long, global = true)]
    cipher_log: Option<CipherLogLevel>,

    /// Where `SQLCipher` logs go: device, stdout, stderr or a file path.
    #[arg(long, global = true, default_value = "stderr")]
    cipher_log_target: CipherLogTarget,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the cipher status of a keyed database.
    Status {
        /// Database file.
        db: PathBuf,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Key the database and run the integrity and cipher integrity checks.
    Verify {
        /// Database file.
        db: PathBuf,
    },
    /// Re-encrypt the database under a new passphrase.
    Rekey {
        /// Database file.
        db: PathBuf,
        /// Environment variable holding the new passphrase.
        #[arg(long)]
        new_passphrase_env: String,
    },
    /// Print the `SQLCipher` and `SQLite` versions of the linked engine.
    Version,
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let mut stdout = std::io::stdout().lock();
    commands::run(&cli, &|var: &str| std::env::var(var).ok(), &mut stdout)
}
