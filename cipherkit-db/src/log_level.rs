//! Verbosity levels and destinations for `SQLCipher`'s internal logger.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::CipherError;

/// Granularity of `SQLCipher`'s internal logging.
///
/// Each level is strictly more verbose than the previous one; the derived
/// ordering follows that, so `CipherLogLevel::Trace > CipherLogLevel::Error`.
/// `Debug` and `Trace` produce a significant log volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum CipherLogLevel {
    /// Nothing is logged.
    #[default]
    None,
    /// Error events only.
    Error,
    /// Potentially harmful situations.
    Warn,
    /// Operational information.
    Info,
    /// Debugging detail.
    Debug,
    /// Every internal step, including per-page activity.
    Trace,
}

impl CipherLogLevel {
    /// All levels from least to most verbose.
    pub const ALL: [Self; 6] = [
        Self::None,
        Self::Error,
        Self::Warn,
        Self::Info,
        Self::Debug,
        Self::Trace,
    ];

    /// The value `PRAGMA cipher_log_level` expects for this level.
    #[must_use]
    pub const fn as_pragma_value(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }
}

impl fmt::Display for CipherLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_pragma_value())
    }
}

impl FromStr for CipherLogLevel {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_pragma_value().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                CipherError::invalid_input(
                    "cipher log level",
                    format!("unknown level {s:?}, expected one of NONE, ERROR, WARN, INFO, DEBUG, TRACE"),
                )
            })
    }
}

impl From<log::Level> for CipherLogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

impl From<log::LevelFilter> for CipherLogLevel {
    fn from(filter: log::LevelFilter) -> Self {
        filter.to_level().map_or(Self::None, Self::from)
    }
}

/// Where `SQLCipher` writes its log output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CipherLogTarget {
    /// The host operating system's log facility (`os_log`, logcat).
    #[default]
    Device,
    /// Standard output of the process.
    Stdout,
    /// Standard error of the process.
    Stderr,
    /// A file, opened in append mode.
    File(PathBuf),
}

impl CipherLogTarget {
    /// The value `PRAGMA cipher_log` expects for this target.
    #[must_use]
    pub fn as_pragma_value(&self) -> String {
        match self {
            Self::Device => "device".to_string(),
            Self::Stdout => "stdout".to_string(),
            Self::Stderr => "stderr".to_string(),
            Self::File(path) => path.to_string_lossy().into_owned(),
        }
    }
}

impl fmt::Display for CipherLogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_pragma_value())
    }
}

impl FromStr for CipherLogTarget {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CipherError::invalid_input(
                "cipher log target",
                "must not be empty",
            ));
        }
        Ok(match s.to_ascii_lowercase().as_str() {
            "device" => Self::Device,
            "stdout" => Self::Stdout,
            "stderr" => Self::Stderr,
            _ => Self::File(PathBuf::from(s)),
        })
    }
}
