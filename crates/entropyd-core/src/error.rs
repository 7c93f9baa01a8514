//! Daemon-wide error taxonomy.
//!
//! Every failure class maps to its own exit code so an operator can tell
//! "already running" apart from "broken" without reading the log line.
//! None of these are recoverable: the caller logs one diagnostic and
//! terminates with [`Error::exit_code`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Process exit code for a command-line usage error.
pub const EXIT_USAGE: i32 = 64;

/// Fatal daemon errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or out-of-range configuration. Fatal at startup.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Another instance holds the pid-file lock.
    #[error("daemon already running{}", .pid.map(|p| format!(" (pid {p})")).unwrap_or_default())]
    AlreadyRunning {
        /// Pid recorded by the incumbent, when its pid file was readable.
        pid: Option<u32>,
    },

    /// Pid file could not be created or written (not a contention case).
    #[error("pid file {}: {source}", .path.display())]
    PidFile {
        path: PathBuf,
        source: io::Error,
    },

    /// An entropy device could not be opened.
    #[error("unable to open {}: {source}", .device.display())]
    DeviceOpen {
        device: PathBuf,
        source: io::Error,
    },

    /// Rights narrowing or lockdown failed on a platform that supports it.
    #[error("unable to {what}: {source}")]
    Capability {
        what: &'static str,
        source: io::Error,
    },

    /// Read or write failure during the transfer loop. The daemon refuses to
    /// degrade to weaker randomness, so there is no retry path.
    #[error("{op}: {source}")]
    Io {
        op: &'static str,
        source: io::Error,
    },
}

impl Error {
    /// Exit code for this failure class (sysexits-style).
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 78,        // EX_CONFIG
            Error::AlreadyRunning { .. } => 75, // EX_TEMPFAIL
            Error::PidFile { .. } => 73,   // EX_CANTCREAT
            Error::DeviceOpen { .. } => 69, // EX_UNAVAILABLE
            Error::Capability { .. } => 71, // EX_OSERR
            Error::Io { .. } => 74,        // EX_IOERR
        }
    }
}
