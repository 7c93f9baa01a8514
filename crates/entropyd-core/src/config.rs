//! Daemon configuration: three validated scalars from a `KEY=VALUE` file.
//!
//! The file carries `DEVICE=<path>`, `BYTES=<int>`, `INTERVAL=<int>`, one
//! per line. Blank lines and `#` comments are skipped. The file is read
//! under an exclusive flock so a concurrent editor/installer never hands us
//! a half-written view. Validation is strict and happens before anything
//! else at startup: an invalid file means the process never runs.

use std::fs::File;
use std::io::Read;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::flock::ExclusiveLock;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/usr/local/etc/entropyd.conf";

/// Smallest accepted read size in bytes.
pub const BYTES_MIN: i64 = 8;
/// Largest accepted read size in bytes.
pub const BYTES_MAX: i64 = 4096;
/// Largest accepted poll interval in seconds.
pub const INTERVAL_MAX: i64 = 10;
/// Longest accepted device path, in bytes.
pub const DEVICE_PATH_MAX: usize = 1024;

/// Validated, immutable daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// TRNG character device to read from.
    pub device: PathBuf,
    /// Bytes pulled from the device per iteration. In `[8, 4096]`, multiple of 8.
    pub read_bytes: usize,
    /// Seconds to sleep between iterations. In `[0, 10]`.
    pub interval: u64,
}

/// Configuration rejection reasons. Each carries enough context for a
/// single-line operator diagnostic.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("line {line}: expected KEY=VALUE")]
    Malformed { line: usize },

    #[error("{key} is missing")]
    Missing { key: &'static str },

    #[error("{key} value {value:?} is not an integer")]
    NotInteger { key: &'static str, value: String },

    #[error("DEVICE path is empty")]
    DeviceEmpty,

    #[error("DEVICE path is longer than {DEVICE_PATH_MAX} bytes")]
    DeviceTooLong,

    #[error("BYTES value {0} is out of range ({BYTES_MIN}, {BYTES_MAX})")]
    BytesRange(i64),

    #[error("BYTES value {0} is not a multiple of 8")]
    BytesAlignment(i64),

    #[error("INTERVAL value {0} is out of range (0, {INTERVAL_MAX})")]
    IntervalRange(i64),
}

impl Config {
    /// Load and validate a configuration file.
    ///
    /// Holds an exclusive advisory lock on the file for the duration of the
    /// read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let read_err = |source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::open(path).map_err(read_err)?;
        let mut text = String::new();
        {
            let _lock = ExclusiveLock::acquire(file.as_raw_fd()).map_err(read_err)?;
            file.read_to_string(&mut text).map_err(read_err)?;
        }
        Self::parse(&text)
    }

    /// Parse and validate configuration text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut device: Option<&str> = None;
        let mut bytes: Option<&str> = None;
        let mut interval: Option<&str> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or(ConfigError::Malformed { line: idx + 1 })?;
            match key.trim() {
                "DEVICE" => device = Some(value.trim()),
                "BYTES" => bytes = Some(value.trim()),
                "INTERVAL" => interval = Some(value.trim()),
                // Unknown keys are tolerated so config files can grow.
                _ => {}
            }
        }

        let device = device.ok_or(ConfigError::Missing { key: "DEVICE" })?;
        if device.is_empty() {
            return Err(ConfigError::DeviceEmpty);
        }
        if device.len() > DEVICE_PATH_MAX {
            return Err(ConfigError::DeviceTooLong);
        }

        let read_bytes = parse_int("BYTES", bytes)?;
        if !(BYTES_MIN..=BYTES_MAX).contains(&read_bytes) {
            return Err(ConfigError::BytesRange(read_bytes));
        }
        if read_bytes % 8 != 0 {
            return Err(ConfigError::BytesAlignment(read_bytes));
        }

        let interval = parse_int("INTERVAL", interval)?;
        if !(0..=INTERVAL_MAX).contains(&interval) {
            return Err(ConfigError::IntervalRange(interval));
        }

        Ok(Config {
            device: PathBuf::from(device),
            read_bytes: read_bytes as usize,
            interval: interval as u64,
        })
    }
}

fn parse_int(key: &'static str, value: Option<&str>) -> Result<i64, ConfigError> {
    let value = value.ok_or(ConfigError::Missing { key })?;
    value.parse().map_err(|_| ConfigError::NotInteger {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn conf(bytes: &str, interval: &str) -> String {
        format!("DEVICE=/dev/trng0\nBYTES={bytes}\nINTERVAL={interval}\n")
    }

    #[test]
    fn accepts_valid_file() {
        let config = Config::parse(&conf("64", "2")).unwrap();
        assert_eq!(config.device, PathBuf::from("/dev/trng0"));
        assert_eq!(config.read_bytes, 64);
        assert_eq!(config.interval, 2);
    }

    #[test]
    fn bytes_bounds() {
        for ok in ["8", "64", "4096"] {
            assert!(Config::parse(&conf(ok, "1")).is_ok(), "BYTES={ok}");
        }
        assert!(matches!(
            Config::parse(&conf("7", "1")),
            Err(ConfigError::BytesRange(7))
        ));
        assert!(matches!(
            Config::parse(&conf("4097", "1")),
            Err(ConfigError::BytesRange(4097))
        ));
        assert!(matches!(
            Config::parse(&conf("15", "1")),
            Err(ConfigError::BytesAlignment(15))
        ));
    }

    #[test]
    fn interval_bounds() {
        for ok in ["0", "10"] {
            assert!(Config::parse(&conf("8", ok)).is_ok(), "INTERVAL={ok}");
        }
        assert!(matches!(
            Config::parse(&conf("8", "-1")),
            Err(ConfigError::IntervalRange(-1))
        ));
        assert!(matches!(
            Config::parse(&conf("8", "11")),
            Err(ConfigError::IntervalRange(11))
        ));
    }

    #[test]
    fn rejects_garbage_values() {
        assert!(matches!(
            Config::parse(&conf("lots", "1")),
            Err(ConfigError::NotInteger { key: "BYTES", .. })
        ));
        assert!(matches!(
            Config::parse("DEVICE=/dev/trng0\nBYTES 64\nINTERVAL=1\n"),
            Err(ConfigError::Malformed { line: 2 })
        ));
    }

    #[test]
    fn rejects_missing_keys() {
        assert!(matches!(
            Config::parse("BYTES=64\nINTERVAL=1\n"),
            Err(ConfigError::Missing { key: "DEVICE" })
        ));
        assert!(matches!(
            Config::parse("DEVICE=/dev/trng0\nINTERVAL=1\n"),
            Err(ConfigError::Missing { key: "BYTES" })
        ));
    }

    #[test]
    fn rejects_oversized_device_path() {
        let long = "x".repeat(DEVICE_PATH_MAX + 1);
        let text = format!("DEVICE=/dev/{long}\nBYTES=8\nINTERVAL=1\n");
        assert!(matches!(
            Config::parse(&text),
            Err(ConfigError::DeviceTooLong)
        ));
    }

    #[test]
    fn skips_comments_and_unknown_keys() {
        let text = "# entropyd config\n\nDEVICE=/dev/trng0\nBYTES=8\nINTERVAL=0\nCOLOR=green\n";
        assert!(Config::parse(text).is_ok());
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "DEVICE=/dev/trng0\nBYTES=32\nINTERVAL=3\n").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.read_bytes, 32);
        assert_eq!(config.interval, 3);
    }

    #[test]
    fn load_missing_file_is_an_error() {
        assert!(matches!(
            Config::load("/nonexistent/entropyd.conf"),
            Err(ConfigError::Read { .. })
        ));
    }
}
