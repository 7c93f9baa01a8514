//! Pid-file singleton guard.
//!
//! One running instance per machine: the pid file is held under an
//! exclusive advisory lock for the whole process lifetime, so a second
//! instance fails at startup before it touches any device. The record
//! itself (decimal pid, newline) is written only after daemonization, when
//! the final pid is known.
//!
//! The file is removed on the graceful-shutdown path only. Fatal exits
//! leave it behind, which is harmless: acquisition is lock-based, not
//! existence-based, so a stale file never wedges the next start.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::flock::ExclusiveLock;

/// Default pid file path.
pub const DEFAULT_PID_PATH: &str = "/var/run/entropyd.pid";

/// An acquired pid-file lock.
#[derive(Debug)]
pub struct PidFile {
    _lock: ExclusiveLock,
    file: File,
    path: PathBuf,
}

impl PidFile {
    /// Open (or create, mode 0600) the pid file and take its lock.
    ///
    /// Contention means another instance is running and yields
    /// [`Error::AlreadyRunning`] carrying the incumbent's recorded pid when
    /// the file is readable.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(0o600)
            .open(&path)
            .map_err(|source| pid_err(&path, source))?;

        let lock = match ExclusiveLock::try_acquire(file.as_raw_fd()) {
            Ok(lock) => lock,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                return Err(Error::AlreadyRunning {
                    pid: read_pid(&mut file),
                });
            }
            Err(source) => return Err(pid_err(&path, source)),
        };

        Ok(Self {
            _lock: lock,
            file,
            path,
        })
    }

    /// Record the current pid (decimal, newline-terminated).
    pub fn write_pid(&mut self) -> Result<(), Error> {
        self.file
            .set_len(0)
            .and_then(|()| self.file.seek(SeekFrom::Start(0)))
            .and_then(|_| writeln!(self.file, "{}", std::process::id()))
            .and_then(|()| self.file.flush())
            .map_err(|source| pid_err(&self.path, source))
    }

    /// Delete the pid file and release the lock.
    ///
    /// Called on the graceful-shutdown path only; dropping without calling
    /// this releases the lock but leaves the file in place.
    pub fn remove(self) -> Result<(), Error> {
        std::fs::remove_file(&self.path).map_err(|source| pid_err(&self.path, source))
    }

    /// Path this guard is holding.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn pid_err(path: &Path, source: io::Error) -> Error {
    Error::PidFile {
        path: path.to_path_buf(),
        source,
    }
}

fn read_pid(file: &mut File) -> Option<u32> {
    let mut text = String::new();
    file.read_to_string(&mut text).ok()?;
    text.trim().parse().ok()
}
