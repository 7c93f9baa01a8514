//! Scoped advisory locking.
//!
//! The exclusive lock taken around entropy reads is cross-process mutual
//! exclusion (another instance or a related tool poking the same device),
//! not an intra-process lock. The guard releases on drop, so every exit
//! path — early return, `?`, panic unwind — unlocks.

use std::io;
use std::os::unix::io::RawFd;

use nix::fcntl::{FlockArg, flock};

/// Holds `LOCK_EX` on a descriptor until dropped.
#[derive(Debug)]
pub(crate) struct ExclusiveLock {
    fd: RawFd,
}

impl ExclusiveLock {
    /// Block until the exclusive lock is acquired.
    pub(crate) fn acquire(fd: RawFd) -> io::Result<Self> {
        flock(fd, FlockArg::LockExclusive).map_err(errno_to_io)?;
        Ok(Self { fd })
    }

    /// Acquire without blocking; `WouldBlock` when another process holds it.
    pub(crate) fn try_acquire(fd: RawFd) -> io::Result<Self> {
        flock(fd, FlockArg::LockExclusiveNonblock).map_err(errno_to_io)?;
        Ok(Self { fd })
    }
}

pub(crate) fn errno_to_io(errno: nix::errno::Errno) -> io::Error {
    io::Error::from_raw_os_error(errno as i32)
}

impl Drop for ExclusiveLock {
    fn drop(&mut self) {
        // Nothing useful to do with an unlock failure here; the descriptor
        // close releases the lock anyway.
        let _ = flock(self.fd, FlockArg::Unlock);
    }
}
