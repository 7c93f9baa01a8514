//! Least-privilege descriptor handling.
//!
//! The daemon only ever needs two descriptors: the TRNG opened read-only and
//! the kernel pool opened write-only. Each handle is narrowed to the minimum
//! operation set for its direction the moment it is opened, and once both
//! are held the process enters an irreversible restricted mode in which no
//! new files, sockets, or devices can be acquired. Everything after that
//! point runs against already-narrowed descriptors.
//!
//! Platform mapping:
//!
//! - FreeBSD: Capsicum. `cap_rights_limit` narrows each handle,
//!   `cap_enter` is the lockdown. `ENOSYS` (kernel built without the
//!   framework) downgrades to [`Restriction::Unsupported`]; any other
//!   failure is fatal.
//! - Linux: there is no per-descriptor rights primitive, so handle
//!   narrowing reports `Unsupported`. Lockdown drops the descriptor table
//!   ceiling to zero (`RLIMIT_NOFILE`), and because the transfer buffer
//!   holds raw entropy it also disables core dumps (`RLIMIT_CORE` plus
//!   `PR_SET_DUMPABLE`).
//! - Anything else: both operations report `Unsupported`.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use crate::error::Error;

/// The kernel's writable entropy-pool device node.
pub const RANDOM_POOL_DEVICE: &str = "/dev/random";

/// Outcome of a narrowing or lockdown attempt.
///
/// `Unsupported` is not a failure: the platform simply has no enforcement
/// primitive, and the daemon keeps running with whatever the open mode
/// already guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restriction {
    /// The restriction is in force.
    Applied,
    /// The platform offers no such primitive.
    Unsupported,
}

#[derive(Clone, Copy)]
enum Direction {
    Read,
    Write,
}

/// Open the TRNG device read-only and narrow the handle to status + read.
pub fn acquire_source(path: &Path) -> Result<File, Error> {
    let file = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|source| Error::DeviceOpen {
            device: path.to_path_buf(),
            source,
        })?;
    limit_handle(&file, Direction::Read)?;
    Ok(file)
}

/// Open the kernel pool write-only and narrow the handle to status + write.
pub fn acquire_sink() -> Result<File, Error> {
    let file = OpenOptions::new()
        .write(true)
        .open(RANDOM_POOL_DEVICE)
        .map_err(|source| Error::DeviceOpen {
            device: RANDOM_POOL_DEVICE.into(),
            source,
        })?;
    limit_handle(&file, Direction::Write)?;
    Ok(file)
}

/// Irreversibly forbid acquiring any new descriptor for the rest of the
/// process lifetime.
///
/// Must be called exactly once, after every descriptor the daemon will ever
/// need is open (devices, pid file, log socket) and before the first read.
pub fn enter_lockdown() -> Result<Restriction, Error> {
    let outcome = lockdown_impl()?;
    log::debug!("process lockdown: {outcome:?}");
    Ok(outcome)
}

fn limit_handle(file: &File, direction: Direction) -> Result<Restriction, Error> {
    let outcome = limit_impl(file, direction).map_err(|source| Error::Capability {
        what: "limit rights on device handle",
        source,
    })?;
    log::debug!(
        "{} handle rights narrowing: {outcome:?}",
        match direction {
            Direction::Read => "source",
            Direction::Write => "sink",
        }
    );
    Ok(outcome)
}

#[cfg(target_os = "freebsd")]
mod capsicum {
    use std::io;
    use std::os::unix::io::RawFd;

    use libc::c_int;

    // CAPRIGHT() from sys/capsicum.h: bit 57+index tags which rights word a
    // capability lives in.
    const fn capright(idx: u64, bit: u64) -> u64 {
        (1u64 << (57 + idx)) | bit
    }

    pub const CAP_READ: u64 = capright(0, 0x0000_0000_0000_0001);
    pub const CAP_WRITE: u64 = capright(0, 0x0000_0000_0000_0002);
    pub const CAP_FSTAT: u64 = capright(0, 0x0000_0000_0008_0000);

    #[repr(C)]
    pub struct CapRights {
        cr_rights: [u64; 2],
    }

    unsafe extern "C" {
        fn cap_rights_limit(fd: c_int, rights: *const CapRights) -> c_int;
        fn cap_enter() -> c_int;
    }

    fn rights_set(rights: &[u64]) -> CapRights {
        let mut cr = CapRights {
            cr_rights: [capright(0, 0), capright(1, 0)],
        };
        for &right in rights {
            let word = (((right >> 57) & 0x1f) >> 1) as usize;
            cr.cr_rights[word] |= right;
        }
        cr
    }

    /// `Ok(true)` when the limit is in force, `Ok(false)` on `ENOSYS`.
    pub fn limit(fd: RawFd, rights: &[u64]) -> io::Result<bool> {
        let set = rights_set(rights);
        if unsafe { cap_rights_limit(fd, &set) } == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::ENOSYS) => Ok(false),
            _ => Err(err),
        }
    }

    pub fn enter() -> io::Result<bool> {
        if unsafe { cap_enter() } == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::ENOSYS) => Ok(false),
            _ => Err(err),
        }
    }
}

#[cfg(target_os = "freebsd")]
fn limit_impl(file: &File, direction: Direction) -> io::Result<Restriction> {
    use std::os::unix::io::AsRawFd;

    let rights = match direction {
        Direction::Read => [capsicum::CAP_FSTAT, capsicum::CAP_READ],
        Direction::Write => [capsicum::CAP_FSTAT, capsicum::CAP_WRITE],
    };
    let applied = capsicum::limit(file.as_raw_fd(), &rights)?;
    Ok(if applied {
        Restriction::Applied
    } else {
        Restriction::Unsupported
    })
}

#[cfg(target_os = "freebsd")]
fn lockdown_impl() -> Result<Restriction, Error> {
    let entered = capsicum::enter().map_err(|source| Error::Capability {
        what: "enter capability mode",
        source,
    })?;
    Ok(if entered {
        Restriction::Applied
    } else {
        Restriction::Unsupported
    })
}

#[cfg(not(target_os = "freebsd"))]
fn limit_impl(_file: &File, _direction: Direction) -> io::Result<Restriction> {
    Ok(Restriction::Unsupported)
}

#[cfg(target_os = "linux")]
fn lockdown_impl() -> Result<Restriction, Error> {
    use nix::sys::resource::{Resource, setrlimit};

    let cap = |what, errno| Error::Capability {
        what,
        source: crate::flock::errno_to_io(errno),
    };

    // No new descriptors of any kind from here on.
    setrlimit(Resource::RLIMIT_NOFILE, 0, 0)
        .map_err(|e| cap("restrict descriptor table", e))?;

    // The transfer buffer holds raw entropy; keep it out of core dumps.
    setrlimit(Resource::RLIMIT_CORE, 0, 0).map_err(|e| cap("disable core dumps", e))?;
    if unsafe { libc::prctl(libc::PR_SET_DUMPABLE, 0 as libc::c_ulong) } != 0 {
        return Err(Error::Capability {
            what: "mark process non-dumpable",
            source: io::Error::last_os_error(),
        });
    }

    Ok(Restriction::Applied)
}

#[cfg(not(any(target_os = "freebsd", target_os = "linux")))]
fn lockdown_impl() -> Result<Restriction, Error> {
    Ok(Restriction::Unsupported)
}
