//! The entropy transfer engine.
//!
//! Steady-state behavior of the daemon: read one chunk from the TRNG under
//! an exclusive advisory lock, push it into the kernel pool in
//! acceptance-sized writes, erase the buffer, sleep, repeat. A shutdown
//! request is observed once per iteration, at the top; an iteration either
//! completes its read, writes, and erasure, or the whole process exits.
//!
//! There is deliberately no retry on I/O failure. A malfunctioning entropy
//! source must not silently degrade to weaker randomness, and a silently
//! failing pool write must not pass unnoticed, so both directions are fatal.

use std::fs::File;
use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use zeroize::{Zeroize, Zeroizing};

use crate::config::Config;
use crate::error::Error;
use crate::flock::ExclusiveLock;

/// Largest read that goes to the pool in a single write call.
const WHOLE_WRITE_MAX: usize = 16;

/// Width of the write window used for larger reads.
const WINDOW: usize = 8;

/// The feed engine. Owns both device handles for its lifetime; the caller
/// releases them (or leaves them to process-exit cleanup) after [`run`]
/// returns.
///
/// [`run`]: FeedLoop::run
pub struct FeedLoop<S: Write> {
    source: File,
    sink: S,
    buf: Zeroizing<Vec<u8>>,
    interval: Duration,
}

impl<S: Write> FeedLoop<S> {
    /// Build the loop from already-opened, already-restricted handles.
    ///
    /// The transfer buffer is allocated here, once, from the validated
    /// configuration — it is reused (and re-zeroed) across iterations.
    pub fn new(source: File, sink: S, config: &Config) -> Self {
        Self {
            source,
            sink,
            buf: Zeroizing::new(vec![0u8; config.read_bytes]),
            interval: Duration::from_secs(config.interval),
        }
    }

    /// Run until `shutdown` is observed set at an iteration boundary.
    ///
    /// Returns `Ok(())` on a requested shutdown; any I/O failure terminates
    /// the loop immediately with the error.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<(), Error> {
        loop {
            if shutdown.load(Ordering::SeqCst) {
                return Ok(());
            }
            self.transfer_once()?;
            thread::sleep(self.interval);
        }
    }

    /// One READING → WRITING → ERASING pass.
    ///
    /// The buffer is erased on every exit path, success or error; `zeroize`
    /// guarantees the clear is not elided.
    fn transfer_once(&mut self) -> Result<(), Error> {
        let result = self
            .read_chunk()
            .and_then(|()| Self::drain(&mut self.sink, &self.buf));
        self.buf.zeroize();
        result
    }

    /// Fill the buffer with exactly one chunk from the source.
    ///
    /// The exclusive lock spans only the read and is released on every exit
    /// path. It serializes device access against other processes, not
    /// against anything in this one.
    fn read_chunk(&mut self) -> Result<(), Error> {
        let _lock = ExclusiveLock::acquire(self.source.as_raw_fd()).map_err(|source| Error::Io {
            op: "lock entropy source",
            source,
        })?;
        self.source
            .read_exact(&mut self.buf)
            .map_err(|source| Error::Io {
                op: "read from entropy source",
                source,
            })
    }

    /// Push one buffer's worth of entropy into the sink.
    ///
    /// Reads of up to 16 bytes go out in a single write. Larger reads go
    /// out through an 8-byte window written `ceil((n-8)/8)` times. Quirk:
    /// the window refills from the *start* of the buffer on every pass, so
    /// the leading 8 bytes are repeated rather than the buffer being split
    /// into disjoint sub-chunks. Deployed consumers see exactly this write
    /// pattern and it is preserved as-is; anyone expecting a partition of
    /// the read should audit this function before reusing the engine.
    fn drain(sink: &mut S, buf: &[u8]) -> Result<(), Error> {
        let n = buf.len();
        if n <= WHOLE_WRITE_MAX {
            return Self::push(sink, buf);
        }

        let mut window = Zeroizing::new([0u8; WINDOW]);
        let mut offset = 0;
        while offset < n - WINDOW {
            window.copy_from_slice(&buf[..WINDOW]);
            Self::push(sink, window.as_slice())?;
            offset += WINDOW;
        }
        Ok(())
    }

    fn push(sink: &mut S, bytes: &[u8]) -> Result<(), Error> {
        sink.write_all(bytes).map_err(|source| Error::Io {
            op: "write to random pool",
            source,
        })
    }
}
