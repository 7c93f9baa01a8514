//! Cooperative shutdown via SIGTERM.
//!
//! The handler body is exactly one atomic store — no I/O, no allocation —
//! so it is safe in any asynchronous context. The feed loop polls the flag
//! once at the top of each iteration; cancellation granularity is therefore
//! a whole iteration, never mid-read or mid-write.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

use crate::error::Error;
use crate::flock::errno_to_io;

static TERMINATE: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_term(_signo: libc::c_int) {
    TERMINATE.store(true, Ordering::SeqCst);
}

/// Install the SIGTERM handler.
///
/// `SA_RESTART` keeps a delivery during a blocking device read from
/// surfacing as a spurious `EINTR`; the request is observed at the next
/// iteration boundary instead.
pub fn install() -> Result<(), Error> {
    let action = SigAction::new(
        SigHandler::Handler(handle_term),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe { sigaction(Signal::SIGTERM, &action) }
        .map_err(|errno| Error::Capability {
            what: "install SIGTERM handler",
            source: errno_to_io(errno),
        })?;
    Ok(())
}

/// The process-wide shutdown flag, for handing to [`crate::FeedLoop::run`].
pub fn flag() -> &'static AtomicBool {
    &TERMINATE
}

/// Whether shutdown has been requested.
pub fn requested() -> bool {
    TERMINATE.load(Ordering::SeqCst)
}
