//! Diagnostics sinks.
//!
//! Foreground runs log to stderr. Daemonized runs log to the system log via
//! RFC 3164 datagrams on `/dev/log`; the socket is connected here, at init
//! time, so logging keeps working after the descriptor lockdown forbids
//! opening anything new.

use std::io;
use std::os::unix::net::UnixDatagram;

use log::{Level, LevelFilter, Log, Metadata, Record};

const SYSLOG_PATH: &str = "/dev/log";

/// daemon facility from syslog(3).
const LOG_DAEMON: u8 = 3 << 3;

struct SysLogger {
    socket: UnixDatagram,
}

impl SysLogger {
    fn connect() -> io::Result<Self> {
        let socket = UnixDatagram::unbound()?;
        socket.connect(SYSLOG_PATH)?;
        Ok(Self { socket })
    }
}

impl Log for SysLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let severity = match record.level() {
            Level::Error => 3,
            Level::Warn => 4,
            Level::Info => 6,
            Level::Debug | Level::Trace => 7,
        };
        let line = format!(
            "<{}>entropyd[{}]: {}",
            LOG_DAEMON | severity,
            std::process::id(),
            record.args()
        );
        // A lost datagram is not worth crashing a running feed over.
        let _ = self.socket.send(line.as_bytes());
    }

    fn flush(&self) {}
}

/// Install the global logger for this run mode.
pub fn init(daemonize: bool) {
    if daemonize {
        match SysLogger::connect() {
            Ok(logger) => {
                if log::set_boxed_logger(Box::new(logger)).is_ok() {
                    log::set_max_level(LevelFilter::Info);
                }
                return;
            }
            Err(err) => {
                eprintln!("entropyd: unable to reach {SYSLOG_PATH}: {err}");
                // Fall through to stderr so diagnostics go somewhere.
            }
        }
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
