//! entropyd — feed a hardware TRNG into the kernel entropy pool.
//!
//! Startup ordering is strict: validate configuration, take the pid-file
//! lock, optionally detach, install the termination handler, narrow the
//! device handles and lock the process down, then run the feed loop until
//! SIGTERM. Every failure class logs one line and exits with its own code.

mod logger;

use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{error, info, warn};

use entropyd_core::config::DEFAULT_CONFIG_PATH;
use entropyd_core::error::EXIT_USAGE;
use entropyd_core::pidfile::DEFAULT_PID_PATH;
use entropyd_core::{Config, Error, FeedLoop, PidFile, Restriction, rights, shutdown};

#[derive(Parser)]
#[command(name = "entropyd")]
#[command(about = "entropyd — feed a hardware TRNG into the kernel entropy pool")]
#[command(version = entropyd_core::VERSION)]
struct Cli {
    /// Detach and run in the background (default is foreground)
    #[arg(short = 'd', long)]
    daemonize: bool,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Pid file path
    #[arg(short = 'p', long, value_name = "FILE", default_value = DEFAULT_PID_PATH)]
    pidfile: PathBuf,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Usage errors and -h both leave through the usage exit code.
            let _ = err.print();
            process::exit(EXIT_USAGE);
        }
    };

    logger::init(cli.daemonize);

    if let Err(err) = run(&cli) {
        error!("{err}");
        process::exit(err.exit_code());
    }
    process::exit(0);
}

fn run(cli: &Cli) -> Result<(), Error> {
    let config = Config::load(&cli.config)?;
    if config.interval == 0 {
        warn!("INTERVAL=0: the feed will poll the devices in a tight loop");
    }

    let mut pidfile = PidFile::acquire(&cli.pidfile)?;

    if cli.daemonize {
        if let Err(errno) = nix::unistd::daemon(false, false) {
            // Nothing is running yet, so the record can still be cleaned up.
            let _ = pidfile.remove();
            return Err(Error::Capability {
                what: "daemonize",
                source: io::Error::from_raw_os_error(errno as i32),
            });
        }
    }

    shutdown::install()?;
    pidfile.write_pid()?;

    let source = rights::acquire_source(&config.device)?;
    let sink = rights::acquire_sink()?;
    if rights::enter_lockdown()? == Restriction::Unsupported {
        info!("descriptor lockdown is not available on this platform");
    }
    info!("entropy feed started for device {}", config.device.display());

    FeedLoop::new(source, sink, &config).run(shutdown::flag())?;

    if shutdown::requested() {
        info!("terminated by signal, exiting");
    }
    pidfile.remove()?;
    Ok(())
}
