//! # entropyd-core
//!
//! **Your TRNG belongs in the kernel pool.**
//!
//! `entropyd-core` is the engine behind `entropyd`, a small daemon that
//! periodically moves raw bytes from a hardware true-random-number-generator
//! character device into the operating system's entropy pool.
//!
//! ## Quick Start
//!
//! ```no_run
//! use entropyd_core::{Config, FeedLoop, rights, shutdown};
//!
//! let config = Config::load("/usr/local/etc/entropyd.conf")?;
//!
//! shutdown::install()?;
//!
//! let source = rights::acquire_source(&config.device)?;
//! let sink = rights::acquire_sink()?;
//! rights::enter_lockdown()?;
//!
//! FeedLoop::new(source, sink, &config).run(shutdown::flag())?;
//! # Ok::<(), entropyd_core::Error>(())
//! ```
//!
//! ## Architecture
//!
//! Config → rights narrowing → lockdown → feed loop → pool
//!
//! The engine deliberately does **no** conditioning, whitening, or health
//! testing of the source: the hardware device is trusted, and a device that
//! stops producing bytes is a fatal error rather than something to paper
//! over with retries. What the engine does guarantee:
//!
//! - descriptors are narrowed to the minimum rights each direction needs,
//!   then the process is locked down before the first untrusted byte is read;
//! - every read happens under a cross-process exclusive advisory lock;
//! - raw entropy never outlives one loop iteration — buffers are erased with
//!   a non-elidable clear on every exit path.

pub mod config;
pub mod error;
pub mod feed;
pub mod pidfile;
pub mod rights;
pub mod shutdown;

mod flock;

pub use config::{Config, ConfigError};
pub use error::Error;
pub use feed::FeedLoop;
pub use pidfile::PidFile;
pub use rights::Restriction;

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
