//! Integration tests for entropyd-core.
//!
//! These exercise the public surface end-to-end with real files standing in
//! for the devices: config load → pid-file guard → rights acquisition →
//! feed loop → pool writes.

use std::io::Write;
use std::sync::atomic::AtomicBool;

use entropyd_core::{Config, Error, FeedLoop, PidFile, rights};

fn write_config(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn config_round_trip_from_disk() {
    let file = write_config("DEVICE=/dev/trng0\nBYTES=64\nINTERVAL=2\n");
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.device.to_str(), Some("/dev/trng0"));
    assert_eq!(config.read_bytes, 64);
    assert_eq!(config.interval, 2);
}

#[test]
fn config_rejections_are_config_errors() {
    for bad in [
        "DEVICE=/dev/trng0\nBYTES=7\nINTERVAL=1\n",
        "DEVICE=/dev/trng0\nBYTES=4097\nINTERVAL=1\n",
        "DEVICE=/dev/trng0\nBYTES=15\nINTERVAL=1\n",
        "DEVICE=/dev/trng0\nBYTES=64\nINTERVAL=-1\n",
        "DEVICE=/dev/trng0\nBYTES=64\nINTERVAL=11\n",
    ] {
        let file = write_config(bad);
        let err = Config::load(file.path()).unwrap_err();
        let wrapped: Error = err.into();
        assert_eq!(wrapped.exit_code(), 78, "accepted: {bad:?}");
    }
}

#[test]
fn second_instance_stops_at_the_pid_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entropyd.pid");

    let mut first = PidFile::acquire(&path).unwrap();
    first.write_pid().unwrap();

    // Startup order puts the pid-file guard before any device open, so a
    // contending instance is turned away before it performs any device I/O.
    let err = PidFile::acquire(&path).unwrap_err();
    assert!(matches!(err, Error::AlreadyRunning { pid: Some(_) }));

    first.remove().unwrap();
    assert!(!path.exists());
}

#[test]
fn feed_loop_transfers_until_the_source_dies() {
    // 512 bytes of source material, 64-byte chunks: eight full iterations,
    // then EOF surfaces as a fatal I/O error.
    let mut source_file = tempfile::NamedTempFile::new().unwrap();
    let material: Vec<u8> = (0..512u32).map(|i| (i % 255) as u8).collect();
    source_file.write_all(&material).unwrap();
    source_file.flush().unwrap();

    let sink_file = tempfile::NamedTempFile::new().unwrap();
    let sink = sink_file.reopen().unwrap();

    let config = Config::parse("DEVICE=/dev/trng0\nBYTES=64\nINTERVAL=0\n").unwrap();
    let source = rights::acquire_source(source_file.path()).unwrap();

    let shutdown = AtomicBool::new(false);
    let err = FeedLoop::new(source, sink, &config)
        .run(&shutdown)
        .unwrap_err();
    assert!(matches!(err, Error::Io { .. }));

    // Each 64-byte chunk goes out as seven repetitions of its leading
    // 8-byte window: 56 bytes per iteration, 448 bytes total.
    let fed = std::fs::read(sink_file.path()).unwrap();
    assert_eq!(fed.len(), 448);
    for iteration in 0..8 {
        let window = &material[iteration * 64..iteration * 64 + 8];
        let written = &fed[iteration * 56..(iteration + 1) * 56];
        for copy in written.chunks(8) {
            assert_eq!(copy, window, "iteration {iteration}");
        }
    }
}

#[test]
fn requested_shutdown_beats_the_first_read() {
    let mut source_file = tempfile::NamedTempFile::new().unwrap();
    source_file.write_all(&[7u8; 64]).unwrap();
    source_file.flush().unwrap();

    let sink_file = tempfile::NamedTempFile::new().unwrap();
    let sink = sink_file.reopen().unwrap();

    let config = Config::parse("DEVICE=/dev/trng0\nBYTES=8\nINTERVAL=0\n").unwrap();
    let source = rights::acquire_source(source_file.path()).unwrap();

    let shutdown = AtomicBool::new(true);
    FeedLoop::new(source, sink, &config).run(&shutdown).unwrap();

    assert!(std::fs::read(sink_file.path()).unwrap().is_empty());
}

#[test]
fn missing_device_is_a_device_open_error() {
    let err = rights::acquire_source(std::path::Path::new("/nonexistent/trng0")).unwrap_err();
    assert!(matches!(err, Error::DeviceOpen { .. }));
    assert_eq!(err.exit_code(), 69);
}
