//! # Logging Tests
//!
//! `init_logging` installs a process-wide subscriber, so this file holds a
//! single test.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use everest_core::utils::{LoggingOptions, init_logging};

#[test]
fn file_layer_creates_directory_and_drops_muted_targets() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("logs").join("k2");
    let path = dir.join("everest.log");
    assert!(!dir.exists());

    let options = LoggingOptions {
        file: Some(path.clone()),
        quiet: true,
        ..LoggingOptions::default()
    };
    init_logging(&options).unwrap();
    assert!(dir.is_dir());

    tracing::info!(target: "everest_core::pld", "De-trending K2 target 205071984");
    // WARN passes the default directives; only the muted-target filter drops it
    tracing::warn!(target: "png::decoder", "iCCP: known incorrect sRGB profile");

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("Logging initialized"));
    assert!(text.contains("De-trending K2 target 205071984"));
    assert!(!text.contains("iCCP"));
    assert!(!text.contains("\x1b["), "file output must not carry ANSI colors");

    // A second subscriber cannot be installed
    assert!(init_logging(&options).is_err());
}
