//! Structured logging setup.

use crate::config::Config;

/// Installs a `tracing` fmt subscriber sized to the configured mode.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init(config: &Config) {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(config.mode.max_level())
        .try_init();
}
