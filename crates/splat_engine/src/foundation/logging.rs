//! Logging utilities

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system at `info`, letting `RUST_LOG` override
pub fn init() {
    init_with_level(log::LevelFilter::Info);
}

/// Initialize the logging system with a default level
///
/// Safe to call more than once; later calls are ignored.
pub fn init_with_level(level: log::LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}
