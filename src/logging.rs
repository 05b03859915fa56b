//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Initialize logging from the verbosity flags.
///
/// `RUST_LOG` wins over the flags when set. Call once at startup.
pub fn init(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mediascribe={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
