//! Tracing setup for the binary. Library crates only emit events; this is
//! the one place a subscriber is installed (spec's Ambient Stack §Logging).

use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Mirrors the teacher's `TURBO_LOG_VERBOSITY` convention: `-v` flags raise
/// the default level, but an explicit `TASKGRAPH_LOG_VERBOSITY` directive
/// still wins for any target it names.
pub fn init(verbosity: u8) {
    let default_level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var("TASKGRAPH_LOG_VERBOSITY")
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
