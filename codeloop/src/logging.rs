//! Diagnostic tracing for the codeloop CLI.
//!
//! Command results go to stdout as JSON; everything emitted here goes to
//! stderr and is not part of the product output.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the level is `warn`, raised to `info`
/// by one `-v` and to `debug` by two or more.
///
/// # Example
/// ```bash
/// RUST_LOG=codeloop=debug codeloop run "Add health check endpoint" --repo .
/// ```
pub fn init(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
