use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter for a given number of `-v` flags. Other crates stay at warn.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "project_sync=info,warn",
        1 => "project_sync=debug,warn",
        _ => "project_sync=trace,warn",
    }
}

/// Install the global subscriber writing to stderr. `RUST_LOG` overrides the
/// level chosen from the `-v` count, e.g. `RUST_LOG=project_sync=trace`.
/// Fails if a subscriber is already installed.
pub fn init(verbosity: u8) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity > 0),
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize tracing: {e}"))
}
