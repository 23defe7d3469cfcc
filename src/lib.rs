pub mod config;
pub mod pipeline; // Mask → Extract → Coerce → Normalize+Validate → Bundle
pub mod samples;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` wins over the default
/// filter. Logs go to stderr so stdout stays machine-readable.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();

    tracing::debug!("{} v{} tracing initialised", config::APP_NAME, config::APP_VERSION);
}
