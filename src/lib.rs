pub mod api; // Upload client: multipart, headers, error normalization
pub mod config;
pub mod db;
pub mod format;
pub mod models;
pub mod permissions; // Camera / gallery permission gate
pub mod pipeline; // Capture, normalize, capture-screen flow
pub mod preferences; // Best-effort local key-value store
pub mod query; // Keyed result cache and mutations

#[cfg(test)]
mod test_support;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// build-dependent default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
