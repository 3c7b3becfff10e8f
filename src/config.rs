use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "FitSnap";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Longest edge (px) of an image sent to the classification endpoints.
pub const MAX_IMAGE_DIMENSION: u32 = 1024;

/// JPEG quality (0..=1) used when re-encoding captures before upload.
pub const DEFAULT_JPEG_QUALITY: f32 = 0.8;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_API_TIMEOUT_MS: u64 = 5000;

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,fitsnap_lib=debug,fitsnap=debug"
    } else {
        "warn,fitsnap_lib=info,fitsnap=info"
    }
}

/// Get the application data directory.
/// Falls back to the working directory when no data dir can be resolved.
pub fn app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// SQLite file backing the local preference store.
pub fn preferences_db_path() -> PathBuf {
    app_data_dir().join("preferences.db")
}

/// Directory for normalized captures awaiting upload.
pub fn captures_dir() -> PathBuf {
    app_data_dir().join("captures")
}

/// Connection settings for the FitSnap backend.
///
/// Built from the environment once at startup and handed to
/// [`crate::api::FitnessApiClient::new`]; nothing reads the environment later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Forwarded to the backend for its video-search integration.
    pub youtube_api_key: String,
}

impl ClientConfig {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            youtube_api_key: String::new(),
        }
    }

    pub fn with_youtube_key(mut self, key: impl Into<String>) -> Self {
        self.youtube_api_key = key.into();
        self
    }

    /// Read `API_BASE_URL`, `API_TIMEOUT` (milliseconds) and `YOUTUBE_API_KEY`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let timeout_ms = lookup("API_TIMEOUT")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_API_TIMEOUT_MS);
        let key = lookup("YOUTUBE_API_KEY").unwrap_or_default();

        Self::new(&base_url, Duration::from_millis(timeout_ms)).with_youtube_key(key)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_API_BASE_URL,
            Duration::from_millis(DEFAULT_API_TIMEOUT_MS),
        )
    }
}
