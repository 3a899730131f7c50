// Client configuration
//
// Defaults target a local backend. Every field can be overridden from the
// environment (TOOLWATCH_*); every endpoint path is joined onto the single
// configured base URL.

/// Configuration for the backend connection and poll cadence
#[derive(Clone, Debug)]
pub struct BackendConfig {
    /// Base URL of the tool-tracking backend, e.g. http://localhost:5001
    pub base_url: String,
    /// Poll tick interval in milliseconds
    pub poll_interval_ms: u64,
    /// Timeout for the finite HTTP calls in milliseconds
    pub request_timeout_ms: u64,
    /// Maximum number of log lines retained from a poll
    pub max_log_lines: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5001".to_string(),
            poll_interval_ms: 2_000,
            request_timeout_ms: 10_000,
            max_log_lines: 500,
        }
    }
}

impl BackendConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("TOOLWATCH_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.base_url),
            poll_interval_ms: std::env::var("TOOLWATCH_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.poll_interval_ms),
            request_timeout_ms: std::env::var("TOOLWATCH_REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_timeout_ms),
            max_log_lines: std::env::var("TOOLWATCH_MAX_LOG_LINES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_log_lines),
        }
    }

    /// Join an endpoint path onto the configured base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
