use std::time::Duration;

/// Delay between two status polls for the same task.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Per-request timeout for all backend calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings, injected by the frontend. The core never reads the
/// environment; whoever owns the process resolves the base URL and passes
/// it in here.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}
