//! Provider configuration.

use std::time::Duration;

/// Default controller URL when none is configured.
pub const DEFAULT_HOST: &str = "http://localhost:3080";

/// Environment variable holding the controller URL.
pub const HOST_ENV: &str = "GNS3_HOST";

/// How long and how often to wait for a resource to be listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Listing requests issued before giving up (at least one is always made).
    pub max_attempts: u32,
    /// Delay between two consecutive attempts.
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_secs(1),
        }
    }
}

/// Connection settings shared by every resource operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Controller base URL, e.g. `http://localhost:3080`.
    pub host: String,
    pub poll: PollPolicy,
    /// Per-request timeout handed to the HTTP client. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST)
    }
}

impl ProviderConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            poll: PollPolicy::default(),
            request_timeout: None,
        }
    }

    /// Build from `GNS3_HOST`, falling back to [`DEFAULT_HOST`].
    pub fn from_env() -> Self {
        match std::env::var(HOST_ENV) {
            Ok(host) if !host.trim().is_empty() => Self::new(host),
            _ => Self::default(),
        }
    }

    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Root of the v2 API, without a trailing slash.
    pub fn api_base(&self) -> String {
        format!("{}/v2", self.host.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_poll_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.interval, Duration::from_secs(1));
    }

    #[test]
    fn test_api_base_strips_trailing_slash() {
        assert_eq!(
            ProviderConfig::new("http://10.0.0.5:3080/").api_base(),
            "http://10.0.0.5:3080/v2"
        );
        assert_eq!(
            ProviderConfig::default().api_base(),
            "http://localhost:3080/v2"
        );
    }
}
