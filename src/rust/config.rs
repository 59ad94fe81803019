use std::path::PathBuf;
use std::time::Duration;

use crate::classifier::DEFAULT_MAX_MESSAGE_CHARS;

/// Sliding-window limit applied per client on the prediction endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Requests allowed per window. Zero disables limiting.
    pub max_requests: usize,
    pub period: Duration,
    /// Key clients on the first `X-Forwarded-For` hop instead of the peer
    /// address. Only safe behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 15,
            period: Duration::from_secs(60),
            trust_forwarded_for: false,
        }
    }
}

impl RateLimitConfig {
    pub fn disabled() -> Self {
        Self {
            max_requests: 0,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_requests > 0
    }
}

/// Settings for the HTTP prediction service
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub artifacts_dir: PathBuf,
    pub max_message_chars: usize,
    pub rate_limit: RateLimitConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            artifacts_dir: PathBuf::from("."),
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
