use std::fmt;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request};
use governor::{DefaultKeyedRateLimiter, Quota};
use log::{debug, warn};

use crate::config::RateLimitConfig;

/// Tracked clients before idle entries are pruned
const PRUNE_THRESHOLD: usize = 10_000;

/// Per-client request budget: `max_requests` in a burst, refilled evenly over `period`
pub struct RateLimiter {
    limiter: Option<DefaultKeyedRateLimiter<String>>,
    trust_forwarded_for: bool,
    prune_threshold: usize,
    prune_interval: Duration,
    last_prune: Mutex<Option<Instant>>,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("enabled", &self.limiter.is_some())
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .finish()
    }
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            limiter: Self::quota(&config).map(governor::RateLimiter::keyed),
            trust_forwarded_for: config.trust_forwarded_for,
            prune_threshold: PRUNE_THRESHOLD,
            prune_interval: config.period,
            last_prune: Mutex::new(None),
        }
    }

    fn quota(config: &RateLimitConfig) -> Option<Quota> {
        if !config.is_enabled() {
            return None;
        }
        let burst = u32::try_from(config.max_requests).ok().and_then(NonZeroU32::new)?;
        let quota = Quota::with_period(config.period / burst.get()).map(|q| q.allow_burst(burst));
        if quota.is_none() {
            warn!("Rate limit period {:?} is too short, limiting disabled", config.period);
        }
        quota
    }

    /// Records a request from `client` and returns whether it is within budget.
    pub fn check(&self, client: &str) -> bool {
        let Some(limiter) = &self.limiter else {
            return true;
        };
        self.prune_if_due(Instant::now());
        limiter.check_key(&client.to_string()).is_ok()
    }

    /// Drops idle clients once the table is large, at most once per window.
    /// Returns whether a prune ran.
    fn prune_if_due(&self, now: Instant) -> bool {
        let Some(limiter) = &self.limiter else {
            return false;
        };
        if limiter.len() < self.prune_threshold {
            return false;
        }
        // Another request is already pruning
        let Ok(mut last_prune) = self.last_prune.try_lock() else {
            return false;
        };
        if last_prune.is_some_and(|last| now.saturating_duration_since(last) < self.prune_interval) {
            return false;
        }
        limiter.retain_recent();
        limiter.shrink_to_fit();
        *last_prune = Some(now);
        debug!("Pruned rate limiter, {} clients tracked", limiter.len());
        true
    }

    /// Identifies the caller by peer address, or by the first `X-Forwarded-For`
    /// hop when forwarded headers are trusted.
    pub fn client_key(&self, request: &Request) -> String {
        if self.trust_forwarded_for {
            if let Some(forwarded) = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
            {
                return forwarded.to_string();
            }
        }
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn limiter(max_requests: usize, period: Duration) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            period,
            ..RateLimitConfig::default()
        })
    }

    fn request_from(peer: &str, forwarded_for: Option<&str>) -> Request {
        let mut builder = Request::builder();
        if let Some(forwarded_for) = forwarded_for {
            builder = builder.header("x-forwarded-for", forwarded_for);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        request
    }

    #[test]
    fn test_budget_is_per_client() {
        let limiter = limiter(2, Duration::from_secs(60));
        assert!(limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.2"));
    }

    #[test]
    fn test_budget_refills() {
        let limiter = limiter(2, Duration::from_millis(100));
        assert!(limiter.check("client"));
        assert!(limiter.check("client"));
        assert!(!limiter.check("client"));

        std::thread::sleep(Duration::from_millis(150));
        assert!(limiter.check("client"));
    }

    #[test]
    fn test_disabled_limiter_allows_everything() {
        let limiter = limiter(0, Duration::from_secs(60));
        assert!((0..100).all(|_| limiter.check("client")));
    }

    #[test]
    fn test_client_key_ignores_forwarded_header_by_default() {
        let limiter = limiter(2, Duration::from_secs(60));
        let request = request_from("192.0.2.1:5555", Some("203.0.113.7"));
        assert_eq!(limiter.client_key(&request), "192.0.2.1");
    }

    #[test]
    fn test_client_key_uses_trusted_forwarded_header() {
        let limiter = RateLimiter::new(RateLimitConfig {
            trust_forwarded_for: true,
            ..RateLimitConfig::default()
        });
        let request = request_from("192.0.2.1:5555", Some("203.0.113.7, 10.0.0.1"));
        assert_eq!(limiter.client_key(&request), "203.0.113.7");

        let request = request_from("192.0.2.1:5555", Some(" "));
        assert_eq!(limiter.client_key(&request), "192.0.2.1");
    }

    #[test]
    fn test_client_key_without_peer_address() {
        let limiter = limiter(2, Duration::from_secs(60));
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(limiter.client_key(&request), "unknown");
    }

    #[test]
    fn test_prune_runs_at_most_once_per_window() {
        let mut limiter = limiter(1, Duration::from_secs(60));
        for client in ["a", "b", "c"] {
            assert!(limiter.check(client));
        }
        limiter.prune_threshold = 2;

        let start = Instant::now();
        assert!(limiter.prune_if_due(start));
        assert!(!limiter.prune_if_due(start + Duration::from_secs(1)));
        assert!(limiter.prune_if_due(start + Duration::from_secs(61)));
    }

    #[test]
    fn test_small_table_is_not_pruned() {
        let limiter = limiter(1, Duration::from_secs(60));
        assert!(limiter.check("a"));
        assert!(!limiter.prune_if_due(Instant::now()));
    }
}
