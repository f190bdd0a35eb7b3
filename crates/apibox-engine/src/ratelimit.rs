//! Per-(remote-IP, command) token-bucket rate limiting with bearer-token
//! bypass.

use std::net::IpAddr;
use std::time::Instant;

use base64::Engine;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

struct Bucket {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(limit_per_min: i64) -> Self {
        let capacity = limit_per_min.max(0) as f64;
        Self {
            tokens: capacity,
            capacity,
            refill_per_sec: capacity / 60.0,
            last_refill: Instant::now(),
        }
    }

    fn take(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Process-lifetime rate limiter. `limit == 0` disables limiting entirely,
/// per the configured `limit` key: unauthenticated requests are then always
/// served.
pub struct RateLimiter {
    limit_per_min: i64,
    buckets: DashMap<(IpAddr, String), Bucket>,
    token_digests: Vec<String>,
}

impl RateLimiter {
    pub fn new(limit_per_min: i64, token_digests: Vec<String>) -> Self {
        Self {
            limit_per_min,
            buckets: DashMap::new(),
            token_digests,
        }
    }

    /// Returns `true` when `sha256(token)` base64-encoded matches a
    /// configured digest, which bypasses rate limiting entirely.
    pub fn token_authorized(&self, token: &str) -> bool {
        let digest = base64::engine::general_purpose::STANDARD.encode(Sha256::digest(token));
        self.token_digests.iter().any(|d| d == &digest)
    }

    /// Deducts one token from the bucket for `(ip, command)`, creating it
    /// lazily. Returns `false` when the bucket is exhausted.
    pub fn check(&self, ip: IpAddr, command: &str, bearer_token: Option<&str>) -> bool {
        if self.limit_per_min <= 0 {
            return true;
        }
        if let Some(token) = bearer_token {
            if self.token_authorized(token) {
                return true;
            }
        }
        let key = (ip, command.to_string());
        let mut bucket = self
            .buckets
            .entry(key)
            .or_insert_with(|| Bucket::new(self.limit_per_min));
        bucket.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_limit_then_rejected() {
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let limiter = RateLimiter::new(2, vec![]);
        assert!(limiter.check(ip, "attachToTangle", None));
        assert!(limiter.check(ip, "attachToTangle", None));
        assert!(!limiter.check(ip, "attachToTangle", None));
    }

    #[test]
    fn zero_limit_disables_limiting() {
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let limiter = RateLimiter::new(0, vec![]);
        for _ in 0..1000 {
            assert!(limiter.check(ip, "attachToTangle", None));
        }
    }

    #[test]
    fn valid_token_always_bypasses() {
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let digest =
            base64::engine::general_purpose::STANDARD.encode(Sha256::digest("secret-token"));
        let limiter = RateLimiter::new(1, vec![digest]);
        for _ in 0..100 {
            assert!(limiter.check(ip, "attachToTangle", Some("secret-token")));
        }
    }

    #[test]
    fn buckets_are_independent_per_command() {
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let limiter = RateLimiter::new(1, vec![]);
        assert!(limiter.check(ip, "attachToTangle", None));
        assert!(limiter.check(ip, "getNodeInfo", None));
    }
}
