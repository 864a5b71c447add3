//! Per-connection flood protection for inbound room actions.
//!
//! A fixed window counter keyed by connection id. One misbehaving client can
//! otherwise spam votes or story updates to the whole room.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

use crate::config::ServerConfig;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Map of connection id to (action count, window start)
    requests: Arc<RwLock<HashMap<String, (u32, Instant)>>>,
    /// Maximum actions per window
    max_requests: u32,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(60, Duration::from_secs(10))
    }
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Build the limiter described by config (None = disabled)
    pub fn from_config(config: &ServerConfig) -> Option<Self> {
        config
            .rate_limit_enabled
            .then(|| Self::new(config.rate_limit_max, config.rate_limit_window))
    }

    /// Returns true if allowed, false if rate limited
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut requests = self.requests.write().await;

        match requests.get_mut(key) {
            Some((count, window_start)) => {
                if now.duration_since(*window_start) >= self.window {
                    *count = 1;
                    *window_start = now;
                    true
                } else if *count >= self.max_requests {
                    false
                } else {
                    *count += 1;
                    true
                }
            }
            None => {
                requests.insert(key.to_string(), (1, now));
                true
            }
        }
    }

    /// Drop the counter for a closed connection
    pub async fn forget(&self, key: &str) {
        self.requests.write().await.remove(key);
    }

    #[cfg(test)]
    pub async fn tracked(&self) -> usize {
        self.requests.read().await.len()
    }
}
