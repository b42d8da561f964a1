use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use chrono::{DateTime, Utc, Duration};

use crate::config::AuthConfig;

#[derive(Debug, Clone)]
pub struct LoginThrottleConfig {
    pub window_size: Duration,
    pub max_failures: u32,
}

impl From<&AuthConfig> for LoginThrottleConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            window_size: Duration::seconds(config.failed_login_window_secs),
            max_failures: config.max_failed_logins,
        }
    }
}

#[derive(Debug)]
struct FailureWindow {
    timestamps: Vec<DateTime<Utc>>,
}

impl FailureWindow {
    fn new() -> Self {
        Self {
            timestamps: Vec::new(),
        }
    }

    fn cleanup_old_failures(&mut self, window_size: Duration) {
        let cutoff = Utc::now() - window_size;
        self.timestamps.retain(|ts| *ts > cutoff);
    }
}

/// Sliding-window count of failed logins per client.
pub struct LoginThrottle {
    windows: Arc<RwLock<HashMap<String, FailureWindow>>>,
    config: LoginThrottleConfig,
}

impl LoginThrottle {
    pub fn new(config: LoginThrottleConfig) -> Self {
        Self {
            windows: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Reserve one attempt for `client`, counted as a failure until
    /// `reset` clears it. Returns false once the window is used up.
    /// Check and reservation happen under one write guard so parallel
    /// attempts cannot all slip past the limit.
    pub async fn try_begin(&self, client: &str) -> bool {
        let mut windows = self.windows.write().await;
        let window = windows.entry(client.to_string()).or_insert_with(FailureWindow::new);
        window.cleanup_old_failures(self.config.window_size);

        if window.timestamps.len() < self.config.max_failures as usize {
            window.timestamps.push(Utc::now());
            true
        } else {
            false
        }
    }

    pub async fn reset(&self, client: &str) {
        self.windows.write().await.remove(client);
    }

    pub async fn cleanup(&self) {
        let mut windows = self.windows.write().await;

        windows.retain(|_, window| {
            window.cleanup_old_failures(self.config.window_size);
            !window.timestamps.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration as TokioDuration};

    fn throttle(window: Duration, max_failures: u32) -> LoginThrottle {
        LoginThrottle::new(LoginThrottleConfig {
            window_size: window,
            max_failures,
        })
    }

    #[tokio::test]
    async fn test_blocks_after_max_attempts() {
        let throttle = throttle(Duration::minutes(1), 3);

        for _ in 0..3 {
            assert!(throttle.try_begin("10.0.0.1").await);
        }

        assert!(!throttle.try_begin("10.0.0.1").await);
        assert!(throttle.try_begin("10.0.0.2").await);
    }

    #[tokio::test]
    async fn test_reset_clears_attempts() {
        let throttle = throttle(Duration::minutes(1), 1);
        assert!(throttle.try_begin("10.0.0.1").await);
        assert!(!throttle.try_begin("10.0.0.1").await);

        throttle.reset("10.0.0.1").await;
        assert!(throttle.try_begin("10.0.0.1").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_attempts_respect_limit() {
        let throttle = Arc::new(throttle(Duration::minutes(1), 3));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let throttle = throttle.clone();
                tokio::spawn(async move { throttle.try_begin("10.0.0.1").await })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 3);
    }

    #[tokio::test]
    async fn test_window_expires() {
        let throttle = throttle(Duration::seconds(1), 2);
        assert!(throttle.try_begin("10.0.0.1").await);
        assert!(throttle.try_begin("10.0.0.1").await);
        assert!(!throttle.try_begin("10.0.0.1").await);

        sleep(TokioDuration::from_millis(1100)).await;
        throttle.cleanup().await;
        assert!(throttle.windows.read().await.is_empty());

        assert!(throttle.try_begin("10.0.0.1").await);
    }
}
