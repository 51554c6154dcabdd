//! Time sources for rate-limit waits and request pacing
//!
//! The client never reads the wall clock or sleeps directly; it goes through
//! these traits so retry behavior can be driven by a fixed clock in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Blocking wait
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Real sleep on the Tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Seconds to wait before retrying: until `reset` plus `buffer`, never negative.
///
/// Without a reset timestamp only the buffer is waited.
pub fn rate_limit_wait(now: DateTime<Utc>, reset: Option<i64>, buffer_secs: u64) -> Duration {
    let buffer = buffer_secs as i64;
    let secs = match reset {
        Some(reset) => (reset - now.timestamp() + buffer).max(0),
        None => buffer,
    };
    Duration::from_secs(secs as u64)
}
