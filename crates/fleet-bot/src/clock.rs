//! Wall-clock abstraction for confirmation expiry.
//!
//! - `SystemClock`: delegates to `chrono::Utc`
//! - `MockClock`: returns a controllable epoch that advances only on demand

#[cfg(test)]
use std::sync::{Arc, Mutex};

pub trait Clock: Send + Sync + 'static {
    /// Seconds since the Unix epoch.
    fn now_epoch_secs(&self) -> i64;
}

#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[cfg(test)]
#[derive(Clone)]
pub struct MockClock {
    current: Arc<Mutex<i64>>,
}

#[cfg(test)]
impl MockClock {
    pub fn new(start: i64) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, secs: i64) {
        *self.current.lock().unwrap() += secs;
    }
}

#[cfg(test)]
impl Clock for MockClock {
    fn now_epoch_secs(&self) -> i64 {
        *self.current.lock().unwrap()
    }
}
