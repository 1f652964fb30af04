//! Time source for every persisted timestamp.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock with microsecond resolution that never goes backwards.
///
/// Two calls within the same microsecond (or across a wall-clock step back)
/// return strictly increasing instants, so `created_at` ordering matches
/// insertion order.
#[derive(Debug, Default)]
pub struct SystemClock {
    last_micros: AtomicI64,
}

impl SystemClock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_micros: AtomicI64::new(0),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_micros();
        let mut prev = self.last_micros.load(Ordering::Acquire);
        loop {
            let next = wall.max(prev + 1);
            match self.last_micros.compare_exchange_weak(
                prev,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return DateTime::from_timestamp_micros(next).unwrap_or_else(Utc::now),
                Err(actual) => prev = actual,
            }
        }
    }
}
