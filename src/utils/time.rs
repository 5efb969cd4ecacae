use chrono::{DateTime, Utc};

/// Source of the current Unix time, injectable so freshness checks are
/// deterministic under test.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        now().timestamp()
    }
}

/// A clock stopped at a fixed second.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_unix(&self) -> i64 {
        self.0
    }
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}
