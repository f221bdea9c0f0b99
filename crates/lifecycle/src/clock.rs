use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use shared::domain::Timestamp;

pub trait Clock: Send + Sync {
    /// Current wall-clock time in the configured zone.
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_local(Utc::now().with_timezone(&self.tz).naive_local())
    }
}

#[derive(Debug, Clone)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_local(self.0)
    }
}
