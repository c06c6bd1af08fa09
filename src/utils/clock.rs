use chrono::{Local, NaiveDateTime, SubsecRound};

/// Source of "now" for the attendance service, in server-local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    // DATETIME columns hold whole seconds
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local().trunc_subsecs(0)
    }
}

#[cfg(test)]
pub use manual::ManualClock;
