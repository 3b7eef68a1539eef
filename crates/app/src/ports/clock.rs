//! Clock port: injectable time source.

use chrono::{Local, NaiveTime};

use homerunner_domain::time::{self, Timestamp};

/// Source of the current time.
///
/// `now` stamps history and drives cooldowns; `local_time` is the wall clock
/// used for daily windows, without any timezone handling beyond the host's.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    fn local_time(&self) -> NaiveTime;
}

/// The host clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        time::now()
    }

    fn local_time(&self) -> NaiveTime {
        Local::now().time()
    }
}
