use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::scheduler::shutdown::Shutdown;

/// Source of wall-clock time for the watch loop.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn sleep(&self, duration: Duration);
}

/// Wall clock whose sleeps end early once `shutdown` is triggered.
#[derive(Debug, Clone, Default)]
pub struct SystemClock {
    shutdown: Shutdown,
}

impl SystemClock {
    pub fn new(shutdown: Shutdown) -> Self {
        Self { shutdown }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        if self.shutdown.wait_timeout(duration) {
            log::debug!("Sleep interrupted by shutdown");
        }
    }
}
