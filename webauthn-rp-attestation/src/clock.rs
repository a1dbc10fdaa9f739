use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current time, used for certificate validity and SafetyNet freshness checks.
#[cfg_attr(any(test, feature = "testable"), mockall::automock)]
pub trait Clock {
    /// The current time.
    fn now(&self) -> SystemTime;
}

/// The system's wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub SystemTime);

impl FixedClock {
    /// A clock frozen `secs` seconds after the Unix epoch.
    pub fn from_unix_seconds(secs: u64) -> Self {
        Self(UNIX_EPOCH + Duration::from_secs(secs))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> SystemTime {
        (**self).now()
    }
}

/// Milliseconds since the Unix epoch, negative before it.
pub(crate) fn unix_millis(clock: &impl Clock) -> i128 {
    match clock.now().duration_since(UNIX_EPOCH) {
        Ok(after) => i128::try_from(after.as_millis()).unwrap_or(i128::MAX),
        Err(before) => i128::try_from(before.duration().as_millis())
            .map(|ms| -ms)
            .unwrap_or(i128::MIN),
    }
}

/// Seconds since the Unix epoch, as certificate validity periods are expressed.
pub(crate) fn unix_seconds(clock: &impl Clock) -> i64 {
    i64::try_from(unix_millis(clock).div_euclid(1000)).unwrap_or(i64::MAX)
}
