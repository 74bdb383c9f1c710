use std::fmt::{self, Debug, Formatter};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds between 1601-01-01 (the Windows FILETIME epoch) and 1970-01-01.
const FILETIME_EPOCH_DIFF: i64 = 11_644_473_600;
const FILETIME_TICKS_PER_SEC: i64 = 10_000_000;

/// A point in time with nanosecond precision, counted from the Unix epoch.
///
/// [`Timestamp::ZERO`] doubles as "not available" for fields the platform doesn't report.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    secs: i64,
    nanos: u32,
}

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp { secs: 0, nanos: 0 };

    /// Builds a timestamp from a seconds/nanoseconds pair, normalizing out-of-range nanoseconds.
    pub const fn new(secs: i64, nanos: i64) -> Timestamp {
        let secs = secs + nanos.div_euclid(1_000_000_000);
        let nanos = nanos.rem_euclid(1_000_000_000) as u32;
        Timestamp { secs, nanos }
    }

    /// Converts a Windows FILETIME (100ns ticks since 1601) value. A zero FILETIME means "unset".
    pub const fn from_filetime(ticks: i64) -> Timestamp {
        if ticks == 0 {
            return Timestamp::ZERO;
        }
        let secs = ticks.div_euclid(FILETIME_TICKS_PER_SEC) - FILETIME_EPOCH_DIFF;
        let nanos = ticks.rem_euclid(FILETIME_TICKS_PER_SEC) * 100;
        Timestamp::new(secs, nanos)
    }

    pub const fn secs(&self) -> i64 {
        self.secs
    }

    pub const fn subsec_nanos(&self) -> u32 {
        self.nanos
    }

    pub const fn is_zero(&self) -> bool {
        self.secs == 0 && self.nanos == 0
    }

    pub fn to_system_time(&self) -> SystemTime {
        if self.secs >= 0 {
            UNIX_EPOCH + Duration::new(self.secs as u64, self.nanos)
        } else {
            // Negative seconds with positive nanos: step back whole seconds, then forward.
            UNIX_EPOCH - Duration::from_secs(self.secs.unsigned_abs()) + Duration::from_nanos(self.nanos as u64)
        }
    }
}

impl From<SystemTime> for Timestamp {
    fn from(value: SystemTime) -> Self {
        match value.duration_since(UNIX_EPOCH) {
            Ok(after) => Timestamp::new(after.as_secs() as i64, after.subsec_nanos() as i64),
            Err(before) => {
                let before = before.duration();
                Timestamp::new(-(before.as_secs() as i64), -(before.subsec_nanos() as i64))
            },
        }
    }
}

impl From<Timestamp> for SystemTime {
    fn from(value: Timestamp) -> Self {
        value.to_system_time()
    }
}

impl Debug for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.secs, self.nanos)
    }
}
