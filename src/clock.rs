use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};
use tracing::warn;

/// Source of wall-clock "now" for query times.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> PrimitiveDateTime;
}

/// Wall clock at a fixed UTC offset, detected once.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    pub fn new(offset: UtcOffset) -> Self {
        Self { offset }
    }

    /// Use the host's local offset, falling back to UTC when it cannot be determined.
    pub fn detect() -> Self {
        match UtcOffset::current_local_offset() {
            Ok(offset) => Self::new(offset),
            Err(err) => {
                warn!(error = %err, "Local UTC offset unavailable, using UTC; adjust hour_offset");
                Self::new(UtcOffset::UTC)
            }
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> PrimitiveDateTime {
        let now = OffsetDateTime::now_utc().to_offset(self.offset);
        PrimitiveDateTime::new(now.date(), now.time())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub PrimitiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> PrimitiveDateTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[test]
    fn fixed_clock_never_moves() {
        let clock = FixedClock(datetime!(2025-07-04 12:00));

        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now(), datetime!(2025-07-04 12:00));
    }

    #[test]
    fn system_clock_applies_offset() {
        let utc = SystemClock::new(UtcOffset::UTC).now();
        let pacific = SystemClock::new(offset!(-8)).now();

        let delta = (utc - pacific).whole_hours();
        assert!((7..=8).contains(&delta), "unexpected delta {delta}");
    }
}
