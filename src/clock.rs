use std::convert::TryFrom;
use std::time::{Duration, Instant};

/// Frame schedule of one hardware run
///
/// Tick `n` (counting from zero) is due at `start + interval * (n + 1)`.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    start: Instant,
    interval: Duration,
}

impl FrameClock {
    /// Returns a clock whose first tick is due one interval after `start`
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::{Duration, Instant};
    /// use capsim::FrameClock;
    ///
    /// let start = Instant::now();
    /// let clock = FrameClock::new(start, Duration::from_millis(33));
    /// assert_eq!(clock.next_fire_time(0), Some(start + Duration::from_millis(33)));
    /// ```
    pub fn new(start: Instant, interval: Duration) -> Self {
        FrameClock { start, interval }
    }

    pub fn start_time(&self) -> Instant {
        self.start
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Deadline of the tick following `tick_count` elapsed ticks
    ///
    /// Returns `None` when the deadline cannot be represented.
    pub fn next_fire_time(&self, tick_count: u32) -> Option<Instant> {
        let offset = self.interval.checked_mul(tick_count.checked_add(1)?)?;
        self.start.checked_add(offset)
    }

    /// Number of whole intervals between the start and `now`
    pub fn elapsed_ticks(&self, now: Instant) -> u32 {
        let elapsed = now.saturating_duration_since(self.start);
        let ticks = elapsed.as_nanos() / self.interval.as_nanos().max(1);
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }
}
