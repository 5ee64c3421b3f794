//! Monotonic hook clock.
//!
//! Every wheel tick is stamped with milliseconds on a monotonic clock anchored
//! when the hook starts. Wall-clock time is only kept for log headers, never
//! used for filtering decisions.

use std::time::{Duration, Instant};

/// A monotonic millisecond clock anchored to a fixed epoch.
#[derive(Debug, Clone)]
pub struct HookClock {
    /// The instant the hook started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,
}

impl HookClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a clock from a known epoch.
    pub fn from_epoch(epoch: Instant, wall: String) -> Self {
        Self {
            epoch,
            epoch_wall: wall,
        }
    }

    /// Milliseconds elapsed since the epoch.
    pub fn now_ms(&self) -> u64 {
        Self::duration_to_ms(self.epoch.elapsed())
    }

    /// Milliseconds between the epoch and an arbitrary later instant.
    ///
    /// Instants before the epoch map to 0.
    pub fn ms_at(&self, instant: Instant) -> u64 {
        Self::duration_to_ms(instant.saturating_duration_since(self.epoch))
    }

    /// Wall-clock time at the epoch.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// The underlying epoch instant.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// Convert milliseconds to fractional seconds.
    pub fn ms_to_secs(ms: u64) -> f64 {
        ms as f64 / 1_000.0
    }

    fn duration_to_ms(duration: Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_monotonic() {
        let clock = HookClock::start();
        let first = clock.now_ms();
        let second = clock.now_ms();
        assert!(second >= first);
        assert!(first < 1_000);
    }

    #[test]
    fn test_ms_at_saturates_before_epoch() {
        let earlier = Instant::now();
        let clock = HookClock::from_epoch(
            earlier + Duration::from_millis(50),
            "2026-01-01T00:00:00Z".into(),
        );
        assert_eq!(clock.ms_at(earlier), 0);
        assert_eq!(clock.ms_at(earlier + Duration::from_millis(80)), 30);
    }

    #[test]
    fn test_ms_to_secs() {
        assert!((HookClock::ms_to_secs(1_500) - 1.5).abs() < 1e-9);
    }
}
