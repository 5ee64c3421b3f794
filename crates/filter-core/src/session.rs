//! Per-profile session state owned by the hook thread.

use serde::Serialize;
use wheelguard_scroll_model::{ScrollDirection, ScrollEvent, TimestampMs};

use crate::error::FilterFault;

/// Number of recent timestamps kept for momentum estimation.
pub const MOMENTUM_WINDOW: usize = 5;

/// Fixed-capacity ring of the most recent tick timestamps.
///
/// `Copy` so a whole session can be snapshotted without allocating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimestampRing {
    buf: [TimestampMs; MOMENTUM_WINDOW],
    len: usize,
    next: usize,
}

impl TimestampRing {
    pub fn push(&mut self, timestamp_ms: TimestampMs) {
        self.buf[self.next] = timestamp_ms;
        self.next = (self.next + 1) % MOMENTUM_WINDOW;
        self.len = (self.len + 1).min(MOMENTUM_WINDOW);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Timestamps from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = TimestampMs> + '_ {
        let start = (self.next + MOMENTUM_WINDOW - self.len) % MOMENTUM_WINDOW;
        (0..self.len).map(move |i| self.buf[(start + i) % MOMENTUM_WINDOW])
    }

    /// Gaps between consecutive timestamps, oldest first.
    ///
    /// Returns the gap buffer and how many entries are valid.
    pub fn gaps(&self) -> ([u64; MOMENTUM_WINDOW - 1], usize) {
        let mut gaps = [0u64; MOMENTUM_WINDOW - 1];
        let mut count = 0;
        let mut prev = None;
        for ts in self.iter() {
            if let Some(p) = prev {
                gaps[count] = ts.saturating_sub(p);
                count += 1;
            }
            prev = Some(ts);
        }
        (gaps, count)
    }
}

/// Why a session was reset to its initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetCause {
    /// Silence longer than the block interval.
    Idle,
    /// A timestamp older than the previous one.
    ClockAnomaly,
    /// The foreground application switched to another profile.
    ProfileChanged,
    /// A new configuration was published.
    ConfigReloaded,
    /// The host asked for a reset (restore defaults, toggle).
    HostRequest,
    /// Recovery after an internal fault.
    Fault,
}

/// Mutable filter state for one scroll session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    pub(crate) established_direction: Option<ScrollDirection>,
    pub(crate) last_event_ms: Option<TimestampMs>,
    pub(crate) consecutive_opposite: u32,
    pub(crate) pending_strict: Option<ScrollEvent>,
    pub(crate) recent: TimestampRing,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn established_direction(&self) -> Option<ScrollDirection> {
        self.established_direction
    }

    pub fn last_event_ms(&self) -> Option<TimestampMs> {
        self.last_event_ms
    }

    pub fn consecutive_opposite(&self) -> u32 {
        self.consecutive_opposite
    }

    pub fn pending_strict(&self) -> Option<ScrollEvent> {
        self.pending_strict
    }

    pub fn recent(&self) -> &TimestampRing {
        &self.recent
    }

    /// True before the first tick and right after a reset.
    pub fn is_fresh(&self) -> bool {
        *self == Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Bookkeeping shared by every non-discarded tick.
    pub(crate) fn record(&mut self, timestamp_ms: TimestampMs) {
        self.last_event_ms = Some(timestamp_ms);
        self.recent.push(timestamp_ms);
    }

    /// Reject states the engine can never produce on its own.
    pub fn check_invariants(&self) -> Result<(), FilterFault> {
        if self.established_direction.is_none() && self.consecutive_opposite > 0 {
            return Err(FilterFault::CorruptSession(
                "opposite count without an established direction",
            ));
        }
        if self.established_direction.is_some() && self.pending_strict.is_some() {
            return Err(FilterFault::CorruptSession(
                "pending strict tick in an established session",
            ));
        }
        if let (Some(pending), Some(last)) = (self.pending_strict, self.last_event_ms) {
            if pending.timestamp_ms > last {
                return Err(FilterFault::CorruptSession(
                    "pending strict tick newer than the last recorded tick",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_keeps_latest_window() {
        let mut ring = TimestampRing::default();
        for ts in [0, 10, 30, 60, 100, 150, 210] {
            ring.push(ts);
        }
        assert_eq!(ring.len(), MOMENTUM_WINDOW);
        assert_eq!(ring.iter().collect::<Vec<_>>(), vec![30, 60, 100, 150, 210]);
        let (gaps, count) = ring.gaps();
        assert_eq!(&gaps[..count], &[30, 40, 50, 60]);
    }

    #[test]
    fn test_ring_with_single_sample_has_no_gaps() {
        let mut ring = TimestampRing::default();
        ring.push(5);
        assert_eq!(ring.gaps().1, 0);
        ring.clear();
        assert!(ring.is_empty());
    }

    #[test]
    fn test_invariants_catch_orphan_count() {
        let state = SessionState {
            consecutive_opposite: 2,
            ..SessionState::default()
        };
        assert!(matches!(
            state.check_invariants(),
            Err(FilterFault::CorruptSession(_))
        ));
        assert!(SessionState::new().check_invariants().is_ok());
    }
}
