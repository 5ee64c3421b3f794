//! Wheel source implementations.

use std::collections::VecDeque;
use std::path::Path;

use wheelguard_common::error::{WheelguardError, WheelguardResult};
use wheelguard_common::HookClock;
use wheelguard_scroll_model::{parse_events, ScrollEvent};

use crate::WheelSource;

#[cfg(target_os = "linux")]
mod evdev_wheel;

#[cfg(target_os = "linux")]
pub use self::evdev_wheel::{list_wheel_devices, EvdevWheelSource, WheelDevice};

/// Stub source for testing: hands out preloaded events.
pub struct StubSource {
    events: VecDeque<ScrollEvent>,
    finite: bool,
}

impl StubSource {
    /// A source that goes quiet once its events are consumed, like an idle
    /// device.
    pub fn new(events: Vec<ScrollEvent>) -> Self {
        Self {
            events: events.into(),
            finite: false,
        }
    }

    /// A source that reports exhaustion once its events are consumed.
    pub fn finite(events: Vec<ScrollEvent>) -> Self {
        Self {
            events: events.into(),
            finite: true,
        }
    }

    /// Create an empty stub that never produces events.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl WheelSource for StubSource {
    fn poll(&mut self) -> WheelguardResult<Option<ScrollEvent>> {
        Ok(self.events.pop_front())
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn is_exhausted(&self) -> bool {
        self.finite && self.events.is_empty()
    }
}

/// Replays a recorded JSONL wheel log with its original timestamps.
pub struct ReplaySource {
    label: String,
    events: VecDeque<ScrollEvent>,
}

impl ReplaySource {
    pub fn from_file(path: &Path) -> WheelguardResult<Self> {
        if !path.exists() {
            return Err(WheelguardError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let events = parse_events(&content)?;
        tracing::debug!(path = %path.display(), events = events.len(), "Loaded wheel log");
        Ok(Self {
            label: path.display().to_string(),
            events: events.into(),
        })
    }

    pub fn from_events(events: Vec<ScrollEvent>) -> Self {
        Self {
            label: "memory".to_string(),
            events: events.into(),
        }
    }

    /// Ticks not yet replayed.
    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl WheelSource for ReplaySource {
    fn poll(&mut self) -> WheelguardResult<Option<ScrollEvent>> {
        Ok(self.events.pop_front())
    }

    fn name(&self) -> &str {
        "replay"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn device(&self) -> Option<&str> {
        Some(&self.label)
    }

    fn is_exhausted(&self) -> bool {
        self.events.is_empty()
    }
}

/// Detect the best available live wheel source for the current system.
///
/// `device` selects a specific `/dev/input/event*` node; otherwise the first
/// device reporting a wheel axis is used.
#[cfg(target_os = "linux")]
pub fn detect_best_source(clock: &HookClock, device: Option<&Path>) -> Box<dyn WheelSource> {
    let opened = match device {
        Some(path) => EvdevWheelSource::open(path, clock.clone()),
        None => EvdevWheelSource::first_wheel(clock.clone()),
    };
    match opened {
        Ok(source) => {
            tracing::info!(device = ?source.device(), "Using evdev wheel source");
            return Box::new(source);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to initialize evdev wheel source, using stub");
        }
    }

    tracing::warn!(
        details = %evdev_wheel::input_access_diagnostic(),
        "Using stub wheel source; wheel events will not be captured"
    );
    Box::new(StubSource::empty())
}

#[cfg(not(target_os = "linux"))]
pub fn detect_best_source(_clock: &HookClock, _device: Option<&Path>) -> Box<dyn WheelSource> {
    tracing::warn!(
        "Live wheel sources for this platform are not implemented yet; using stub source"
    );
    Box::new(StubSource::empty())
}
