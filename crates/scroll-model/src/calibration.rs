//! Recorded calibration samples.
//!
//! A calibration run walks the user through four scripted phases. Each phase
//! produces a closed, ordered event sequence (or a list of trials) that the
//! statistics engine consumes after the run.

use serde::{Deserialize, Serialize};

use crate::event::{ScrollDirection, ScrollEvent, TimestampMs};

/// Scripted test phases, in the order a wizard runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationPhase {
    /// Slow, continuous scrolling in one direction.
    Flow,
    /// Scrolling as fast as possible for a few seconds.
    Sprint,
    /// Fast scrolling, then an abrupt stop on a signal.
    Brake,
    /// Slow notch-by-notch scrolling with deliberate reversals.
    Precision,
}

impl CalibrationPhase {
    pub const ALL: [CalibrationPhase; 4] = [Self::Flow, Self::Sprint, Self::Brake, Self::Precision];

    /// Whether the phase is recorded as a list of trials.
    pub fn is_trial_based(self) -> bool {
        matches!(self, Self::Brake | Self::Precision)
    }
}

impl std::fmt::Display for CalibrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Flow => "flow",
            Self::Sprint => "sprint",
            Self::Brake => "brake",
            Self::Precision => "precision",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for CalibrationPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flow" => Ok(Self::Flow),
            "sprint" => Ok(Self::Sprint),
            "brake" => Ok(Self::Brake),
            "precision" => Ok(Self::Precision),
            other => Err(format!(
                "unknown calibration phase '{other}' (expected flow|sprint|brake|precision)"
            )),
        }
    }
}

/// One brake attempt: the user scrolls, then stops when signalled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrakeTrial {
    /// When the stop signal was shown.
    pub stop_at_ms: TimestampMs,
    /// Every tick captured during the attempt, stop tail included.
    pub events: Vec<ScrollEvent>,
}

/// One deliberate reversal during the precision phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversalTrial {
    /// Direction the user reversed into.
    pub reversed_to: ScrollDirection,
    /// When the user reported the reversal as intentional.
    pub confirmed_at_ms: TimestampMs,
    /// Every tick captured during the trial.
    pub events: Vec<ScrollEvent>,
}

/// A complete, closed calibration sample set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSamples {
    pub flow: Vec<ScrollEvent>,
    pub sprint: Vec<ScrollEvent>,
    pub brake: Vec<BrakeTrial>,
    pub precision: Vec<ReversalTrial>,
}

impl CalibrationSamples {
    /// Number of recorded units for a phase: ticks for stream phases,
    /// trials for trial-based phases.
    pub fn recorded(&self, phase: CalibrationPhase) -> usize {
        match phase {
            CalibrationPhase::Flow => self.flow.len(),
            CalibrationPhase::Sprint => self.sprint.len(),
            CalibrationPhase::Brake => self.brake.len(),
            CalibrationPhase::Precision => self.precision.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        CalibrationPhase::ALL
            .iter()
            .all(|phase| self.recorded(*phase) == 0)
    }
}
