//! Calibration statistics engine.
//!
//! # Derivations
//!
//! | parameter | source | statistic |
//! |---|---|---|
//! | `physics_check_ms` | brake reversal gaps + flow glitch gaps | p10 |
//! | `block_interval_ms` | flow inter-tick gaps | p90 |
//! | `momentum_speed_threshold_ms` | sprint inter-tick gaps | median |
//! | `direction_change_threshold` | precision reversal run lengths | p75, at least 2 |
//! | `strict_mode` | brake trials | on when any trial bounced |
//!
//! A parameter whose source has fewer than [`MIN_SAMPLES`] entries keeps its
//! built-in default and is reported as such.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wheelguard_scroll_model::{
    gaps_ms, BrakeTrial, CalibrationPhase, CalibrationSamples, FilterConfig, ProfileOverride,
    ReversalTrial, ScrollDirection, ScrollEvent,
};

use crate::stats::{median, percentile};

/// Minimum entries in a derived sample list before it is trusted.
pub const MIN_SAMPLES: usize = 5;

/// Smallest threshold calibration will recommend.
const MIN_RECOMMENDED_THRESHOLD: u32 = 2;

/// Configuration fields calibration can derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    PhysicsCheckMs,
    BlockIntervalMs,
    MomentumSpeedThresholdMs,
    DirectionChangeThreshold,
    StrictMode,
}

impl Parameter {
    pub const ALL: [Parameter; 5] = [
        Self::PhysicsCheckMs,
        Self::BlockIntervalMs,
        Self::MomentumSpeedThresholdMs,
        Self::DirectionChangeThreshold,
        Self::StrictMode,
    ];

    /// Phases whose data drive this parameter.
    pub fn sources(self) -> &'static [CalibrationPhase] {
        match self {
            Self::PhysicsCheckMs => &[CalibrationPhase::Brake, CalibrationPhase::Flow],
            Self::BlockIntervalMs => &[CalibrationPhase::Flow],
            Self::MomentumSpeedThresholdMs => &[CalibrationPhase::Sprint],
            Self::DirectionChangeThreshold => &[CalibrationPhase::Precision],
            Self::StrictMode => &[CalibrationPhase::Brake],
        }
    }

    /// Current value of this parameter in `config`, formatted for display.
    pub fn describe(self, config: &FilterConfig) -> String {
        match self {
            Self::PhysicsCheckMs => format!("{} ms", config.physics_check_ms),
            Self::BlockIntervalMs => format!("{} ms", config.block_interval_ms),
            Self::MomentumSpeedThresholdMs => format!(
                "{} ms (momentum {})",
                config.momentum_speed_threshold_ms,
                if config.momentum_enabled { "on" } else { "off" }
            ),
            Self::DirectionChangeThreshold => config.direction_change_threshold.to_string(),
            Self::StrictMode => if config.strict_mode { "on" } else { "off" }.to_string(),
        }
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::PhysicsCheckMs => "physics_check_ms",
            Self::BlockIntervalMs => "block_interval_ms",
            Self::MomentumSpeedThresholdMs => "momentum_speed_threshold_ms",
            Self::DirectionChangeThreshold => "direction_change_threshold",
            Self::StrictMode => "strict_mode",
        };
        f.write_str(name)
    }
}

/// Where a recommended value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// Derived from this many samples.
    Recommended { samples: usize },
    /// Built-in default kept for lack of data.
    Default { observed: usize, required: usize },
}

impl Provenance {
    pub fn is_recommended(&self) -> bool {
        matches!(self, Self::Recommended { .. })
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recommended { samples } => write!(f, "recommended ({samples} samples)"),
            Self::Default { observed, required } => write!(
                f,
                "default (insufficient data: {observed} of {required} samples)"
            ),
        }
    }
}

/// Outcome of a calibration analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    /// Complete candidate configuration.
    pub config: FilterConfig,
    pub provenance: BTreeMap<Parameter, Provenance>,
    /// Human-readable findings, in derivation order.
    pub diagnosis: Vec<String>,
}

impl CalibrationReport {
    pub fn provenance(&self, parameter: Parameter) -> Option<Provenance> {
        self.provenance.get(&parameter).copied()
    }

    pub fn recommended_count(&self) -> usize {
        self.provenance
            .values()
            .filter(|p| p.is_recommended())
            .count()
    }

    /// Whether every parameter was derived from data.
    pub fn is_conclusive(&self) -> bool {
        self.recommended_count() == Parameter::ALL.len()
    }

    fn is_recommended(&self, parameter: Parameter) -> bool {
        self.provenance(parameter)
            .is_some_and(|p| p.is_recommended())
    }

    /// Copy the recommended parameters onto `base`, leaving everything the
    /// data did not support as it was.
    pub fn apply_to(&self, base: &FilterConfig) -> FilterConfig {
        let mut config = base.clone();
        if self.is_recommended(Parameter::PhysicsCheckMs) {
            config.physics_check_ms = self.config.physics_check_ms;
        }
        if self.is_recommended(Parameter::BlockIntervalMs) {
            config.block_interval_ms = self.config.block_interval_ms;
        }
        if self.is_recommended(Parameter::MomentumSpeedThresholdMs) {
            config.momentum_speed_threshold_ms = self.config.momentum_speed_threshold_ms;
            config.momentum_enabled = self.config.momentum_enabled;
        }
        if self.is_recommended(Parameter::DirectionChangeThreshold) {
            config.direction_change_threshold = self.config.direction_change_threshold;
        }
        if self.is_recommended(Parameter::StrictMode) {
            config.strict_mode = self.config.strict_mode;
        }
        if config.physics_check_ms >= config.block_interval_ms {
            config.block_interval_ms = config.physics_check_ms + 1;
        }
        config
    }

    /// The recommended parameters as a per-application override.
    pub fn to_override(&self, global: &FilterConfig) -> ProfileOverride {
        let applied = self.apply_to(global);
        let changed = |a: u64, b: u64| (a != b).then_some(a);
        ProfileOverride {
            enabled: None,
            block_interval_ms: changed(applied.block_interval_ms, global.block_interval_ms),
            physics_check_ms: changed(applied.physics_check_ms, global.physics_check_ms),
            momentum_speed_threshold_ms: changed(
                applied.momentum_speed_threshold_ms,
                global.momentum_speed_threshold_ms,
            ),
            direction_change_threshold: (applied.direction_change_threshold
                != global.direction_change_threshold)
                .then_some(applied.direction_change_threshold),
            strict_mode: (applied.strict_mode != global.strict_mode).then_some(applied.strict_mode),
            momentum_enabled: (applied.momentum_enabled != global.momentum_enabled)
                .then_some(applied.momentum_enabled),
            momentum_threshold_multiplier: None,
        }
    }
}

/// What the brake trials showed.
#[derive(Debug, Default)]
struct BrakeFindings {
    reversal_gaps: Vec<u64>,
    bounced_trials: usize,
    worst_bounce_ms: Option<u64>,
}

/// Derives a filter configuration from recorded samples.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationAnalyzer {
    min_samples: usize,
}

impl Default for CalibrationAnalyzer {
    fn default() -> Self {
        Self {
            min_samples: MIN_SAMPLES,
        }
    }
}

impl CalibrationAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_samples(min_samples: usize) -> Self {
        Self {
            min_samples: min_samples.max(1),
        }
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Analyze a closed sample set. Pure and deterministic.
    pub fn analyze(&self, samples: &CalibrationSamples) -> CalibrationReport {
        let defaults = FilterConfig::default();
        let mut report = CalibrationReport {
            config: defaults.clone(),
            provenance: BTreeMap::new(),
            diagnosis: Vec::new(),
        };

        let flow_direction = dominant_direction(&samples.flow);
        let flow_gaps = gaps_ms(&samples.flow);
        let glitch_gaps = flow_direction
            .map(|dir| glitch_gaps(&samples.flow, dir))
            .unwrap_or_default();
        let brake = brake_findings(&samples.brake);

        // Physics check: the fastest credible reversals are bounce.
        let mut physics_samples = brake.reversal_gaps.clone();
        physics_samples.extend_from_slice(&glitch_gaps);
        if let Some(value) = self.trusted(&physics_samples, |s| percentile(s, 10)) {
            report.config.physics_check_ms = value;
            report.recommend(Parameter::PhysicsCheckMs, physics_samples.len());
        } else {
            self.keep_default(&mut report, Parameter::PhysicsCheckMs, physics_samples.len());
        }
        match glitch_gaps.iter().min() {
            Some(fastest) => report
                .diagnosis
                .push(format!("Detected micro-jitters (fastest: {fastest}ms).")),
            None if flow_gaps.len() >= self.min_samples => {
                report.diagnosis.push("Signal is clean.".to_string())
            }
            None => {}
        }

        // Block interval: long enough to cover nearly every slow-scroll gap.
        if let Some(value) = self.trusted(&flow_gaps, |s| percentile(s, 90)) {
            report.config.block_interval_ms = value;
            report.recommend(Parameter::BlockIntervalMs, flow_gaps.len());
        } else {
            self.keep_default(&mut report, Parameter::BlockIntervalMs, flow_gaps.len());
        }

        // Momentum: the user's typical sprint gap marks "fast".
        let sprint_gaps = gaps_ms(&samples.sprint);
        if let Some(value) = self.trusted(&sprint_gaps, median) {
            report.config.momentum_speed_threshold_ms = value;
            report.config.momentum_enabled = true;
            report.recommend(Parameter::MomentumSpeedThresholdMs, sprint_gaps.len());
            if value < defaults.momentum_speed_threshold_ms {
                report.diagnosis.push("High-velocity scroller.".to_string());
            }
        } else {
            self.keep_default(
                &mut report,
                Parameter::MomentumSpeedThresholdMs,
                sprint_gaps.len(),
            );
        }

        // Threshold: how many ticks a deliberate reversal takes.
        let runs = reversal_runs(&samples.precision);
        if let Some(value) = self.trusted(&runs, |s| percentile(s, 75)) {
            let threshold = u32::try_from(value).unwrap_or(u32::MAX);
            report.config.direction_change_threshold = threshold.max(MIN_RECOMMENDED_THRESHOLD);
            report.recommend(Parameter::DirectionChangeThreshold, runs.len());
        } else {
            self.keep_default(&mut report, Parameter::DirectionChangeThreshold, runs.len());
        }

        // Strict mode: any stop bounce means the first tick can't be trusted.
        let trials = samples.brake.len();
        if trials >= self.min_samples {
            report.recommend(Parameter::StrictMode, trials);
            match brake.worst_bounce_ms {
                Some(worst) if brake.bounced_trials > 0 => {
                    report.config.strict_mode = true;
                    report
                        .diagnosis
                        .push(format!("Stop bounce detected (worst: {worst}ms)."));
                }
                _ => report.diagnosis.push("Brakes are solid.".to_string()),
            }
        } else {
            self.keep_default(&mut report, Parameter::StrictMode, trials);
        }

        let config = &mut report.config;
        if config.physics_check_ms >= config.block_interval_ms {
            config.block_interval_ms = config.physics_check_ms + 1;
            report.diagnosis.push(format!(
                "Block interval raised to {}ms to stay above the physics check.",
                config.block_interval_ms
            ));
        }

        tracing::debug!(
            recommended = report.recommended_count(),
            physics_samples = physics_samples.len(),
            flow_gaps = flow_gaps.len(),
            sprint_gaps = sprint_gaps.len(),
            reversal_runs = runs.len(),
            brake_trials = trials,
            "Calibration analysis complete"
        );
        report
    }

    fn trusted(&self, samples: &[u64], statistic: impl Fn(&[u64]) -> Option<u64>) -> Option<u64> {
        if samples.len() < self.min_samples {
            return None;
        }
        statistic(samples)
    }

    fn keep_default(&self, report: &mut CalibrationReport, parameter: Parameter, observed: usize) {
        report.provenance.insert(
            parameter,
            Provenance::Default {
                observed,
                required: self.min_samples,
            },
        );
        report.diagnosis.push(format!(
            "Not enough data for {parameter} ({observed} of {} samples); keeping default.",
            self.min_samples
        ));
    }
}

impl CalibrationReport {
    fn recommend(&mut self, parameter: Parameter, samples: usize) {
        self.provenance
            .insert(parameter, Provenance::Recommended { samples });
    }
}

/// Analyze with the default sample minimum.
pub fn analyze(samples: &CalibrationSamples) -> CalibrationReport {
    CalibrationAnalyzer::default().analyze(samples)
}

/// Majority direction of a sequence; ties go to the first tick.
fn dominant_direction(events: &[ScrollEvent]) -> Option<ScrollDirection> {
    let first = events.first()?.direction;
    let up = events
        .iter()
        .filter(|e| e.direction == ScrollDirection::Up)
        .count();
    let down = events.len() - up;
    Some(match up.cmp(&down) {
        std::cmp::Ordering::Greater => ScrollDirection::Up,
        std::cmp::Ordering::Less => ScrollDirection::Down,
        std::cmp::Ordering::Equal => first,
    })
}

/// Gap before each tick that went against the flow.
fn glitch_gaps(events: &[ScrollEvent], flow: ScrollDirection) -> Vec<u64> {
    events
        .windows(2)
        .filter(|pair| pair[1].direction != flow)
        .filter_map(|pair| pair[1].timestamp_ms.checked_sub(pair[0].timestamp_ms))
        .collect()
}

fn brake_findings(trials: &[BrakeTrial]) -> BrakeFindings {
    let mut findings = BrakeFindings::default();

    for trial in trials {
        let pre_stop: Vec<ScrollEvent> = trial
            .events
            .iter()
            .copied()
            .filter(|e| e.timestamp_ms <= trial.stop_at_ms)
            .collect();
        let Some(scroll) = dominant_direction(&pre_stop) else {
            continue;
        };

        let Some(last_index) = trial
            .events
            .iter()
            .rposition(|e| e.direction == scroll && e.timestamp_ms <= trial.stop_at_ms)
        else {
            continue;
        };
        let last = trial.events[last_index];

        for event in &trial.events[last_index + 1..] {
            if event.direction == scroll {
                continue;
            }
            if let Some(gap) = event.timestamp_ms.checked_sub(last.timestamp_ms) {
                findings.reversal_gaps.push(gap);
            }
        }

        let bounce = trial
            .events
            .iter()
            .find(|e| e.direction != scroll && e.timestamp_ms > trial.stop_at_ms);
        if let Some(bounce) = bounce {
            let after_stop = bounce.timestamp_ms - trial.stop_at_ms;
            findings.bounced_trials += 1;
            findings.worst_bounce_ms = findings.worst_bounce_ms.max(Some(after_stop));
        }
    }

    findings
}

/// Length of the run of new-direction ticks leading up to each confirmation.
/// Trials with no such tick are dropped.
fn reversal_runs(trials: &[ReversalTrial]) -> Vec<u64> {
    trials
        .iter()
        .map(|trial| {
            trial
                .events
                .iter()
                .filter(|e| e.timestamp_ms <= trial.confirmed_at_ms)
                .rev()
                .take_while(|e| e.direction == trial.reversed_to)
                .count() as u64
        })
        .filter(|&run| run > 0)
        .collect()
}
