//! The scroll filter state machine.
//!
//! # Algorithm
//!
//! For every tick, in order:
//!
//! 1. **Bypass:** a disabled snapshot passes everything and touches nothing.
//! 2. **Session boundary:** a gap strictly longer than the block interval, or a
//!    timestamp older than the previous tick, starts a fresh session.
//! 3. **Physics check:** a reversal faster than `physics_check_ms` is noise.
//!    It is blocked without touching the session at all.
//! 4. **Strict mode:** the first tick of a session is held until a second
//!    tick in the same direction confirms it.
//! 5. **Establish / continue:** the first trusted tick sets the direction;
//!    same-direction ticks pass and clear the opposite count.
//! 6. **Reversal:** opposite ticks are blocked until the momentum-scaled
//!    threshold is reached, at which point the direction flips and the tick
//!    passes.

use serde::Serialize;
use wheelguard_scroll_model::{FilterConfig, ScrollEvent};

use crate::momentum;
use crate::session::{ResetCause, SessionState};

/// What the hook should do with the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Forward the tick to the next hook.
    Pass,
    /// Swallow the tick.
    Block,
}

/// Which rule produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// Filtering is disabled for the active profile.
    Disabled,
    /// First trusted tick of a session.
    Established,
    /// Second tick confirmed the held strict-mode tick.
    StrictConfirmed,
    /// Tick continues the established direction.
    SameDirection,
    /// Enough opposite ticks arrived to flip the direction.
    Reversal,
    /// Opposite tick within tolerance of the threshold.
    Jitter,
    /// Reversal faster than the physics check allows.
    PhysicsNoise,
    /// First tick of a strict session, held for confirmation.
    StrictHold,
    /// Second tick disagreed with the held tick; the new one is held instead.
    StrictMismatch,
    /// Internal fault; passed unfiltered.
    FailOpen,
}

/// Full outcome of one step, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub decision: Decision,
    pub reason: Reason,
    /// Set when the tick started a new session.
    pub reset: Option<ResetCause>,
    /// Threshold used for an opposite tick, when one was evaluated.
    pub threshold: Option<u32>,
}

impl Verdict {
    fn pass(reason: Reason) -> Self {
        Self {
            decision: Decision::Pass,
            reason,
            reset: None,
            threshold: None,
        }
    }

    fn block(reason: Reason) -> Self {
        Self {
            decision: Decision::Block,
            reason,
            reset: None,
            threshold: None,
        }
    }

    pub(crate) fn fail_open() -> Self {
        Self::pass(Reason::FailOpen)
    }

    fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Whether the momentum estimator raised the threshold for this tick.
    pub fn momentum_scaled(&self, config: &FilterConfig) -> bool {
        self.threshold
            .is_some_and(|t| t > config.effective_base_threshold())
    }
}

/// Decide a tick without mutating the caller's state.
///
/// Returns the decision and the successor state.
pub fn decide(
    event: &ScrollEvent,
    config: &FilterConfig,
    state: &SessionState,
) -> (Decision, SessionState) {
    let mut next = *state;
    let verdict = step(&mut next, event, config);
    (verdict.decision, next)
}

/// Decide a tick, updating `state` in place.
pub fn step(state: &mut SessionState, event: &ScrollEvent, config: &FilterConfig) -> Verdict {
    if !config.enabled {
        return Verdict::pass(Reason::Disabled);
    }

    let mut reset = None;
    if let Some(last) = state.last_event_ms {
        match event.timestamp_ms.checked_sub(last) {
            None => {
                state.reset();
                reset = Some(ResetCause::ClockAnomaly);
            }
            Some(elapsed) if elapsed > config.block_interval_ms => {
                state.reset();
                reset = Some(ResetCause::Idle);
            }
            Some(elapsed) => {
                let is_reversal =
                    state.established_direction == Some(event.direction.reversed());
                if is_reversal
                    && config.physics_check_ms > 0
                    && elapsed < config.physics_check_ms
                {
                    return Verdict::block(Reason::PhysicsNoise);
                }
            }
        }
    }

    let mut verdict = classify(state, event, config);
    state.record(event.timestamp_ms);
    verdict.reset = reset;
    verdict
}

fn classify(state: &mut SessionState, event: &ScrollEvent, config: &FilterConfig) -> Verdict {
    let mut confirmed = false;

    if !config.strict_mode {
        state.pending_strict = None;
    } else if state.established_direction.is_none() {
        match state.pending_strict.take() {
            None => {
                state.pending_strict = Some(*event);
                return Verdict::block(Reason::StrictHold);
            }
            Some(pending) if pending.direction == event.direction => confirmed = true,
            Some(_) => {
                state.pending_strict = Some(*event);
                return Verdict::block(Reason::StrictMismatch);
            }
        }
    }

    let Some(established) = state.established_direction else {
        state.established_direction = Some(event.direction);
        state.consecutive_opposite = 0;
        return Verdict::pass(if confirmed {
            Reason::StrictConfirmed
        } else {
            Reason::Established
        });
    };

    if event.direction == established {
        state.consecutive_opposite = 0;
        return Verdict::pass(Reason::SameDirection);
    }

    let threshold = momentum::effective_threshold(config, state);
    state.consecutive_opposite = state.consecutive_opposite.saturating_add(1);
    if state.consecutive_opposite < threshold {
        return Verdict::block(Reason::Jitter).with_threshold(threshold);
    }

    state.established_direction = Some(event.direction);
    state.consecutive_opposite = 0;
    Verdict::pass(Reason::Reversal).with_threshold(threshold)
}
