//! Per-phase sample collection.
//!
//! Ticks are buffered while a phase runs and only committed to the sample set
//! when the phase finishes. Cancelling a phase (or an individual trial)
//! discards everything captured for it.

use wheelguard_common::error::{WheelguardError, WheelguardResult};
use wheelguard_scroll_model::{
    BrakeTrial, CalibrationPhase, CalibrationSamples, ReversalTrial, ScrollDirection, ScrollEvent,
    TimestampMs,
};

#[derive(Debug, Clone, Default)]
struct OpenTrial {
    events: Vec<ScrollEvent>,
    stop_at_ms: Option<TimestampMs>,
    reversal: Option<(ScrollDirection, TimestampMs)>,
}

#[derive(Debug, Clone)]
enum PhaseBuffer {
    Stream(Vec<ScrollEvent>),
    Brake {
        trials: Vec<BrakeTrial>,
        open: Option<OpenTrial>,
    },
    Precision {
        trials: Vec<ReversalTrial>,
        open: Option<OpenTrial>,
    },
}

impl PhaseBuffer {
    fn for_phase(phase: CalibrationPhase) -> Self {
        match phase {
            CalibrationPhase::Flow | CalibrationPhase::Sprint => Self::Stream(Vec::new()),
            CalibrationPhase::Brake => Self::Brake {
                trials: Vec::new(),
                open: None,
            },
            CalibrationPhase::Precision => Self::Precision {
                trials: Vec::new(),
                open: None,
            },
        }
    }

    fn open_trial(&mut self) -> Option<&mut Option<OpenTrial>> {
        match self {
            Self::Stream(_) => None,
            Self::Brake { open, .. } | Self::Precision { open, .. } => Some(open),
        }
    }
}

/// Collects calibration samples phase by phase.
#[derive(Debug, Default)]
pub struct CalibrationRecorder {
    samples: CalibrationSamples,
    active: Option<(CalibrationPhase, PhaseBuffer)>,
}

impl CalibrationRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue from previously committed samples.
    pub fn with_samples(samples: CalibrationSamples) -> Self {
        Self {
            samples,
            active: None,
        }
    }

    /// Phase currently being recorded.
    pub fn active_phase(&self) -> Option<CalibrationPhase> {
        self.active.as_ref().map(|(phase, _)| *phase)
    }

    /// Samples committed so far.
    pub fn samples(&self) -> &CalibrationSamples {
        &self.samples
    }

    pub fn into_samples(self) -> CalibrationSamples {
        self.samples
    }

    /// Start recording a phase. Fails if another phase is still open.
    pub fn begin_phase(&mut self, phase: CalibrationPhase) -> WheelguardResult<()> {
        if let Some(active) = self.active_phase() {
            return Err(WheelguardError::calibration(format!(
                "cannot begin {phase}: phase {active} is still recording"
            )));
        }
        tracing::info!(%phase, "Calibration phase started");
        self.active = Some((phase, PhaseBuffer::for_phase(phase)));
        Ok(())
    }

    /// Open a trial within a brake or precision phase.
    pub fn begin_trial(&mut self) -> WheelguardResult<()> {
        let (phase, buffer) = self.active_mut()?;
        let open = buffer.open_trial().ok_or_else(|| {
            WheelguardError::calibration(format!("phase {phase} does not use trials"))
        })?;
        if open.is_some() {
            return Err(WheelguardError::calibration("a trial is already open"));
        }
        *open = Some(OpenTrial::default());
        Ok(())
    }

    /// Append one tick to the active phase, or to its open trial.
    pub fn record(&mut self, event: ScrollEvent) -> WheelguardResult<()> {
        let (phase, buffer) = self.active_mut()?;
        match buffer {
            PhaseBuffer::Stream(events) => events.push(event),
            PhaseBuffer::Brake { open, .. } | PhaseBuffer::Precision { open, .. } => {
                let trial = open.as_mut().ok_or_else(|| {
                    WheelguardError::calibration(format!("no open trial in phase {phase}"))
                })?;
                trial.events.push(event);
            }
        }
        Ok(())
    }

    /// Mark when the stop signal was shown in the open brake trial.
    pub fn mark_stop(&mut self, at_ms: TimestampMs) -> WheelguardResult<()> {
        let (_, buffer) = self.active_mut()?;
        match buffer {
            PhaseBuffer::Brake {
                open: Some(trial), ..
            } => {
                trial.stop_at_ms = Some(at_ms);
                Ok(())
            }
            _ => Err(WheelguardError::calibration(
                "stop marks need an open brake trial",
            )),
        }
    }

    /// Mark the user's confirmation of an intentional reversal in the open
    /// precision trial.
    pub fn confirm_reversal(
        &mut self,
        reversed_to: ScrollDirection,
        at_ms: TimestampMs,
    ) -> WheelguardResult<()> {
        let (_, buffer) = self.active_mut()?;
        match buffer {
            PhaseBuffer::Precision {
                open: Some(trial), ..
            } => {
                trial.reversal = Some((reversed_to, at_ms));
                Ok(())
            }
            _ => Err(WheelguardError::calibration(
                "reversal confirmations need an open precision trial",
            )),
        }
    }

    /// Close the open trial. The trial must carry its stop or confirmation
    /// mark.
    pub fn end_trial(&mut self) -> WheelguardResult<()> {
        let (phase, buffer) = self.active_mut()?;
        match buffer {
            PhaseBuffer::Brake { trials, open } => {
                let trial = open.take().ok_or_else(no_open_trial)?;
                let Some(stop_at_ms) = trial.stop_at_ms else {
                    *open = Some(trial);
                    return Err(WheelguardError::calibration(
                        "brake trial has no stop mark",
                    ));
                };
                trials.push(BrakeTrial {
                    stop_at_ms,
                    events: trial.events,
                });
            }
            PhaseBuffer::Precision { trials, open } => {
                let trial = open.take().ok_or_else(no_open_trial)?;
                let Some((reversed_to, confirmed_at_ms)) = trial.reversal else {
                    *open = Some(trial);
                    return Err(WheelguardError::calibration(
                        "precision trial has no confirmed reversal",
                    ));
                };
                trials.push(ReversalTrial {
                    reversed_to,
                    confirmed_at_ms,
                    events: trial.events,
                });
            }
            PhaseBuffer::Stream(_) => {
                return Err(WheelguardError::calibration(format!(
                    "phase {phase} does not use trials"
                )));
            }
        }
        Ok(())
    }

    /// Drop the open trial without affecting the trials already closed.
    pub fn cancel_trial(&mut self) {
        if let Some((_, buffer)) = self.active.as_mut() {
            if let Some(open) = buffer.open_trial() {
                *open = None;
            }
        }
    }

    /// Commit the active phase, replacing any earlier recording of it.
    ///
    /// Returns the number of ticks or trials committed.
    pub fn finish_phase(&mut self) -> WheelguardResult<usize> {
        let Some((phase, buffer)) = self.active.take() else {
            return Err(WheelguardError::calibration("no phase is recording"));
        };

        let committed = match buffer {
            PhaseBuffer::Stream(events) => {
                let count = events.len();
                match phase {
                    CalibrationPhase::Sprint => self.samples.sprint = events,
                    _ => self.samples.flow = events,
                }
                count
            }
            PhaseBuffer::Brake { trials, open } => {
                if open.is_some() {
                    self.active = Some((phase, PhaseBuffer::Brake { trials, open }));
                    return Err(WheelguardError::calibration(
                        "close or cancel the open trial first",
                    ));
                }
                let count = trials.len();
                self.samples.brake = trials;
                count
            }
            PhaseBuffer::Precision { trials, open } => {
                if open.is_some() {
                    self.active = Some((phase, PhaseBuffer::Precision { trials, open }));
                    return Err(WheelguardError::calibration(
                        "close or cancel the open trial first",
                    ));
                }
                let count = trials.len();
                self.samples.precision = trials;
                count
            }
        };

        tracing::info!(%phase, committed, "Calibration phase finished");
        Ok(committed)
    }

    /// Abandon the active phase. Earlier samples for the phase are kept.
    pub fn cancel_phase(&mut self) -> Option<CalibrationPhase> {
        let (phase, _) = self.active.take()?;
        tracing::info!(%phase, "Calibration phase cancelled; partial data discarded");
        Some(phase)
    }

    fn active_mut(&mut self) -> WheelguardResult<(CalibrationPhase, &mut PhaseBuffer)> {
        match self.active.as_mut() {
            Some((phase, buffer)) => Ok((*phase, buffer)),
            None => Err(WheelguardError::calibration("no phase is recording")),
        }
    }
}

fn no_open_trial() -> WheelguardError {
    WheelguardError::calibration("no open trial")
}
