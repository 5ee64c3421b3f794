//! Raw tick capture for calibration.
//!
//! Pumps a wheel source into a [`CalibrationRecorder`] (and optionally a raw
//! JSONL log) while a phase or trial runs. Setting the cancel flag abandons
//! the active phase; its partial data never reaches the sample set.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use wheelguard_calibration::CalibrationRecorder;
use wheelguard_common::error::{WheelguardError, WheelguardResult};
use wheelguard_common::HookClock;
use wheelguard_scroll_model::{CalibrationPhase, CalibrationSamples, TimestampMs};

use crate::writer::EventWriter;
use crate::{WheelSource, POLL_INTERVAL};

pub struct CalibrationCapture {
    source: Box<dyn WheelSource>,
    clock: HookClock,
    recorder: CalibrationRecorder,
    log: Option<EventWriter>,
    cancel: Arc<AtomicBool>,
    ticks_seen: u64,
}

impl CalibrationCapture {
    pub fn new(source: Box<dyn WheelSource>, clock: HookClock) -> Self {
        Self {
            source,
            clock,
            recorder: CalibrationRecorder::new(),
            log: None,
            cancel: Arc::new(AtomicBool::new(false)),
            ticks_seen: 0,
        }
    }

    /// Continue into an existing sample set.
    pub fn with_samples(mut self, samples: CalibrationSamples) -> Self {
        self.recorder = CalibrationRecorder::with_samples(samples);
        self
    }

    /// Also write every captured tick to a raw log.
    pub fn with_log(mut self, log: EventWriter) -> Self {
        self.log = Some(log);
        self
    }

    /// Flag that cancels the active phase when set.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Current time on the capture clock, for stop and confirmation marks.
    pub fn now_ms(&self) -> TimestampMs {
        self.clock.now_ms()
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn ticks_seen(&self) -> u64 {
        self.ticks_seen
    }

    pub fn recorder(&self) -> &CalibrationRecorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut CalibrationRecorder {
        &mut self.recorder
    }

    pub fn into_samples(self) -> CalibrationSamples {
        self.recorder.into_samples()
    }

    /// Start a phase, dropping ticks that queued up before it.
    pub fn begin_phase(&mut self, phase: CalibrationPhase) -> WheelguardResult<()> {
        if self.is_cancelled() {
            return Err(WheelguardError::cancelled("calibration was cancelled"));
        }
        self.discard_queued()?;
        self.recorder.begin_phase(phase)
    }

    /// Open a trial, dropping ticks that queued up between trials.
    pub fn begin_trial(&mut self) -> WheelguardResult<()> {
        self.discard_queued()?;
        self.recorder.begin_trial()
    }

    /// Capture for a fixed time. Returns `false` if the phase was cancelled.
    pub async fn capture_for(&mut self, duration: Duration) -> WheelguardResult<bool> {
        Ok(self
            .capture_until(tokio::time::sleep(duration))
            .await?
            .is_some())
    }

    /// Capture until `until` completes. Returns its output, or `None` if the
    /// phase was cancelled first.
    pub async fn capture_until<F: Future>(&mut self, until: F) -> WheelguardResult<Option<F::Output>> {
        tokio::pin!(until);
        loop {
            if self.is_cancelled() {
                self.recorder.cancel_phase();
                return Ok(None);
            }
            self.drain()?;
            tokio::select! {
                output = &mut until => {
                    self.drain()?;
                    return Ok(Some(output));
                }
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }

    fn drain(&mut self) -> WheelguardResult<()> {
        loop {
            match self.source.poll() {
                Ok(Some(event)) => {
                    self.ticks_seen += 1;
                    if let Some(log) = self.log.as_mut() {
                        log.write_event(&event)?;
                    }
                    if let Err(e) = self.recorder.record(event) {
                        tracing::trace!(error = %e, "Tick outside a trial dropped");
                    }
                }
                Ok(None) => return Ok(()),
                Err(e) => {
                    tracing::warn!(error = %e, "Wheel source error");
                    return Ok(());
                }
            }
        }
    }

    fn discard_queued(&mut self) -> WheelguardResult<()> {
        let mut discarded = 0usize;
        while let Some(event) = self.source.poll()? {
            if let Some(log) = self.log.as_mut() {
                log.write_event(&event)?;
            }
            discarded += 1;
        }
        if discarded > 0 {
            tracing::debug!(discarded, "Dropped ticks queued before capture");
        }
        Ok(())
    }
}
