//! Fire-and-forget diagnostics from the hook thread.
//!
//! Sinks must return immediately. The channel sink drops records when the
//! consumer falls behind rather than stall the hook.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

use wheelguard_scroll_model::{ScrollEvent, TimestampMs};

use crate::engine::{Reason, Verdict};
use crate::error::FilterFault;
use crate::resolver::ProfileKey;
use crate::session::ResetCause;

/// One diagnostic record.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticRecord {
    /// A tick was decided.
    Decision {
        event: ScrollEvent,
        profile: ProfileKey,
        verdict: Verdict,
    },
    /// The session went back to its initial state.
    SessionReset {
        cause: ResetCause,
        at_ms: TimestampMs,
    },
    /// An internal fault was caught and the tick passed.
    Fault {
        event: ScrollEvent,
        fault: FilterFault,
    },
}

/// Receiver of hook diagnostics.
pub trait DiagnosticsSink: Send {
    fn report(&self, record: DiagnosticRecord);

    /// Whether per-tick decision records are wanted. Resets and faults are
    /// always reported.
    fn wants_decisions(&self) -> bool {
        true
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl DiagnosticsSink for NullDiagnostics {
    fn report(&self, _record: DiagnosticRecord) {}

    fn wants_decisions(&self) -> bool {
        false
    }
}

/// Emits records as `tracing` events.
///
/// Routine decisions go out at `trace`; physics, strict and momentum-scaled
/// decisions at `debug`; faults at `error`. Subscribers may write
/// synchronously, so on the hook thread put this behind a
/// [`ChannelDiagnostics`] and report from the receiving thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn report(&self, record: DiagnosticRecord) {
        match record {
            DiagnosticRecord::Decision {
                event,
                profile,
                verdict,
            } => {
                let noteworthy = matches!(
                    verdict.reason,
                    Reason::PhysicsNoise
                        | Reason::StrictHold
                        | Reason::StrictMismatch
                        | Reason::StrictConfirmed
                        | Reason::Reversal
                );
                if noteworthy || verdict.threshold.is_some_and(|t| t > 1) {
                    tracing::debug!(
                        t = event.timestamp_ms,
                        dir = %event.direction,
                        %profile,
                        decision = ?verdict.decision,
                        reason = ?verdict.reason,
                        threshold = ?verdict.threshold,
                        "Scroll decision"
                    );
                } else {
                    tracing::trace!(
                        t = event.timestamp_ms,
                        dir = %event.direction,
                        decision = ?verdict.decision,
                        reason = ?verdict.reason,
                        "Scroll decision"
                    );
                }
            }
            DiagnosticRecord::SessionReset { cause, at_ms } => {
                tracing::debug!(?cause, t = at_ms, "Scroll session reset");
            }
            DiagnosticRecord::Fault { event, fault } => {
                tracing::error!(
                    t = event.timestamp_ms,
                    error = %fault,
                    "Scroll filter fault; passing event unfiltered"
                );
            }
        }
    }
}

/// Forwards records over a bounded channel to another thread.
#[derive(Debug)]
pub struct ChannelDiagnostics {
    tx: SyncSender<DiagnosticRecord>,
    decisions: bool,
    dropped: AtomicU64,
}

impl ChannelDiagnostics {
    /// Create a sink with room for `capacity` undelivered records.
    pub fn bounded(capacity: usize, decisions: bool) -> (Self, Receiver<DiagnosticRecord>) {
        let (tx, rx) = mpsc::sync_channel(capacity);
        (
            Self {
                tx,
                decisions,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Records lost because the channel was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl DiagnosticsSink for ChannelDiagnostics {
    fn report(&self, record: DiagnosticRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn wants_decisions(&self) -> bool {
        self.decisions
    }
}
