//! The fail-open boundary the hook calls into.
//!
//! Every tick goes through [`HookFilter::on_event`], which reads the shared
//! configuration once, applies pending resets, runs the engine, and converts
//! any fault or panic into `Pass` plus a diagnostic record.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use wheelguard_scroll_model::{ScrollDirection, ScrollEvent};

use crate::diagnostics::{DiagnosticRecord, DiagnosticsSink, NullDiagnostics};
use crate::engine::{self, Decision, Reason, Verdict};
use crate::error::FilterFault;
use crate::resolver::ProfileKey;
use crate::session::{ResetCause, SessionState};
use crate::shared::SharedConfig;

/// Running totals kept by the hook filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub passed: u64,
    pub blocked_up: u64,
    pub blocked_down: u64,
    pub physics_discards: u64,
    pub session_resets: u64,
    pub faults: u64,
}

impl FilterStats {
    pub fn blocked(&self) -> u64 {
        self.blocked_up + self.blocked_down
    }

    pub fn total(&self) -> u64 {
        self.passed + self.blocked()
    }
}

/// Hook-thread owner of the session state.
pub struct HookFilter<D: DiagnosticsSink = NullDiagnostics> {
    shared: Arc<SharedConfig>,
    session: SessionState,
    generation: u64,
    profile: Option<ProfileKey>,
    diagnostics: D,
    stats: FilterStats,
}

impl HookFilter<NullDiagnostics> {
    /// A filter that reports nothing.
    pub fn new(shared: Arc<SharedConfig>) -> Self {
        Self::with_diagnostics(shared, NullDiagnostics)
    }
}

impl<D: DiagnosticsSink> HookFilter<D> {
    pub fn with_diagnostics(shared: Arc<SharedConfig>, diagnostics: D) -> Self {
        let generation = shared.snapshot().generation();
        Self {
            shared,
            session: SessionState::new(),
            generation,
            profile: None,
            diagnostics,
            stats: FilterStats::default(),
        }
    }

    /// Decide one tick for the given foreground application.
    ///
    /// Never panics and never fails: internal faults pass the tick.
    pub fn on_event(&mut self, event: ScrollEvent, app_id: Option<&str>) -> Decision {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.try_decide(&event, app_id)));
        let verdict = match outcome {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(fault)) => self.fail_open(event, fault),
            Err(payload) => self.fail_open(event, FilterFault::Panic(panic_message(&*payload))),
        };
        self.count(&event, &verdict);
        verdict.decision
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn stats(&self) -> FilterStats {
        self.stats
    }

    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    pub fn shared(&self) -> &Arc<SharedConfig> {
        &self.shared
    }

    /// Profile the last tick was decided under.
    pub fn active_profile(&self) -> Option<&ProfileKey> {
        self.profile.as_ref()
    }

    fn try_decide(
        &mut self,
        event: &ScrollEvent,
        app_id: Option<&str>,
    ) -> Result<Verdict, FilterFault> {
        let snapshot = self.shared.snapshot();

        if snapshot.generation() != self.generation {
            self.generation = snapshot.generation();
            self.reset_session(ResetCause::ConfigReloaded, event);
        }
        if self.shared.take_reset_request() {
            self.reset_session(ResetCause::HostRequest, event);
        }

        let resolved = snapshot.resolver().resolve(app_id);
        if self.profile.as_ref() != Some(&resolved.key) {
            if self.profile.is_some() {
                self.reset_session(ResetCause::ProfileChanged, event);
            }
            self.profile = Some(resolved.key.clone());
        }

        self.session.check_invariants()?;
        let verdict = engine::step(&mut self.session, event, &resolved.config);

        if let Some(cause) = verdict.reset {
            self.stats.session_resets += 1;
            self.diagnostics.report(DiagnosticRecord::SessionReset {
                cause,
                at_ms: event.timestamp_ms,
            });
        }
        if self.diagnostics.wants_decisions() {
            self.diagnostics.report(DiagnosticRecord::Decision {
                event: *event,
                profile: resolved.key,
                verdict,
            });
        }

        Ok(verdict)
    }

    fn reset_session(&mut self, cause: ResetCause, event: &ScrollEvent) {
        if self.session.is_fresh() {
            return;
        }
        self.session.reset();
        self.stats.session_resets += 1;
        self.diagnostics.report(DiagnosticRecord::SessionReset {
            cause,
            at_ms: event.timestamp_ms,
        });
    }

    fn fail_open(&mut self, event: ScrollEvent, fault: FilterFault) -> Verdict {
        self.stats.faults += 1;
        self.diagnostics
            .report(DiagnosticRecord::Fault { event, fault });
        self.reset_session(ResetCause::Fault, &event);
        Verdict::fail_open()
    }

    fn count(&mut self, event: &ScrollEvent, verdict: &Verdict) {
        match verdict.decision {
            Decision::Pass => self.stats.passed += 1,
            Decision::Block => match event.direction {
                ScrollDirection::Up => self.stats.blocked_up += 1,
                ScrollDirection::Down => self.stats.blocked_down += 1,
            },
        }
        if verdict.reason == Reason::PhysicsNoise {
            self.stats.physics_discards += 1;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
