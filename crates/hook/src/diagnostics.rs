//! Off-thread logging of filter diagnostics.
//!
//! The hook thread only `try_send`s records into a bounded channel; a drain
//! thread turns them into `tracing` events, so a slow log writer can never
//! hold up a tick.

use std::thread::JoinHandle;

use wheelguard_common::error::{WheelguardError, WheelguardResult};
use wheelguard_filter_core::{ChannelDiagnostics, DiagnosticsSink, TracingDiagnostics};

/// Default number of undelivered records before new ones are dropped.
pub const DIAGNOSTICS_CAPACITY: usize = 1024;

/// The thread forwarding hook diagnostics to `tracing`.
pub struct DiagnosticsDrain {
    handle: JoinHandle<u64>,
}

impl DiagnosticsDrain {
    /// Wait for the drain to finish and return how many records it logged.
    ///
    /// The drain ends once the paired [`ChannelDiagnostics`] is dropped, so
    /// drop the runner owning it first.
    pub fn join(self) -> u64 {
        self.handle.join().unwrap_or(0)
    }
}

/// Create a channel sink for the hook thread and start its drain.
pub fn spawn_tracing_drain(
    capacity: usize,
) -> WheelguardResult<(ChannelDiagnostics, DiagnosticsDrain)> {
    let (sink, rx) = ChannelDiagnostics::bounded(capacity, true);
    let handle = std::thread::Builder::new()
        .name("wheelguard-diagnostics".to_string())
        .spawn(move || {
            let mut forwarded = 0u64;
            for record in rx {
                TracingDiagnostics.report(record);
                forwarded += 1;
            }
            forwarded
        })
        .map_err(|e| WheelguardError::hook(format!("failed to start diagnostics thread: {e}")))?;
    Ok((sink, DiagnosticsDrain { handle }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::StubSource;
    use crate::{DecisionLog, HookRunner};
    use wheelguard_filter_core::{ConfigSet, SharedConfig};
    use wheelguard_scroll_model::{FilterConfig, ScrollEvent};

    #[test]
    fn test_drain_forwards_every_record_after_runner_drops() {
        let config = FilterConfig {
            strict_mode: false,
            ..FilterConfig::default()
        };
        let shared = SharedConfig::from_set(ConfigSet::from_config(config));
        let (diagnostics, drain) = spawn_tracing_drain(DIAGNOSTICS_CAPACITY).unwrap();
        let mut runner = HookRunner::with_diagnostics(
            Box::new(StubSource::empty()),
            shared,
            DecisionLog::new(),
            diagnostics,
        );

        runner.handle(ScrollEvent::down(0)).unwrap();
        runner.handle(ScrollEvent::up(100)).unwrap();
        runner.handle(ScrollEvent::down(1_000)).unwrap();
        assert_eq!(runner.filter().diagnostics().dropped(), 0);
        drop(runner);

        // Two decisions, an idle reset, and the decision after it.
        assert_eq!(drain.join(), 4);
    }
}
