//! Wheelguard Hook
//!
//! Connects wheel event sources to the filter. Uses a pluggable source
//! architecture:
//!
//! - **Evdev:** REL_WHEEL events straight from `/dev/input` (Linux, needs the
//!   `input` group)
//! - **Replay:** a recorded JSONL wheel log
//! - **Stub:** preloaded events, for tests
//!
//! The same sources feed the calibration capture, which records raw ticks per
//! phase instead of filtering them.

pub mod capabilities;
pub mod capture;
pub mod diagnostics;
pub mod sources;
pub mod writer;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use wheelguard_common::error::WheelguardResult;
use wheelguard_filter_core::{
    Decision, DiagnosticsSink, FilterStats, HookFilter, NullDiagnostics, SharedConfig,
};
use wheelguard_scroll_model::ScrollEvent;

/// Idle wait between polls when a source has nothing queued.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Trait for wheel event sources.
pub trait WheelSource: Send {
    /// Poll for the next tick. Returns `None` if no tick is available.
    fn poll(&mut self) -> WheelguardResult<Option<ScrollEvent>>;

    /// Source name for logging.
    fn name(&self) -> &str;

    /// Check if the source can deliver events on this system.
    fn is_available(&self) -> bool;

    /// Device the source reads from, when it has one.
    fn device(&self) -> Option<&str> {
        None
    }

    /// Whether the source has ended for good (a finished replay).
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Receiver of filter decisions: forwards or suppresses the tick.
pub trait DecisionSink: Send {
    fn deliver(&mut self, event: &ScrollEvent, decision: Decision) -> WheelguardResult<()>;
}

/// Keeps every decision in memory.
#[derive(Debug, Default)]
pub struct DecisionLog {
    pub entries: Vec<(ScrollEvent, Decision)>,
}

impl DecisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks that were forwarded.
    pub fn passed(&self) -> impl Iterator<Item = &ScrollEvent> {
        self.entries
            .iter()
            .filter(|(_, decision)| *decision == Decision::Pass)
            .map(|(event, _)| event)
    }

    pub fn decisions(&self) -> Vec<Decision> {
        self.entries.iter().map(|(_, decision)| *decision).collect()
    }
}

impl DecisionSink for DecisionLog {
    fn deliver(&mut self, event: &ScrollEvent, decision: Decision) -> WheelguardResult<()> {
        self.entries.push((*event, decision));
        Ok(())
    }
}

/// The hook loop: source → filter → sink.
///
/// Diagnostics go to `D` on the calling thread; pair it with
/// [`diagnostics::spawn_tracing_drain`] to log them elsewhere.
pub struct HookRunner<S: DecisionSink, D: DiagnosticsSink = NullDiagnostics> {
    source: Box<dyn WheelSource>,
    filter: HookFilter<D>,
    sink: S,
    app_id: Option<String>,
    stop_flag: Arc<AtomicBool>,
}

impl<S: DecisionSink> HookRunner<S> {
    pub fn new(source: Box<dyn WheelSource>, shared: Arc<SharedConfig>, sink: S) -> Self {
        Self::with_diagnostics(source, shared, sink, NullDiagnostics)
    }
}

impl<S: DecisionSink, D: DiagnosticsSink> HookRunner<S, D> {
    pub fn with_diagnostics(
        source: Box<dyn WheelSource>,
        shared: Arc<SharedConfig>,
        sink: S,
        diagnostics: D,
    ) -> Self {
        Self {
            source,
            filter: HookFilter::with_diagnostics(shared, diagnostics),
            sink,
            app_id: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Decide every tick as if `app_id` were the foreground application.
    pub fn with_app(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// Decide one tick and hand it to the sink.
    pub fn handle(&mut self, event: ScrollEvent) -> WheelguardResult<Decision> {
        let decision = self.filter.on_event(event, self.app_id.as_deref());
        self.sink.deliver(&event, decision)?;
        Ok(decision)
    }

    /// Run until the stop flag is set or the source is exhausted.
    pub async fn run(&mut self) -> WheelguardResult<FilterStats> {
        tracing::info!(
            source = %self.source.name(),
            device = ?self.source.device(),
            app = ?self.app_id,
            "Hook started"
        );

        // Warn once per run of failed polls, not once per poll.
        let mut source_failing = false;
        while !self.stop_flag.load(Ordering::Relaxed) {
            match self.source.poll() {
                Ok(Some(event)) => {
                    source_failing = false;
                    self.handle(event)?;
                }
                Ok(None) if self.source.is_exhausted() => break,
                Ok(None) => {
                    source_failing = false;
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(e) => {
                    if !source_failing {
                        tracing::warn!(error = %e, "Wheel source error");
                        source_failing = true;
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }

        let stats = self.filter.stats();
        tracing::info!(
            passed = stats.passed,
            blocked_up = stats.blocked_up,
            blocked_down = stats.blocked_down,
            faults = stats.faults,
            "Hook stopped"
        );
        Ok(stats)
    }

    /// Set the stop flag.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Get the stop flag for external coordination.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    pub fn stats(&self) -> FilterStats {
        self.filter.stats()
    }

    pub fn filter(&self) -> &HookFilter<D> {
        &self.filter
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::StubSource;
    use wheelguard_filter_core::ConfigSet;
    use wheelguard_scroll_model::FilterConfig;

    fn shared(config: FilterConfig) -> Arc<SharedConfig> {
        SharedConfig::from_set(ConfigSet::from_config(config))
    }

    #[tokio::test]
    async fn test_runner_filters_stub_stream() {
        let config = FilterConfig {
            strict_mode: false,
            momentum_enabled: false,
            ..FilterConfig::default()
        };
        let events = vec![
            ScrollEvent::down(0),
            ScrollEvent::down(80),
            ScrollEvent::up(160),
            ScrollEvent::down(240),
        ];
        let mut runner = HookRunner::new(
            Box::new(StubSource::finite(events)),
            shared(config),
            DecisionLog::new(),
        );

        let stats = runner.run().await.unwrap();
        assert_eq!(stats.passed, 3);
        assert_eq!(stats.blocked_up, 1);
        assert_eq!(
            runner.sink().decisions(),
            vec![
                Decision::Pass,
                Decision::Pass,
                Decision::Block,
                Decision::Pass
            ]
        );
    }

    #[tokio::test]
    async fn test_stop_flag_ends_endless_source() {
        let mut runner = HookRunner::new(
            Box::new(StubSource::empty()),
            shared(FilterConfig::default()),
            DecisionLog::new(),
        );
        let stop = runner.stop_flag();
        stop.store(true, Ordering::SeqCst);
        let stats = runner.run().await.unwrap();
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn test_app_id_reaches_resolver() {
        let mut settings = wheelguard_scroll_model::FilterSettings::default();
        settings.blacklist_app("game");
        let shared = SharedConfig::from_set(ConfigSet::new(&settings));
        let mut runner =
            HookRunner::new(Box::new(StubSource::empty()), shared, DecisionLog::new())
                .with_app("game");

        runner.handle(ScrollEvent::up(0)).unwrap();
        runner.handle(ScrollEvent::up(1)).unwrap();
        assert_eq!(runner.stats().passed, 2);
        assert_eq!(runner.into_sink().passed().count(), 2);
    }
}
