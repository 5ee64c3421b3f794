//! A subscriber whose writer stalls must not stall the hook thread.

use std::io;
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};

use tracing::Level;
use wheelguard_filter_core::{ConfigSet, Decision, SharedConfig, TracingDiagnostics};
use wheelguard_hook::diagnostics::{spawn_tracing_drain, DIAGNOSTICS_CAPACITY};
use wheelguard_hook::sources::StubSource;
use wheelguard_hook::{DecisionLog, HookRunner};
use wheelguard_scroll_model::{FilterConfig, ScrollEvent};

const WRITE_STALL: Duration = Duration::from_millis(50);

/// Writer that sleeps on every write, like a log file on a slow disk.
struct StallingWriter;

impl io::Write for StallingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        std::thread::sleep(WRITE_STALL);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn install_stalling_subscriber() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_writer(|| StallingWriter)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("no other global subscriber in this test binary");
    });
}

fn shared() -> Arc<SharedConfig> {
    SharedConfig::from_set(ConfigSet::from_config(FilterConfig {
        strict_mode: false,
        ..FilterConfig::default()
    }))
}

#[test]
fn test_direct_tracing_sink_stalls_with_the_writer() {
    install_stalling_subscriber();
    let mut runner = HookRunner::with_diagnostics(
        Box::new(StubSource::empty()),
        shared(),
        DecisionLog::new(),
        TracingDiagnostics,
    );

    let started = Instant::now();
    runner.handle(ScrollEvent::down(0)).unwrap();
    assert!(started.elapsed() >= WRITE_STALL);
}

#[test]
fn test_drained_diagnostics_keep_handle_fast() {
    install_stalling_subscriber();
    let (diagnostics, drain) = spawn_tracing_drain(DIAGNOSTICS_CAPACITY).unwrap();
    let mut runner = HookRunner::with_diagnostics(
        Box::new(StubSource::empty()),
        shared(),
        DecisionLog::new(),
        diagnostics,
    );

    let started = Instant::now();
    let first = runner.handle(ScrollEvent::down(0)).unwrap();
    let second = runner.handle(ScrollEvent::up(100)).unwrap();
    let elapsed = started.elapsed();

    assert_eq!((first, second), (Decision::Pass, Decision::Block));
    assert!(
        elapsed < WRITE_STALL / 2,
        "two ticks took {elapsed:?} behind a stalling writer"
    );
    assert_eq!(runner.filter().diagnostics().dropped(), 0);

    drop(runner);
    assert_eq!(drain.join(), 2);
}
