//! Live dry run: filter the real wheel and print what would be blocked.

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Duration;

use wheelguard_common::error::WheelguardResult;
use wheelguard_common::HookClock;
use wheelguard_filter_core::Decision;
use wheelguard_hook::diagnostics::{spawn_tracing_drain, DIAGNOSTICS_CAPACITY};
use wheelguard_hook::sources::detect_best_source;
use wheelguard_hook::{DecisionSink, HookRunner};
use wheelguard_scroll_model::ScrollEvent;

/// Prints every decision as it happens.
struct PrintSink {
    last_ms: Option<u64>,
}

impl DecisionSink for PrintSink {
    fn deliver(&mut self, event: &ScrollEvent, decision: Decision) -> WheelguardResult<()> {
        let gap = self
            .last_ms
            .map(|last| format!("+{}ms", event.timestamp_ms.saturating_sub(last)))
            .unwrap_or_else(|| "-".to_string());
        self.last_ms = Some(event.timestamp_ms);
        let verdict = match decision {
            Decision::Pass => "pass",
            Decision::Block => "BLOCK",
        };
        println!("  {:<4} {gap:>8}  {verdict}", event.direction.to_string());
        Ok(())
    }
}

pub async fn run(
    config_path: &Path,
    device: Option<PathBuf>,
    app: Option<String>,
    duration: Option<u64>,
) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let shared = super::publish_filter_config(&config)?;

    let clock = HookClock::start();
    let source = detect_best_source(&clock, device.as_deref());
    if source.name() == "stub" {
        anyhow::bail!("No wheel device available; run `wheelguard check` for details");
    }
    println!(
        "Monitoring {} (dry run, nothing is suppressed). Press Ctrl+C to stop.",
        source.device().unwrap_or(source.name())
    );

    let (diagnostics, drain) = spawn_tracing_drain(DIAGNOSTICS_CAPACITY)?;
    let mut runner =
        HookRunner::with_diagnostics(source, shared, PrintSink { last_ms: None }, diagnostics);
    if let Some(app) = app {
        runner = runner.with_app(app);
    }

    let stop = runner.stop_flag();
    tokio::spawn(async move {
        match duration {
            Some(secs) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                }
            }
            None => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
        stop.store(true, Ordering::SeqCst);
    });

    let stats = runner.run().await?;
    let dropped = runner.filter().diagnostics().dropped();
    drop(runner);
    let logged = drain.join();
    tracing::debug!(logged, dropped, "Diagnostics drained");

    println!();
    println!("Monitor summary:");
    super::print_stats(&stats);
    Ok(())
}
