//! Replay a recorded wheel log through the filter.

use std::path::{Path, PathBuf};

use wheelguard_common::error::WheelguardResult;
use wheelguard_common::HookClock;
use wheelguard_filter_core::Decision;
use wheelguard_hook::diagnostics::{spawn_tracing_drain, DIAGNOSTICS_CAPACITY};
use wheelguard_hook::sources::ReplaySource;
use wheelguard_hook::writer::{log_header, EventWriter};
use wheelguard_hook::{DecisionLog, DecisionSink, HookRunner};
use wheelguard_scroll_model::ScrollEvent;

/// Keeps every decision and optionally writes the cleaned log.
struct ReplaySink {
    log: DecisionLog,
    filtered: Option<EventWriter>,
}

impl DecisionSink for ReplaySink {
    fn deliver(&mut self, event: &ScrollEvent, decision: Decision) -> WheelguardResult<()> {
        if let Some(filtered) = self.filtered.as_mut() {
            filtered.deliver(event, decision)?;
        }
        self.log.deliver(event, decision)
    }
}

pub async fn run(
    config_path: &Path,
    log: &Path,
    app: Option<String>,
    output: Option<PathBuf>,
    show_decisions: bool,
) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let shared = super::publish_filter_config(&config)?;

    let source = ReplaySource::from_file(log)
        .map_err(|e| anyhow::anyhow!("Failed to read wheel log {}: {e}", log.display()))?;
    let tick_count = source.remaining();

    let filtered = match output.as_ref() {
        Some(path) => {
            let header = log_header(
                "replay",
                Some(log.display().to_string()),
                &HookClock::start(),
            );
            Some(EventWriter::passed(path.clone(), &header)?)
        }
        None => None,
    };

    let sink = ReplaySink {
        log: DecisionLog::new(),
        filtered,
    };
    let (diagnostics, drain) = spawn_tracing_drain(DIAGNOSTICS_CAPACITY)?;
    let mut runner = HookRunner::with_diagnostics(Box::new(source), shared, sink, diagnostics);
    if let Some(app) = app.as_ref() {
        runner = runner.with_app(app.clone());
    }

    let stats = runner.run().await?;
    let profile = runner
        .filter()
        .active_profile()
        .map(|key| key.to_string())
        .unwrap_or_else(|| "global".to_string());
    let dropped = runner.filter().diagnostics().dropped();
    let sink = runner.into_sink();
    let logged = drain.join();
    tracing::debug!(logged, dropped, "Diagnostics drained");

    println!("Replayed {tick_count} ticks from {}", log.display());
    println!("  Profile:          {profile}");
    super::print_stats(&stats);

    if show_decisions {
        println!();
        for (event, decision) in &sink.log.entries {
            let verdict = match decision {
                Decision::Pass => "pass",
                Decision::Block => "BLOCK",
            };
            println!(
                "  {:>10} ms  {:<4}  {verdict}",
                event.timestamp_ms,
                event.direction.to_string()
            );
        }
    }

    if let (Some(path), Some(mut filtered)) = (output, sink.filtered) {
        filtered.flush()?;
        println!();
        println!(
            "Wrote {} passed ticks to {}",
            filtered.events_written(),
            path.display()
        );
    }

    Ok(())
}
