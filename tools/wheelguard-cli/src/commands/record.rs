//! Guided calibration recording.
//!
//! Walks the user through the flow, sprint, brake and precision phases and
//! saves the samples after each completed phase. Ctrl+C abandons the phase in
//! progress; phases finished earlier stay saved.

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use wheelguard_common::{CalibrationDefaults, HookClock};
use wheelguard_hook::capture::CalibrationCapture;
use wheelguard_hook::sources::detect_best_source;
use wheelguard_hook::writer::{log_header, EventWriter};
use wheelguard_scroll_model::{CalibrationPhase, CalibrationSamples, ScrollDirection};

/// How long ticks are still captured after the stop signal.
const BRAKE_TAIL: Duration = Duration::from_millis(1_500);

pub async fn run(
    config_path: &Path,
    phase: Option<CalibrationPhase>,
    samples_path: &Path,
    log: Option<PathBuf>,
    device: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let defaults = config.calibration;

    let clock = HookClock::start();
    let source = detect_best_source(&clock, device.as_deref());
    if source.name() == "stub" {
        anyhow::bail!("No wheel device available; run `wheelguard check` for details");
    }
    println!(
        "Recording from {}",
        source.device().unwrap_or(source.name())
    );

    let existing = load_samples(samples_path)?;
    let mut capture = CalibrationCapture::new(source, clock.clone()).with_samples(existing);
    if let Some(log) = log {
        let header = log_header(capture.source_name(), None, &clock);
        capture = capture.with_log(EventWriter::raw(log, &header)?);
    }

    let cancel = capture.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let phases = match phase {
        Some(phase) => vec![phase],
        None => CalibrationPhase::ALL.to_vec(),
    };

    for phase in phases {
        println!();
        let completed = match phase {
            CalibrationPhase::Flow => {
                println!(
                    "[flow] Scroll DOWN slowly and steadily, one notch at a time, for {}s.",
                    defaults.flow_secs
                );
                stream_phase(&mut capture, phase, Duration::from_secs(defaults.flow_secs)).await?
            }
            CalibrationPhase::Sprint => {
                println!(
                    "[sprint] Scroll DOWN as fast as you can for {}s.",
                    defaults.sprint_secs
                );
                stream_phase(&mut capture, phase, Duration::from_secs(defaults.sprint_secs))
                    .await?
            }
            CalibrationPhase::Brake => brake_phase(&mut capture, &defaults).await?,
            CalibrationPhase::Precision => {
                precision_phase(&mut capture, &defaults, &mut stdin).await?
            }
        };

        if !completed {
            println!("Cancelled: partial {phase} data discarded.");
            break;
        }
        save_samples(samples_path, capture.recorder().samples())?;
        println!(
            "[{phase}] done: {} recorded, saved to {}",
            capture.recorder().samples().recorded(phase),
            samples_path.display()
        );
    }

    println!();
    println!(
        "Captured {} ticks. Next: wheelguard calibrate {}",
        capture.ticks_seen(),
        samples_path.display()
    );
    Ok(())
}

async fn stream_phase(
    capture: &mut CalibrationCapture,
    phase: CalibrationPhase,
    duration: Duration,
) -> anyhow::Result<bool> {
    capture.begin_phase(phase)?;
    if !capture.capture_for(duration).await? {
        return Ok(false);
    }
    capture.recorder_mut().finish_phase()?;
    Ok(true)
}

async fn brake_phase(
    capture: &mut CalibrationCapture,
    defaults: &CalibrationDefaults,
) -> anyhow::Result<bool> {
    println!("[brake] Scroll DOWN fast. When STOP appears, take your finger off the wheel.");
    capture.begin_phase(CalibrationPhase::Brake)?;

    for trial in 1..=defaults.trials {
        println!("  Trial {trial}/{}: scroll now...", defaults.trials);
        capture.begin_trial()?;

        let delay = stop_delay(capture.now_ms(), trial, defaults.trial_secs);
        if !capture.capture_for(delay).await? {
            return Ok(false);
        }
        let stop_at = capture.now_ms();
        capture.recorder_mut().mark_stop(stop_at)?;
        println!("  STOP!");

        if !capture.capture_for(BRAKE_TAIL).await? {
            return Ok(false);
        }
        capture.recorder_mut().end_trial()?;
    }

    capture.recorder_mut().finish_phase()?;
    Ok(true)
}

/// Time until the stop signal: varies between trials so it can't be
/// anticipated, and stays inside the trial length.
fn stop_delay(now_ms: u64, trial: usize, trial_secs: u64) -> Duration {
    let window_ms = (trial_secs * 1_000).saturating_sub(BRAKE_TAIL.as_millis() as u64);
    let base_ms = 1_500.min(window_ms);
    let spread_ms = window_ms.saturating_sub(base_ms).clamp(1, 1_000);
    let jitter = now_ms.wrapping_mul(7_919).wrapping_add(trial as u64 * 331) % spread_ms;
    Duration::from_millis(base_ms + jitter)
}

async fn precision_phase(
    capture: &mut CalibrationCapture,
    defaults: &CalibrationDefaults,
    stdin: &mut Lines<BufReader<Stdin>>,
) -> anyhow::Result<bool> {
    println!("[precision] Scroll slowly, then reverse direction one notch at a time.");
    println!("  Press Enter as soon as the page starts moving the new way.");
    capture.begin_phase(CalibrationPhase::Precision)?;

    for trial in 1..=defaults.trials {
        let reversed_to = if trial % 2 == 1 {
            ScrollDirection::Up
        } else {
            ScrollDirection::Down
        };
        println!(
            "  Trial {trial}/{}: scroll {} a few notches, then reverse {reversed_to}.",
            defaults.trials,
            reversed_to.reversed()
        );
        capture.begin_trial()?;

        match capture.capture_until(stdin.next_line()).await? {
            None => return Ok(false),
            Some(line) => {
                line?;
            }
        }
        let confirmed_at = capture.now_ms();
        capture
            .recorder_mut()
            .confirm_reversal(reversed_to, confirmed_at)?;
        capture.recorder_mut().end_trial()?;
    }

    capture.recorder_mut().finish_phase()?;
    Ok(true)
}

fn load_samples(path: &Path) -> anyhow::Result<CalibrationSamples> {
    if !path.exists() {
        return Ok(CalibrationSamples::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse samples {}: {e}", path.display()))
}

fn save_samples(path: &Path, samples: &CalibrationSamples) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(samples)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_delay_leaves_room_for_the_tail() {
        for now in [0, 17, 9_999, 123_456] {
            for trial in 1..=5 {
                let delay = stop_delay(now, trial, 4);
                assert!(delay >= Duration::from_millis(1_500));
                assert!(delay + BRAKE_TAIL <= Duration::from_secs(4));
            }
        }
    }

    #[test]
    fn test_stop_delay_short_trials() {
        assert_eq!(stop_delay(5, 1, 1), Duration::from_millis(0));
    }
}
