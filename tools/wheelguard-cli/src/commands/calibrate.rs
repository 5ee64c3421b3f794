//! Derive filter parameters from recorded calibration samples.

use std::path::Path;

use wheelguard_calibration::{analyze, CalibrationReport, Parameter, Provenance};
use wheelguard_scroll_model::{CalibrationSamples, FilterConfig};

pub fn run(
    config_path: &Path,
    samples_path: &Path,
    apply: bool,
    profile: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(samples_path)
        .map_err(|e| anyhow::anyhow!("Failed to read samples {}: {e}", samples_path.display()))?;
    let samples: CalibrationSamples = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse samples {}: {e}", samples_path.display()))?;

    let report = analyze(&samples);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if apply {
        let mut config = super::load_config(config_path)?;
        let target = match profile {
            Some(app) => {
                let overrides = report.to_override(&config.filter.global);
                if overrides.is_empty() {
                    println!();
                    println!("Nothing to apply: recommendations match the global settings.");
                    return Ok(());
                }
                config.filter.app_profiles.insert(app.clone(), overrides);
                format!("profile '{app}'")
            }
            None => {
                config.filter.global = report.apply_to(&config.filter.global);
                "global settings".to_string()
            }
        };
        config.validate()?;
        config.save_to(config_path)?;

        tracing::info!(path = %config_path.display(), %target, "Calibration applied");
        println!();
        println!(
            "Applied {} recommended value(s) to {target} in {}",
            report.recommended_count(),
            config_path.display()
        );
    }

    Ok(())
}

fn print_report(report: &CalibrationReport) {
    println!("Calibration Report");
    println!("{}", "=".repeat(50));

    for parameter in Parameter::ALL {
        let value = parameter.describe(&report.config);
        let source = match report.provenance(parameter) {
            Some(Provenance::Recommended { samples }) => format!("from {samples} samples"),
            Some(Provenance::Default { observed, required }) => {
                format!("default ({observed} of {required} samples)")
            }
            None => "default".to_string(),
        };
        println!("  {:<30} {value:<10} {source}", parameter.to_string());
    }

    println!();
    println!("Diagnosis:");
    for line in &report.diagnosis {
        println!("  - {line}");
    }

    if !report.is_conclusive() {
        println!();
        println!(
            "{} of {} parameters kept their defaults; record more samples to tune them.",
            Parameter::ALL.len() - report.recommended_count(),
            Parameter::ALL.len()
        );
    }

    let defaults = FilterConfig::default();
    if report.config == defaults {
        println!();
        println!("The recommended settings match the defaults.");
    }
}
