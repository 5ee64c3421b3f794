pub mod calibrate;
pub mod check;
pub mod config;
pub mod monitor;
pub mod record;
pub mod replay;

use std::path::Path;
use std::sync::Arc;

use wheelguard_common::AppConfig;
use wheelguard_filter_core::{ConfigSet, FilterStats, SharedConfig};

/// Load the config at `path`, or defaults when no file exists yet.
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    AppConfig::load_from(path)
        .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))
}

/// Validate the loaded config and publish it for a hook.
pub fn publish_filter_config(config: &AppConfig) -> anyhow::Result<Arc<SharedConfig>> {
    config.validate()?;
    Ok(SharedConfig::from_set(ConfigSet::new(&config.filter)))
}

pub fn print_stats(stats: &FilterStats) {
    let total = stats.total();
    let rate = if total == 0 {
        0.0
    } else {
        stats.blocked() as f64 / total as f64 * 100.0
    };
    println!("  Ticks:            {total}");
    println!("  Passed:           {}", stats.passed);
    println!(
        "  Blocked:          {} (up {}, down {})",
        stats.blocked(),
        stats.blocked_up,
        stats.blocked_down
    );
    println!("  Physics discards: {}", stats.physics_discards);
    println!("  Session resets:   {}", stats.session_resets);
    println!("  Block rate:       {rate:.1}%");
    if stats.faults > 0 {
        println!("  Filter faults:    {} (ticks passed unfiltered)", stats.faults);
    }
}
