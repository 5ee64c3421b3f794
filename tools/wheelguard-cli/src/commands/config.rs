//! Show and edit the configuration file.

use std::path::Path;

use clap::Subcommand;
use wheelguard_common::AppConfig;
use wheelguard_scroll_model::ProfileOverride;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as JSON
    Show,

    /// Print the config file location
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Turn filtering on
    Enable,

    /// Turn filtering off (every tick passes)
    Disable,

    /// Manage applications that bypass filtering
    Blacklist {
        #[command(subcommand)]
        action: BlacklistAction,
    },

    /// Manage per-application overrides
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
pub enum BlacklistAction {
    /// Bypass filtering for an application
    Add { app: String },
    /// Filter an application again
    Remove { app: String },
    /// List blacklisted applications
    List,
}

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Create or update an application's overrides
    Set {
        /// Process name, e.g. firefox.exe
        app: String,

        #[arg(long)]
        interval: Option<u64>,

        #[arg(long)]
        threshold: Option<u32>,

        #[arg(long)]
        strict: Option<bool>,

        #[arg(long)]
        physics: Option<u64>,

        #[arg(long)]
        momentum: Option<bool>,

        #[arg(long)]
        enabled: Option<bool>,
    },
    /// Delete an application's overrides
    Remove { app: String },
    /// List configured profiles
    List,
}

pub fn run(config_path: &Path, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = super::load_config(config_path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                );
            }
            AppConfig::default().save_to(config_path)?;
            println!("Wrote default configuration to {}", config_path.display());
        }
        ConfigAction::Enable => {
            update(config_path, |config| config.filter.global.enabled = true)?;
            println!("Filtering enabled.");
        }
        ConfigAction::Disable => {
            update(config_path, |config| config.filter.global.enabled = false)?;
            println!("Filtering disabled.");
        }
        ConfigAction::Blacklist { action } => blacklist(config_path, action)?,
        ConfigAction::Profile { action } => profile(config_path, action)?,
    }
    Ok(())
}

fn blacklist(config_path: &Path, action: BlacklistAction) -> anyhow::Result<()> {
    match action {
        BlacklistAction::Add { app } => {
            let mut added = false;
            update(config_path, |config| {
                added = config.filter.blacklist_app(app.clone());
            })?;
            if added {
                println!("'{app}' now bypasses filtering.");
            } else {
                println!("'{app}' is already blacklisted.");
            }
        }
        BlacklistAction::Remove { app } => {
            let mut removed = false;
            update(config_path, |config| {
                removed = config.filter.unblacklist_app(&app);
            })?;
            if removed {
                println!("'{app}' is filtered again.");
            } else {
                println!("'{app}' was not blacklisted.");
            }
        }
        BlacklistAction::List => {
            let config = super::load_config(config_path)?;
            if config.filter.blacklist.is_empty() {
                println!("No blacklisted applications.");
            }
            for app in &config.filter.blacklist {
                println!("{app}");
            }
        }
    }
    Ok(())
}

fn profile(config_path: &Path, action: ProfileAction) -> anyhow::Result<()> {
    match action {
        ProfileAction::Set {
            app,
            interval,
            threshold,
            strict,
            physics,
            momentum,
            enabled,
        } => {
            let changes = ProfileOverride {
                enabled,
                block_interval_ms: interval,
                direction_change_threshold: threshold,
                strict_mode: strict,
                physics_check_ms: physics,
                momentum_enabled: momentum,
                ..ProfileOverride::default()
            };
            if changes.is_empty() {
                anyhow::bail!("Nothing to set; pass at least one option (see --help)");
            }
            update(config_path, |config| {
                let entry = config.filter.app_profiles.entry(app.clone()).or_default();
                *entry = merge(entry, &changes);
            })?;
            println!("Updated profile '{app}'.");
        }
        ProfileAction::Remove { app } => {
            let mut removed = false;
            update(config_path, |config| {
                removed = config.filter.app_profiles.remove(&app).is_some();
            })?;
            if removed {
                println!("Removed profile '{app}'.");
            } else {
                println!("No profile for '{app}'.");
            }
        }
        ProfileAction::List => {
            let config = super::load_config(config_path)?;
            if config.filter.app_profiles.is_empty() {
                println!("No application profiles.");
            }
            for (app, overrides) in &config.filter.app_profiles {
                println!("{app}: {}", serde_json::to_string(overrides)?);
            }
        }
    }
    Ok(())
}

/// Later values win field by field.
fn merge(current: &ProfileOverride, changes: &ProfileOverride) -> ProfileOverride {
    ProfileOverride {
        enabled: changes.enabled.or(current.enabled),
        block_interval_ms: changes.block_interval_ms.or(current.block_interval_ms),
        direction_change_threshold: changes
            .direction_change_threshold
            .or(current.direction_change_threshold),
        strict_mode: changes.strict_mode.or(current.strict_mode),
        physics_check_ms: changes.physics_check_ms.or(current.physics_check_ms),
        momentum_enabled: changes.momentum_enabled.or(current.momentum_enabled),
        momentum_speed_threshold_ms: changes
            .momentum_speed_threshold_ms
            .or(current.momentum_speed_threshold_ms),
        momentum_threshold_multiplier: changes
            .momentum_threshold_multiplier
            .or(current.momentum_threshold_multiplier),
    }
}

/// Load, edit, validate and save in one step. Invalid edits are not saved.
fn update(config_path: &Path, edit: impl FnOnce(&mut AppConfig)) -> anyhow::Result<()> {
    let mut config = super::load_config(config_path)?;
    edit(&mut config);
    config.validate()?;
    config.save_to(config_path)?;
    tracing::debug!(path = %config_path.display(), "Configuration saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_untouched_fields() {
        let current = ProfileOverride {
            block_interval_ms: Some(500),
            strict_mode: Some(false),
            ..ProfileOverride::default()
        };
        let changes = ProfileOverride {
            direction_change_threshold: Some(4),
            strict_mode: Some(true),
            ..ProfileOverride::default()
        };
        let merged = merge(&current, &changes);
        assert_eq!(merged.block_interval_ms, Some(500));
        assert_eq!(merged.direction_change_threshold, Some(4));
        assert_eq!(merged.strict_mode, Some(true));
    }

    #[test]
    fn test_update_rejects_invalid_edit() {
        let dir = std::env::temp_dir().join("wheelguard_test_cli_config");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("config.json");

        update(&path, |config| config.filter.global.block_interval_ms = 120).unwrap();
        let result = update(&path, |config| {
            config.filter.global.direction_change_threshold = 0;
        });
        assert!(result.is_err());

        let saved = AppConfig::load_from(&path).unwrap();
        assert_eq!(saved.filter.global.block_interval_ms, 120);

        std::fs::remove_dir_all(&dir).ok();
    }
}
