//! Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use wheelguard_scroll_model::{ConfigIssue, FilterSettings};

use crate::error::{WheelguardError, WheelguardResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Filter settings: global snapshot, blacklist, per-app profiles.
    pub filter: FilterSettings,

    /// Default calibration recording parameters.
    pub calibration: CalibrationDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default calibration recording parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationDefaults {
    /// Length of the flow phase.
    pub flow_secs: u64,

    /// Length of the sprint phase.
    pub sprint_secs: u64,

    /// Number of brake and precision trials.
    pub trials: usize,

    /// Length of a single brake or precision trial.
    pub trial_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "wheelguard_filter_core=trace,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for CalibrationDefaults {
    fn default() -> Self {
        Self {
            flow_secs: 10,
            sprint_secs: 5,
            trials: 5,
            trial_secs: 4,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> WheelguardResult<Self> {
        if !path.exists() {
            return Err(WheelguardError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> WheelguardResult<()> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    ///
    /// Writes a sibling temp file first and renames it over the target, so a
    /// crash mid-write never leaves a truncated config behind.
    pub fn save_to(&self, path: &Path) -> WheelguardResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");
        if let Err(e) = std::fs::write(&tmp_path, json) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        std::fs::rename(&tmp_path, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            WheelguardError::from(e)
        })
    }

    /// Validate the global snapshot and every resolved profile.
    ///
    /// Returns hard errors; warnings are logged and accepted as user intent.
    pub fn validate(&self) -> WheelguardResult<()> {
        let mut errors = Vec::new();

        let mut check = |scope: &str, issues: Vec<ConfigIssue>| {
            for issue in issues {
                if issue.is_warning() {
                    tracing::warn!(scope, "{issue}");
                } else {
                    errors.push(format!("{scope}: {issue}"));
                }
            }
        };

        check("global", self.filter.global.validate());
        for (app, profile) in &self.filter.app_profiles {
            check(app, profile.apply(&self.filter.global).validate());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(WheelguardError::config(errors.join("; ")))
        }
    }
}

/// Standard config file location.
///
/// `WHEELGUARD_CONFIG` overrides the XDG location.
pub fn config_file_path() -> PathBuf {
    if let Ok(path) = std::env::var("WHEELGUARD_CONFIG") {
        return PathBuf::from(path);
    }
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("wheelguard").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wheelguard_scroll_model::ProfileOverride;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join("wheelguard_test_config_roundtrip");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("config.json");

        let mut config = AppConfig::default();
        config.filter.global.block_interval_ms = 420;
        config.filter.blacklist_app("game.exe");
        config.filter.app_profiles.insert(
            "editor.exe".to_string(),
            ProfileOverride {
                direction_change_threshold: Some(3),
                ..ProfileOverride::default()
            },
        );

        config.save_to(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_missing_file_is_reported() {
        let path = std::env::temp_dir().join("wheelguard_definitely_missing.json");
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, WheelguardError::FileNotFound { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_profile_but_accepts_warnings() {
        let mut config = AppConfig::default();
        config.filter.global.physics_check_ms = 500;
        assert!(config.validate().is_ok());

        config.filter.app_profiles.insert(
            "broken.exe".to_string(),
            ProfileOverride {
                direction_change_threshold: Some(0),
                ..ProfileOverride::default()
            },
        );
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("broken.exe"));
    }
}
