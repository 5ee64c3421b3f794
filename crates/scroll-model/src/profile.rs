//! Persisted filter settings: the global snapshot, the blacklist, and
//! per-application overrides.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::FilterConfig;

/// Partial override of a [`FilterConfig`] for one application.
///
/// Unset fields inherit from the global configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction_change_threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physics_check_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub momentum_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub momentum_speed_threshold_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub momentum_threshold_multiplier: Option<f64>,
}

impl ProfileOverride {
    /// Merge this override over `base`, producing a new snapshot.
    pub fn apply(&self, base: &FilterConfig) -> FilterConfig {
        FilterConfig {
            enabled: self.enabled.unwrap_or(base.enabled),
            block_interval_ms: self.block_interval_ms.unwrap_or(base.block_interval_ms),
            direction_change_threshold: self
                .direction_change_threshold
                .unwrap_or(base.direction_change_threshold),
            strict_mode: self.strict_mode.unwrap_or(base.strict_mode),
            physics_check_ms: self.physics_check_ms.unwrap_or(base.physics_check_ms),
            momentum_enabled: self.momentum_enabled.unwrap_or(base.momentum_enabled),
            momentum_speed_threshold_ms: self
                .momentum_speed_threshold_ms
                .unwrap_or(base.momentum_speed_threshold_ms),
            momentum_threshold_multiplier: self
                .momentum_threshold_multiplier
                .unwrap_or(base.momentum_threshold_multiplier),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Everything the user can configure about filtering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Global snapshot, used when no profile matches.
    pub global: FilterConfig,

    /// Executable names where filtering is bypassed entirely.
    pub blacklist: Vec<String>,

    /// Per-executable overrides, keyed by process name (e.g. `firefox.exe`).
    pub app_profiles: BTreeMap<String, ProfileOverride>,
}

impl FilterSettings {
    /// Case-insensitive blacklist lookup.
    pub fn is_blacklisted(&self, app_id: &str) -> bool {
        self.blacklist
            .iter()
            .any(|entry| entry.eq_ignore_ascii_case(app_id))
    }

    /// Add an executable to the blacklist, ignoring duplicates.
    pub fn blacklist_app(&mut self, app_id: impl Into<String>) -> bool {
        let app_id = app_id.into();
        if self.is_blacklisted(&app_id) {
            return false;
        }
        self.blacklist.push(app_id);
        true
    }

    /// Remove an executable from the blacklist.
    pub fn unblacklist_app(&mut self, app_id: &str) -> bool {
        let before = self.blacklist.len();
        self.blacklist
            .retain(|entry| !entry.eq_ignore_ascii_case(app_id));
        before != self.blacklist.len()
    }
}
