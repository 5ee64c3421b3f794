//! Filter configuration snapshot.
//!
//! A `FilterConfig` is an immutable value. Hosts replace it wholesale when the
//! user changes a setting; the hook thread never sees a half-applied change.

use serde::{Deserialize, Serialize};

/// Tunable parameters of the scroll filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Master switch. When false every event passes untouched.
    pub enabled: bool,

    /// Window after the last tick during which opposite ticks are scrutinized.
    /// A gap strictly longer than this starts a new session.
    pub block_interval_ms: u64,

    /// Consecutive opposite ticks required to flip the established direction.
    pub direction_change_threshold: u32,

    /// Hold the first tick of a session until a second tick confirms it.
    pub strict_mode: bool,

    /// Reversals faster than this are electrical noise. 0 disables the check.
    pub physics_check_ms: u64,

    /// Scale the threshold up while the wheel spins fast.
    pub momentum_enabled: bool,

    /// Median tick gap below which the wheel counts as spinning fast.
    pub momentum_speed_threshold_ms: u64,

    /// Threshold multiplier applied at speed.
    pub momentum_threshold_multiplier: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            block_interval_ms: 300,
            direction_change_threshold: 2,
            strict_mode: true,
            physics_check_ms: 50,
            momentum_enabled: true,
            momentum_speed_threshold_ms: 50,
            momentum_threshold_multiplier: 2.0,
        }
    }
}

/// A problem found by [`FilterConfig::validate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigIssue {
    #[error("direction change threshold must be at least 1 (got {0})")]
    ThresholdTooLow(u32),

    #[error("momentum threshold multiplier must be a finite number >= 1 (got {0})")]
    MultiplierOutOfRange(f64),

    #[error(
        "physics check ({physics_check_ms} ms) is not shorter than the block interval \
         ({block_interval_ms} ms); every in-session reversal will be discarded as noise"
    )]
    PhysicsCheckDominates {
        physics_check_ms: u64,
        block_interval_ms: u64,
    },
}

impl ConfigIssue {
    /// Errors must be fixed before publication; warnings are user intent.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::PhysicsCheckDominates { .. })
    }
}

impl FilterConfig {
    /// A snapshot that lets every event through.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Check ranges. Hosts run this before publishing a snapshot.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.direction_change_threshold < 1 {
            issues.push(ConfigIssue::ThresholdTooLow(self.direction_change_threshold));
        }

        if !self.momentum_threshold_multiplier.is_finite()
            || self.momentum_threshold_multiplier < 1.0
        {
            issues.push(ConfigIssue::MultiplierOutOfRange(
                self.momentum_threshold_multiplier,
            ));
        }

        if self.physics_check_ms > 0 && self.physics_check_ms >= self.block_interval_ms {
            issues.push(ConfigIssue::PhysicsCheckDominates {
                physics_check_ms: self.physics_check_ms,
                block_interval_ms: self.block_interval_ms,
            });
        }

        issues
    }

    /// Threshold with the `>= 1` floor applied.
    pub fn effective_base_threshold(&self) -> u32 {
        self.direction_change_threshold.max(1)
    }

    /// Multiplier with the `>= 1` floor applied. Non-finite values collapse to 1.
    pub fn effective_multiplier(&self) -> f64 {
        if self.momentum_threshold_multiplier.is_finite() {
            self.momentum_threshold_multiplier.max(1.0)
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(FilterConfig::default().validate().is_empty());
    }

    #[test]
    fn test_validate_reports_every_issue() {
        let config = FilterConfig {
            direction_change_threshold: 0,
            momentum_threshold_multiplier: 0.5,
            physics_check_ms: 400,
            block_interval_ms: 300,
            ..FilterConfig::default()
        };
        let issues = config.validate();
        assert_eq!(issues.len(), 3);
        assert_eq!(issues.iter().filter(|i| i.is_warning()).count(), 1);
    }

    #[test]
    fn test_disabled_physics_check_never_dominates() {
        let config = FilterConfig {
            physics_check_ms: 0,
            block_interval_ms: 0,
            ..FilterConfig::default()
        };
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_effective_values_are_clamped() {
        let config = FilterConfig {
            direction_change_threshold: 0,
            momentum_threshold_multiplier: f64::NAN,
            ..FilterConfig::default()
        };
        assert_eq!(config.effective_base_threshold(), 1);
        assert_eq!(config.effective_multiplier(), 1.0);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: FilterConfig =
            serde_json::from_str(r#"{"block_interval_ms":450,"strict_mode":false}"#).unwrap();
        assert_eq!(config.block_interval_ms, 450);
        assert!(!config.strict_mode);
        assert_eq!(config.direction_change_threshold, 2);
    }
}
