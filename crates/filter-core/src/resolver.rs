//! Configuration resolution: which snapshot applies to the foreground app.

use std::sync::Arc;

use wheelguard_scroll_model::{FilterConfig, FilterSettings};

/// Identity of the profile a snapshot came from. A change of key between two
/// ticks resets the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProfileKey {
    Global,
    Blacklisted(Arc<str>),
    App(Arc<str>),
}

impl std::fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Blacklisted(app) => write!(f, "blacklisted:{app}"),
            Self::App(app) => write!(f, "app:{app}"),
        }
    }
}

/// A resolved snapshot.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub key: ProfileKey,
    pub config: Arc<FilterConfig>,
}

/// Pure mapping from the foreground application to a configuration snapshot.
///
/// Implementations must not block: they run on the hook thread.
pub trait ConfigResolver: Send + Sync {
    fn resolve(&self, app_id: Option<&str>) -> Resolved;
}

impl<F> ConfigResolver for F
where
    F: Fn(Option<&str>) -> Resolved + Send + Sync,
{
    fn resolve(&self, app_id: Option<&str>) -> Resolved {
        self(app_id)
    }
}

/// Precomputed snapshots for the global config, the blacklist and every
/// profile, built once per publication.
#[derive(Debug, Clone)]
pub struct ConfigSet {
    global: Arc<FilterConfig>,
    bypass: Arc<FilterConfig>,
    blacklist: Vec<Arc<str>>,
    profiles: Vec<(Arc<str>, Arc<FilterConfig>)>,
}

impl ConfigSet {
    pub fn new(settings: &FilterSettings) -> Self {
        let global = Arc::new(settings.global.clone());
        let bypass = Arc::new(FilterConfig {
            enabled: false,
            ..settings.global.clone()
        });

        let blacklist = settings
            .blacklist
            .iter()
            .map(|app| Arc::from(app.to_ascii_lowercase()))
            .collect();

        let profiles = settings
            .app_profiles
            .iter()
            .map(|(app, profile)| {
                let key: Arc<str> = Arc::from(app.to_ascii_lowercase());
                (key, Arc::new(profile.apply(&settings.global)))
            })
            .collect();

        Self {
            global,
            bypass,
            blacklist,
            profiles,
        }
    }

    /// A set with only a global snapshot.
    pub fn from_config(config: FilterConfig) -> Self {
        Self::new(&FilterSettings {
            global: config,
            ..FilterSettings::default()
        })
    }

    pub fn global(&self) -> &Arc<FilterConfig> {
        &self.global
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }
}

impl ConfigResolver for ConfigSet {
    fn resolve(&self, app_id: Option<&str>) -> Resolved {
        let Some(app_id) = app_id else {
            return Resolved {
                key: ProfileKey::Global,
                config: self.global.clone(),
            };
        };

        if let Some(entry) = self
            .blacklist
            .iter()
            .find(|entry| entry.eq_ignore_ascii_case(app_id))
        {
            return Resolved {
                key: ProfileKey::Blacklisted(entry.clone()),
                config: self.bypass.clone(),
            };
        }

        // Profiles are few; a case-insensitive scan keeps the hook thread
        // free of allocation.
        let hit = self
            .profiles
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(app_id));

        match hit {
            Some((key, config)) => Resolved {
                key: ProfileKey::App(key.clone()),
                config: config.clone(),
            },
            None => Resolved {
                key: ProfileKey::Global,
                config: self.global.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wheelguard_scroll_model::ProfileOverride;

    fn settings() -> FilterSettings {
        let mut settings = FilterSettings::default();
        settings.blacklist_app("Game.exe");
        settings.app_profiles.insert(
            "Editor.exe".to_string(),
            ProfileOverride {
                block_interval_ms: Some(800),
                ..ProfileOverride::default()
            },
        );
        settings
    }

    #[test]
    fn test_unknown_app_uses_global() {
        let set = ConfigSet::new(&settings());
        let resolved = set.resolve(Some("browser.exe"));
        assert_eq!(resolved.key, ProfileKey::Global);
        assert!(Arc::ptr_eq(&resolved.config, set.global()));
        assert_eq!(set.resolve(None).key, ProfileKey::Global);
    }

    #[test]
    fn test_blacklisted_app_bypasses_filtering() {
        let set = ConfigSet::new(&settings());
        let resolved = set.resolve(Some("GAME.EXE"));
        assert!(matches!(resolved.key, ProfileKey::Blacklisted(_)));
        assert!(!resolved.config.enabled);
    }

    #[test]
    fn test_profile_match_is_case_insensitive() {
        let set = ConfigSet::new(&settings());
        let resolved = set.resolve(Some("editor.exe"));
        assert_eq!(resolved.key, ProfileKey::App(Arc::from("editor.exe")));
        assert_eq!(resolved.config.block_interval_ms, 800);
        assert_eq!(
            set.resolve(Some("EDITOR.exe")).config.block_interval_ms,
            800
        );
    }

    #[test]
    fn test_mixed_case_lookups_share_one_snapshot() {
        let set = ConfigSet::new(&settings());
        let lower = set.resolve(Some("editor.exe"));
        for spelling in ["EDITOR.EXE", "Editor.Exe", "eDiToR.exe"] {
            let resolved = set.resolve(Some(spelling));
            assert_eq!(resolved.key, lower.key);
            assert!(Arc::ptr_eq(&resolved.config, &lower.config));
        }
        assert_eq!(set.resolve(Some("editor.ex")).key, ProfileKey::Global);
    }

    #[test]
    fn test_closures_are_resolvers() {
        let resolver = |_: Option<&str>| Resolved {
            key: ProfileKey::Global,
            config: Arc::new(FilterConfig::disabled()),
        };
        assert!(!resolver.resolve(Some("x")).config.enabled);
    }
}
