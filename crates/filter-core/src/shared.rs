//! Snapshot publication between the interface thread and the hook thread.
//!
//! The interface thread builds a new immutable resolver and publishes it with
//! a single pointer swap. The hook thread clones the current pointer once per
//! tick and decides the whole tick against that clone, so a publish can only
//! take effect on the next tick. The lock guards the pointer only; no filter
//! logic ever runs while it is held.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::resolver::{ConfigResolver, ConfigSet};

/// A published resolver together with its publication number.
#[derive(Clone)]
pub struct Snapshot {
    generation: u64,
    resolver: Arc<dyn ConfigResolver>,
}

impl Snapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn resolver(&self) -> &dyn ConfigResolver {
        self.resolver.as_ref()
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// The one object shared by the hook and interface threads.
pub struct SharedConfig {
    current: RwLock<Arc<Snapshot>>,
    reset_requested: AtomicBool,
}

impl SharedConfig {
    pub fn new(resolver: impl ConfigResolver + 'static) -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot {
                generation: 0,
                resolver: Arc::new(resolver),
            })),
            reset_requested: AtomicBool::new(false),
        }
    }

    /// Shared cell with a plain configuration set.
    pub fn from_set(set: ConfigSet) -> Arc<Self> {
        Arc::new(Self::new(set))
    }

    /// Replace the active resolver. Returns the new generation.
    pub fn publish(&self, resolver: impl ConfigResolver + 'static) -> u64 {
        let resolver: Arc<dyn ConfigResolver> = Arc::new(resolver);
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let generation = current.generation + 1;
        *current = Arc::new(Snapshot {
            generation,
            resolver,
        });
        drop(current);
        tracing::debug!(generation, "Published filter configuration");
        generation
    }

    /// The current snapshot. Read once per tick.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Ask the hook thread to reset its session before the next tick.
    pub fn request_reset(&self) {
        self.reset_requested.store(true, Ordering::Release);
    }

    /// Consume a pending reset request.
    pub fn take_reset_request(&self) -> bool {
        self.reset_requested.swap(false, Ordering::AcqRel)
    }
}

impl std::fmt::Debug for SharedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedConfig")
            .field("generation", &self.snapshot().generation)
            .field(
                "reset_requested",
                &self.reset_requested.load(Ordering::Relaxed),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wheelguard_scroll_model::FilterConfig;

    #[test]
    fn test_publish_bumps_generation() {
        let shared = SharedConfig::from_set(ConfigSet::from_config(FilterConfig::default()));
        assert_eq!(shared.snapshot().generation(), 0);

        let generation = shared.publish(ConfigSet::from_config(FilterConfig::disabled()));
        assert_eq!(generation, 1);

        let snapshot = shared.snapshot();
        assert_eq!(snapshot.generation(), 1);
        assert!(!snapshot.resolver().resolve(None).config.enabled);
    }

    #[test]
    fn test_held_snapshot_survives_publish() {
        let shared = SharedConfig::from_set(ConfigSet::from_config(FilterConfig::default()));
        let held = shared.snapshot();
        shared.publish(ConfigSet::from_config(FilterConfig::disabled()));
        assert!(held.resolver().resolve(None).config.enabled);
    }

    #[test]
    fn test_reset_request_is_consumed_once() {
        let shared = SharedConfig::from_set(ConfigSet::from_config(FilterConfig::default()));
        assert!(!shared.take_reset_request());
        shared.request_reset();
        assert!(shared.take_reset_request());
        assert!(!shared.take_reset_request());
    }
}
