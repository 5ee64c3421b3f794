use std::path::PathBuf;

use wheelguard_filter_core::{ConfigSet, Decision, SharedConfig};
use wheelguard_hook::sources::ReplaySource;
use wheelguard_hook::{DecisionLog, HookRunner};
use wheelguard_scroll_model::{FilterConfig, FilterSettings, ProfileOverride};

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/logs/jittery-session.jsonl")
}

fn settings() -> FilterSettings {
    let mut settings = FilterSettings {
        global: FilterConfig::default(),
        ..FilterSettings::default()
    };
    settings.blacklist_app("game");
    settings.app_profiles.insert(
        "editor".to_string(),
        ProfileOverride {
            direction_change_threshold: Some(1),
            strict_mode: Some(false),
            ..ProfileOverride::default()
        },
    );
    settings
}

fn runner(app: Option<&str>) -> HookRunner<DecisionLog> {
    let source = ReplaySource::from_file(&fixture()).expect("fixture should load");
    let shared = SharedConfig::from_set(ConfigSet::new(&settings()));
    let runner = HookRunner::new(Box::new(source), shared, DecisionLog::new());
    match app {
        Some(app) => runner.with_app(app),
        None => runner,
    }
}

#[tokio::test]
async fn default_profile_suppresses_jitter_and_stop_bounce() {
    use Decision::*;

    let mut runner = runner(None);
    let stats = runner.run().await.unwrap();

    assert_eq!(
        runner.sink().decisions(),
        vec![Block, Pass, Pass, Block, Pass, Block, Pass, Block, Pass, Pass, Block, Pass]
    );
    assert_eq!(stats.passed, 7);
    assert_eq!(stats.blocked_up, 3);
    assert_eq!(stats.blocked_down, 2);
    assert_eq!(stats.physics_discards, 1);
    assert_eq!(stats.session_resets, 1);
    assert_eq!(stats.faults, 0);
}

#[tokio::test]
async fn blacklisted_app_is_never_filtered() {
    let mut runner = runner(Some("Game"));
    let stats = runner.run().await.unwrap();
    assert_eq!(stats.passed, 12);
    assert_eq!(stats.blocked(), 0);
}

#[tokio::test]
async fn app_profile_overrides_threshold_and_strict_mode() {
    let mut runner = runner(Some("editor"));
    let stats = runner.run().await.unwrap();

    // Only the 30 ms physics bounce is still dropped.
    assert_eq!(stats.passed, 11);
    assert_eq!(stats.blocked_up, 1);
    assert_eq!(stats.physics_discards, 1);
}
