use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use proptest::prelude::*;
use wheelguard_filter_core::{
    decide, step, ConfigSet, Decision, HookFilter, NullDiagnostics, Reason, SessionState,
    SharedConfig,
};
use wheelguard_scroll_model::{FilterConfig, ScrollDirection, ScrollEvent};

fn direction() -> impl Strategy<Value = ScrollDirection> {
    prop_oneof![Just(ScrollDirection::Up), Just(ScrollDirection::Down)]
}

fn plain(threshold: u32, physics_check_ms: u64, block_interval_ms: u64) -> FilterConfig {
    FilterConfig {
        enabled: true,
        block_interval_ms,
        direction_change_threshold: threshold,
        strict_mode: false,
        physics_check_ms,
        momentum_enabled: false,
        momentum_speed_threshold_ms: 50,
        momentum_threshold_multiplier: 2.0,
    }
}

proptest! {
    #[test]
    fn same_direction_stream_always_passes_after_first(
        dir in direction(),
        strict in any::<bool>(),
        block_interval_ms in 1u64..1_000,
        gaps in prop::collection::vec(0u64..=1_000, 1..40),
    ) {
        let config = FilterConfig {
            strict_mode: strict,
            ..plain(2, 30, block_interval_ms)
        };
        let mut state = SessionState::new();
        let mut t = 10_000;
        step(&mut state, &ScrollEvent::new(dir, t), &config);

        for gap in gaps {
            t += gap.min(block_interval_ms);
            let verdict = step(&mut state, &ScrollEvent::new(dir, t), &config);
            prop_assert_eq!(verdict.decision, Decision::Pass);
            prop_assert_eq!(state.consecutive_opposite(), 0);
        }
    }

    #[test]
    fn single_flick_within_interval_is_blocked(
        dir in direction(),
        threshold in 2u32..8,
        physics_check_ms in 0u64..100,
        extra_interval in 1u64..900,
        gap_fraction in 0.0f64..=1.0,
        momentum in any::<bool>(),
    ) {
        let block_interval_ms = physics_check_ms + extra_interval;
        let span = block_interval_ms - physics_check_ms;
        let gap = physics_check_ms + (span as f64 * gap_fraction) as u64;
        let config = FilterConfig {
            momentum_enabled: momentum,
            ..plain(threshold, physics_check_ms, block_interval_ms)
        };

        let mut state = SessionState::new();
        step(&mut state, &ScrollEvent::new(dir, 0), &config);
        let verdict = step(&mut state, &ScrollEvent::new(dir.reversed(), gap), &config);

        prop_assert_eq!(verdict.decision, Decision::Block);
        prop_assert_eq!(verdict.reason, Reason::Jitter);
        prop_assert_eq!(state.established_direction(), Some(dir));
    }

    #[test]
    fn threshold_many_reversals_flip_on_the_last(
        dir in direction(),
        threshold in 1u32..8,
        gap in 30u64..=300,
    ) {
        let config = plain(threshold, 30, 300);
        let mut state = SessionState::new();
        step(&mut state, &ScrollEvent::new(dir, 0), &config);

        let mut t = 0;
        for n in 1..=threshold {
            t += gap;
            let verdict = step(&mut state, &ScrollEvent::new(dir.reversed(), t), &config);
            if n < threshold {
                prop_assert_eq!(verdict.decision, Decision::Block);
                prop_assert_eq!(state.established_direction(), Some(dir));
                prop_assert_eq!(state.consecutive_opposite(), n);
            } else {
                prop_assert_eq!(verdict.decision, Decision::Pass);
                prop_assert_eq!(verdict.reason, Reason::Reversal);
                prop_assert_eq!(state.established_direction(), Some(dir.reversed()));
                prop_assert_eq!(state.consecutive_opposite(), 0);
            }
        }
    }

    #[test]
    fn physics_noise_never_counts(
        dir in direction(),
        threshold in 1u32..10,
        physics_check_ms in 1u64..200,
        prior_opposites in 0u32..3,
    ) {
        let config = plain(threshold.max(prior_opposites + 2), physics_check_ms, physics_check_ms * 4);
        let mut state = SessionState::new();
        let mut t = 0;
        step(&mut state, &ScrollEvent::new(dir, t), &config);
        for _ in 0..prior_opposites {
            t += physics_check_ms;
            step(&mut state, &ScrollEvent::new(dir.reversed(), t), &config);
        }
        let before = state;

        let noise = ScrollEvent::new(dir.reversed(), t + physics_check_ms - 1);
        let (decision, after) = decide(&noise, &config, &state);

        prop_assert_eq!(decision, Decision::Block);
        prop_assert_eq!(after, before);
        prop_assert_eq!(after.consecutive_opposite(), prior_opposites);
    }

    #[test]
    fn idle_gap_starts_a_fresh_session(
        dir in direction(),
        next in direction(),
        block_interval_ms in 0u64..1_000,
        excess in 1u64..10_000,
        strict in any::<bool>(),
    ) {
        let config = FilterConfig {
            strict_mode: strict,
            ..plain(5, 0, block_interval_ms)
        };
        let mut state = SessionState::new();
        step(&mut state, &ScrollEvent::new(dir, 0), &config);
        if strict {
            step(&mut state, &ScrollEvent::new(dir, 0), &config);
        }

        let verdict = step(
            &mut state,
            &ScrollEvent::new(next, block_interval_ms + excess),
            &config,
        );
        if strict {
            prop_assert_eq!(verdict.reason, Reason::StrictHold);
            prop_assert_eq!(state.established_direction(), None);
        } else {
            prop_assert_eq!(verdict.decision, Decision::Pass);
            prop_assert_eq!(verdict.reason, Reason::Established);
            prop_assert_eq!(state.established_direction(), Some(next));
        }
    }

    #[test]
    fn strict_first_tick_never_passes_before_confirmation(
        dir in direction(),
        gap in 0u64..=300,
    ) {
        let config = FilterConfig {
            strict_mode: true,
            ..plain(2, 0, 300)
        };
        let mut state = SessionState::new();
        let first = step(&mut state, &ScrollEvent::new(dir, 0), &config);
        let second = step(&mut state, &ScrollEvent::new(dir.reversed(), gap), &config);
        prop_assert_eq!(first.decision, Decision::Block);
        prop_assert_eq!(second.decision, Decision::Block);
        prop_assert_eq!(state.established_direction(), None);
    }
}

#[test]
fn strict_mode_exact_sequence() {
    let config = FilterConfig {
        strict_mode: true,
        ..plain(2, 50, 300)
    };
    let mut state = SessionState::new();
    let decisions: Vec<Decision> = [
        ScrollEvent::up(0),
        // idle gap > 300 ms
        ScrollEvent::up(1_000),
        ScrollEvent::up(1_040),
    ]
    .iter()
    .map(|e| step(&mut state, e, &config).decision)
    .collect();

    assert_eq!(
        decisions,
        vec![Decision::Block, Decision::Block, Decision::Pass]
    );
    assert_eq!(state.established_direction(), Some(ScrollDirection::Up));
}

#[test]
fn momentum_raises_threshold_while_spinning_fast() {
    let base = FilterConfig {
        momentum_enabled: false,
        momentum_speed_threshold_ms: 50,
        momentum_threshold_multiplier: 2.0,
        ..plain(2, 5, 300)
    };
    let with_momentum = FilterConfig {
        momentum_enabled: true,
        ..base.clone()
    };

    let events = [
        ScrollEvent::down(0),
        ScrollEvent::down(20),
        ScrollEvent::down(40),
        ScrollEvent::down(60),
        ScrollEvent::up(80),
        ScrollEvent::up(100),
    ];

    let run = |config: &FilterConfig| {
        let mut state = SessionState::new();
        let decisions: Vec<Decision> = events
            .iter()
            .map(|e| step(&mut state, e, config).decision)
            .collect();
        (decisions, state)
    };

    let (plain_decisions, plain_state) = run(&base);
    let (momentum_decisions, momentum_state) = run(&with_momentum);

    assert_eq!(plain_decisions[5], Decision::Pass);
    assert_eq!(
        plain_state.established_direction(),
        Some(ScrollDirection::Up)
    );

    assert_eq!(momentum_decisions[4], Decision::Block);
    assert_eq!(momentum_decisions[5], Decision::Block);
    assert_eq!(
        momentum_state.established_direction(),
        Some(ScrollDirection::Down)
    );
    assert_eq!(momentum_state.consecutive_opposite(), 2);
}

/// Every published snapshot is internally consistent: all numeric fields are
/// derived from the same seed. A decision that mixed two snapshots would see
/// mismatched fields.
fn seeded(seed: u64) -> FilterConfig {
    FilterConfig {
        enabled: true,
        block_interval_ms: 1_000 + seed,
        direction_change_threshold: 1 + (seed % 7) as u32,
        strict_mode: seed % 2 == 0,
        physics_check_ms: seed % 500,
        momentum_enabled: seed % 3 == 0,
        momentum_speed_threshold_ms: 10 + seed,
        momentum_threshold_multiplier: 1.0 + (seed % 5) as f64,
    }
}

fn is_consistent(config: &FilterConfig) -> bool {
    let seed = config.block_interval_ms - 1_000;
    *config == seeded(seed)
}

#[test]
fn configuration_swaps_are_never_observed_half_applied() {
    let shared = SharedConfig::from_set(ConfigSet::from_config(seeded(0)));
    let stop = Arc::new(AtomicBool::new(false));

    let publisher = {
        let shared = shared.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut seed = 1;
            while !stop.load(Ordering::Relaxed) {
                shared.publish(ConfigSet::from_config(seeded(seed)));
                seed += 1;
            }
            seed
        })
    };

    let mut filter = HookFilter::with_diagnostics(shared.clone(), NullDiagnostics);
    let mut t = 0;
    for i in 0..20_000u64 {
        let snapshot = shared.snapshot();
        let resolved = snapshot.resolver().resolve(None);
        assert!(is_consistent(&resolved.config), "torn snapshot at tick {i}");

        t += 7;
        let dir = if i % 3 == 0 {
            ScrollDirection::Up
        } else {
            ScrollDirection::Down
        };
        filter.on_event(ScrollEvent::new(dir, t), None);
    }

    stop.store(true, Ordering::Relaxed);
    let published = publisher.join().unwrap();
    assert!(published > 1);
    assert_eq!(filter.stats().faults, 0);
    assert_eq!(filter.stats().total(), 20_000);
}
