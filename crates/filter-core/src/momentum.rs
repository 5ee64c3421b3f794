//! Momentum estimation.
//!
//! A fast-spinning wheel produces more encoder bounce per reversal, so while
//! the recent tick rate is high the direction-change threshold is scaled up.

use wheelguard_scroll_model::FilterConfig;

use crate::session::SessionState;

/// Median gap between the recent ticks, in milliseconds.
///
/// `None` until at least two ticks have been recorded.
pub fn scroll_speed_ms(state: &SessionState) -> Option<u64> {
    let (mut gaps, count) = state.recent().gaps();
    if count == 0 {
        return None;
    }
    let gaps = &mut gaps[..count];
    gaps.sort_unstable();
    let mid = count / 2;
    if count % 2 == 1 {
        Some(gaps[mid])
    } else {
        Some((gaps[mid - 1] + gaps[mid]) / 2)
    }
}

/// Threshold in force for the next opposite tick. Never below the base.
pub fn effective_threshold(config: &FilterConfig, state: &SessionState) -> u32 {
    let base = config.effective_base_threshold();
    if !config.momentum_enabled {
        return base;
    }

    match scroll_speed_ms(state) {
        Some(speed) if speed < config.momentum_speed_threshold_ms => {
            let scaled = (f64::from(base) * config.effective_multiplier()).ceil();
            if scaled >= f64::from(u32::MAX) {
                u32::MAX
            } else {
                (scaled as u32).max(base)
            }
        }
        _ => base,
    }
}
