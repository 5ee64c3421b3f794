//! Order statistics over millisecond samples.
//!
//! All statistics use the nearest-rank method: the result is always one of
//! the input values, so identical samples give identical results.

/// Nearest-rank percentile. `percent` is clamped to `0..=100`.
///
/// Returns `None` for an empty sample list.
pub fn percentile(samples: &[u64], percent: u32) -> Option<u64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();

    let n = sorted.len();
    let percent = percent.min(100) as usize;
    let rank = (percent * n).div_ceil(100).max(1);
    Some(sorted[rank - 1])
}

/// Nearest-rank median (50th percentile).
pub fn median(samples: &[u64]) -> Option<u64> {
    percentile(samples, 50)
}
