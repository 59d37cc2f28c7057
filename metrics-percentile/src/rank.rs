//! Percentile estimation over bucket counts.
use std::time::Duration;

use crate::Layout;

/// Estimates the value at `percentile` from a sequence of bucket counts, lowest bucket first.
///
/// `total` must be the sum of all counts.  Returns `None` if `total` is zero or if `percentile`
/// is not within `[0.0, 1.0]`.
///
/// The desired rank is `total * percentile`.  The first bucket whose cumulative count reaches the
/// desired rank is the landing bucket, and its lower edge is the estimate.  When the rank is a
/// whole number it sits exactly between two samples, so the estimate is the midpoint between the
/// bucket holding that sample and the bucket holding the one after it.  A rank of zero is treated
/// as the first sample, and a rank equal to `total` has no sample after it.
pub(crate) fn estimate<I>(
    layout: &Layout,
    total: u64,
    percentile: f64,
    counts: I,
) -> Option<Duration>
where
    I: IntoIterator<Item = u64>,
{
    if total == 0 || !(0.0..=1.0).contains(&percentile) {
        return None;
    }

    let desired = total as f64 * percentile;
    let even = desired == desired.trunc();
    let target = if even { desired.max(1.0) } else { desired };
    let has_next = even && desired >= 1.0 && desired < total as f64;

    let mut cumulative = 0u64;
    let mut low = None;
    for (index, count) in counts.into_iter().enumerate() {
        cumulative = cumulative.saturating_add(count);
        let reached = cumulative as f64;

        match low {
            None if target <= reached => {
                let value = layout.value_of(index);
                if !has_next || target + 1.0 <= reached {
                    return Some(value);
                }
                low = Some(value);
            }
            Some(low) if target + 1.0 <= reached => {
                return Some(midpoint(low, layout.value_of(index)));
            }
            _ => {}
        }
    }

    // Only reachable when `total` overstates the counts.
    low
}

fn midpoint(low: Duration, high: Duration) -> Duration {
    low + (high - low) / 2
}
