//! Percentiles across multiple calculators.
use std::time::Duration;

use parking_lot::RwLockWriteGuard;
use tracing::trace;

use crate::{calculator::State, rank, Calculator, Layout, MergeError};

/// Estimates the value at the given percentile across several calculators.
///
/// The raw bucket counts of every calculator are summed before the percentile is estimated, so
/// the result is the same as if every sample had been added to a single calculator.  All
/// calculators must share the same [`Layout`].
///
/// Every calculator is locked exclusively for the duration of the estimate, which blocks
/// concurrent [`Calculator::add`] calls on them.  Locks are always acquired in the same global
/// order, so concurrent merges over overlapping sets of calculators cannot deadlock.  A calculator
/// that appears more than once is counted once per appearance.  Combined counts saturate at
/// `u64::MAX`.
///
/// Returns `Ok(None)` when the calculators hold no samples at all, or when `percentile` is outside
/// of `[0.0, 1.0]`.
///
/// # Errors
///
/// If `calculators` is empty, or if any calculator has a layout different from the first one, an
/// error is returned.
pub fn multi_percentile(
    percentile: f64,
    calculators: &[&Calculator],
) -> Result<Option<Duration>, MergeError> {
    multi_percentiles(&[percentile], calculators).map(|mut results| results.pop().flatten())
}

/// Estimates the values at several percentiles across several calculators.
///
/// Every estimate is computed from the same locked view of the calculators.  Results are in the
/// same order as `percentiles`.
///
/// # Errors
///
/// If `calculators` is empty, or if any calculator has a layout different from the first one, an
/// error is returned.
pub fn multi_percentiles(
    percentiles: &[f64],
    calculators: &[&Calculator],
) -> Result<Vec<Option<Duration>>, MergeError> {
    let layout = check_layouts(calculators)?;

    let locked = lock_all(calculators);
    let total =
        saturating_sum(locked.iter().map(|(_, state, times)| (state.total_count, *times)));
    trace!(calculators = calculators.len(), distinct = locked.len(), total, "merging calculators");

    let results = percentiles
        .iter()
        .map(|p| {
            let counts = (0..layout.bucket_count()).map(|index| {
                let per_calculator =
                    locked.iter().map(|(_, state, times)| (state.buckets[index], *times));
                saturating_sum(per_calculator)
            });
            rank::estimate(&layout, total, *p, counts)
        })
        .collect();
    Ok(results)
}

/// Sums `count * times` pairs, saturating at `u64::MAX`.
fn saturating_sum<I>(counts: I) -> u64
where
    I: IntoIterator<Item = (u64, u64)>,
{
    counts
        .into_iter()
        .fold(0u64, |sum, (count, times)| sum.saturating_add(count.saturating_mul(times)))
}

fn check_layouts(calculators: &[&Calculator]) -> Result<Layout, MergeError> {
    let first = calculators.first().ok_or(MergeError::NoCalculators)?;
    let expected = *first.layout();
    match calculators.iter().find(|calc| *calc.layout() != expected) {
        Some(calc) => Err(MergeError::LayoutMismatch { expected, found: *calc.layout() }),
        None => Ok(expected),
    }
}

/// Write-locks each distinct calculator in ascending id order, along with how many times it was
/// given.
fn lock_all<'a>(calculators: &[&'a Calculator]) -> Vec<(u64, RwLockWriteGuard<'a, State>, u64)> {
    let mut ordered = calculators.to_vec();
    ordered.sort_by_key(|calc| calc.id());

    let mut locked: Vec<(u64, RwLockWriteGuard<'a, State>, u64)> =
        Vec::with_capacity(ordered.len());
    for calc in ordered {
        if let Some((id, _, times)) = locked.last_mut() {
            if *id == calc.id() {
                *times += 1;
                continue;
            }
        }
        locked.push((calc.id(), calc.state().write(), 1));
    }
    locked
}
