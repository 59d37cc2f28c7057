use std::time::Duration;

use crate::{rank, Layout, MergeError};

/// A point-in-time copy of a calculator's bucket counters.
///
/// Snapshots are detached from the calculator they were taken from: they can be merged with each
/// other and queried without holding any locks.  Merging snapshots taken one at a time gives an
/// eventually-consistent view across calculators, as opposed to
/// [`multi_percentile`](crate::multi_percentile), which locks every calculator at once.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Snapshot {
    layout: Layout,
    buckets: Vec<u64>,
    total_count: u64,
}

impl Snapshot {
    pub(crate) fn from_parts(layout: Layout, buckets: Vec<u64>, total_count: u64) -> Snapshot {
        Snapshot { layout, buckets, total_count }
    }

    /// Creates an empty snapshot for the given layout.
    pub fn empty(layout: Layout) -> Snapshot {
        Snapshot { layout, buckets: vec![0u64; layout.bucket_count()], total_count: 0 }
    }

    /// Gets the bucket layout.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Gets the number of samples.
    pub fn count(&self) -> u64 {
        self.total_count
    }

    /// Gets the bucket counters, lowest bucket first.
    pub fn buckets(&self) -> &[u64] {
        &self.buckets
    }

    /// Estimates the value at the given percentile.
    ///
    /// Behaves exactly like [`Calculator::percentile`](crate::Calculator::percentile).
    pub fn percentile(&self, percentile: f64) -> Option<Duration> {
        rank::estimate(&self.layout, self.total_count, percentile, self.buckets.iter().copied())
    }

    /// Estimates the values at several percentiles.
    pub fn percentiles(&self, percentiles: &[f64]) -> Vec<Option<Duration>> {
        percentiles.iter().map(|p| self.percentile(*p)).collect()
    }

    /// Adds the counters of `other` to this snapshot.
    ///
    /// # Errors
    ///
    /// If the two snapshots do not share the same layout, an error is returned and this snapshot
    /// is left unchanged.
    pub fn merge(&mut self, other: &Snapshot) -> Result<(), MergeError> {
        if self.layout != other.layout {
            return Err(MergeError::LayoutMismatch { expected: self.layout, found: other.layout });
        }

        for (bucket, count) in self.buckets.iter_mut().zip(other.buckets.iter()) {
            *bucket += count;
        }
        self.total_count += other.total_count;
        Ok(())
    }
}
