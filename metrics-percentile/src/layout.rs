//! Bucket layout of a calculator.
use std::time::Duration;

use crate::{AddError, BuildError};

/// The fixed bucket layout of a calculator.
///
/// A layout splits the value range `[min_value, max_value]` into `bucket_count` buckets of
/// `bucket_size` each, where `bucket_count` is the range divided by the bucket size, rounded
/// down.  When the range is not an exact multiple of the bucket size, the remainder at the top of
/// the range is folded into the last bucket, and so is a sample equal to `max_value`.
///
/// Calculators can only be merged when their layouts are equal.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Layout {
    bucket_size: u64,
    min_value: u64,
    max_value: u64,
    bucket_count: usize,
}

impl Layout {
    /// Creates a new [`Layout`].
    ///
    /// # Errors
    ///
    /// If the bucket size is zero, if `max_value` is not greater than `min_value`, if the bucket
    /// size is larger than the range itself, or if `max_value` cannot be expressed as a 64-bit
    /// count of nanoseconds, an error is returned describing the problem.
    pub fn new(
        bucket_size: Duration,
        min_value: Duration,
        max_value: Duration,
    ) -> Result<Layout, BuildError> {
        if bucket_size.is_zero() {
            return Err(BuildError::ZeroBucketSize);
        }

        if max_value <= min_value {
            return Err(BuildError::EmptyRange { min: min_value, max: max_value });
        }

        let max_ns = u64::try_from(max_value.as_nanos())
            .map_err(|_| BuildError::RangeTooLarge { max: max_value })?;
        // Both of these are bounded by `max_value`, which now fits.
        let min_ns = min_value.as_nanos() as u64;
        let size_ns = u64::try_from(bucket_size.as_nanos()).unwrap_or(u64::MAX);

        let range_ns = max_ns - min_ns;
        let bucket_count = usize::try_from(range_ns / size_ns)
            .map_err(|_| BuildError::RangeTooLarge { max: max_value })?;
        if bucket_count == 0 {
            return Err(BuildError::BucketLargerThanRange {
                bucket_size,
                range: max_value - min_value,
            });
        }

        Ok(Layout { bucket_size: size_ns, min_value: min_ns, max_value: max_ns, bucket_count })
    }

    /// Gets the width of a single bucket.
    pub fn bucket_size(&self) -> Duration {
        Duration::from_nanos(self.bucket_size)
    }

    /// Gets the smallest value accepted by the layout.
    pub fn min_value(&self) -> Duration {
        Duration::from_nanos(self.min_value)
    }

    /// Gets the largest value accepted by the layout.
    pub fn max_value(&self) -> Duration {
        Duration::from_nanos(self.max_value)
    }

    /// Gets the number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    /// Maps a sample to the index of the bucket it belongs to.
    ///
    /// # Errors
    ///
    /// If the sample falls outside of `[min_value, max_value]`, an error is returned.
    pub fn index_of(&self, value: Duration) -> Result<usize, AddError> {
        let value_ns = value.as_nanos();
        if value_ns < u128::from(self.min_value) {
            return Err(AddError::BelowMinimum { value, min: self.min_value() });
        }
        if value_ns > u128::from(self.max_value) {
            return Err(AddError::AboveMaximum { value, max: self.max_value() });
        }

        let offset = (value_ns - u128::from(self.min_value)) as u64;
        let last = self.bucket_count - 1;
        let index = usize::try_from(offset / self.bucket_size).map_or(last, |i| i.min(last));
        Ok(index)
    }

    /// Gets the representative value of the bucket at `index`, which is its lower edge.
    pub fn value_of(&self, index: usize) -> Duration {
        Duration::from_nanos(self.min_value + index as u64 * self.bucket_size)
    }
}
