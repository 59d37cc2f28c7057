use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::{rank, AddError, BuildError, Layout, Snapshot};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Bucket counters guarded by a calculator's lock.
pub(crate) struct State {
    pub(crate) buckets: Box<[u64]>,
    pub(crate) total_count: u64,
}

/// A fixed-range, fixed-resolution histogram of durations.
///
/// `Calculator` counts samples in equally-sized buckets spanning `[min_value, max_value]` and
/// estimates percentiles from those counts, using a constant amount of memory regardless of how
/// many samples are added.  Estimates are only as precise as the bucket size: the value reported
/// for a bucket is its lower edge.
///
/// All operations take `&self`, and a calculator can be shared freely between threads.  Adding
/// samples takes an exclusive lock, while percentile queries take a shared lock.
///
/// Percentiles across several calculators with the same [`Layout`] can be estimated with
/// [`multi_percentile`](crate::multi_percentile), which combines their raw counts rather than
/// their individual percentiles.
pub struct Calculator {
    id: u64,
    layout: Layout,
    state: RwLock<State>,
}

impl Calculator {
    /// Creates a new [`Calculator`].
    ///
    /// The number of buckets is `(max_value - min_value) / bucket_size`, rounded down.
    ///
    /// # Errors
    ///
    /// If the bucket size is zero, or the range is empty or too large, an error is returned.  See
    /// [`Layout::new`] for details.
    pub fn new(
        bucket_size: Duration,
        min_value: Duration,
        max_value: Duration,
    ) -> Result<Calculator, BuildError> {
        Layout::new(bucket_size, min_value, max_value).map(Calculator::with_layout)
    }

    /// Creates a new [`Calculator`] with the given layout.
    pub fn with_layout(layout: Layout) -> Calculator {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            id,
            bucket_size = ?layout.bucket_size(),
            min_value = ?layout.min_value(),
            max_value = ?layout.max_value(),
            bucket_count = layout.bucket_count(),
            "created percentile calculator"
        );

        let state =
            State { buckets: vec![0u64; layout.bucket_count()].into_boxed_slice(), total_count: 0 };
        Calculator { id, layout, state: RwLock::new(state) }
    }

    /// Adds a sample.
    ///
    /// # Errors
    ///
    /// If the sample is smaller than the minimum value or larger than the maximum value, an error
    /// is returned and the sample is not recorded.  The same applies if a counter would overflow.
    pub fn add(&self, value: Duration) -> Result<(), AddError> {
        self.add_n(value, 1)
    }

    /// Adds `n` occurrences of the same sample.
    ///
    /// # Errors
    ///
    /// If the sample is smaller than the minimum value or larger than the maximum value, an error
    /// is returned and nothing is recorded.  If recording `n` more samples would overflow a
    /// counter, [`AddError::CountOverflow`] is returned and the counters are left untouched.
    pub fn add_n(&self, value: Duration, n: u64) -> Result<(), AddError> {
        let result = self.layout.index_of(value).and_then(|index| {
            let mut state = self.state.write();
            let bucket = state.buckets[index].checked_add(n);
            let total = state.total_count.checked_add(n);
            match bucket.zip(total) {
                Some((bucket, total)) => {
                    state.buckets[index] = bucket;
                    state.total_count = total;
                    Ok(())
                }
                None => Err(AddError::CountOverflow { value, n }),
            }
        });

        if let Err(e) = &result {
            trace!(id = self.id, error = %e, "rejected sample");
        }
        result
    }

    /// Estimates the value at the given percentile.
    ///
    /// `percentile` is a fraction between 0.0 and 1.0, so the median is `0.5` and p99 is `0.99`.
    ///
    /// If no samples have been added, or if `percentile` is outside of `[0.0, 1.0]`, `None` is
    /// returned.
    pub fn percentile(&self, percentile: f64) -> Option<Duration> {
        let state = self.state.read();
        rank::estimate(&self.layout, state.total_count, percentile, state.buckets.iter().copied())
    }

    /// Estimates the values at several percentiles from the same set of samples.
    ///
    /// Results are in the same order as `percentiles`.
    pub fn percentiles(&self, percentiles: &[f64]) -> Vec<Option<Duration>> {
        let state = self.state.read();
        percentiles
            .iter()
            .map(|p| {
                rank::estimate(&self.layout, state.total_count, *p, state.buckets.iter().copied())
            })
            .collect()
    }

    /// Gets the number of samples added so far.
    pub fn count(&self) -> u64 {
        self.state.read().total_count
    }

    /// Gets the bucket layout.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Gets the width of a single bucket.
    pub fn bucket_size(&self) -> Duration {
        self.layout.bucket_size()
    }

    /// Gets the smallest accepted sample.
    pub fn min_value(&self) -> Duration {
        self.layout.min_value()
    }

    /// Gets the largest accepted sample.
    pub fn max_value(&self) -> Duration {
        self.layout.max_value()
    }

    /// Gets the number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.layout.bucket_count()
    }

    /// Gets a copy of the bucket counters, lowest bucket first.
    pub fn buckets(&self) -> Vec<u64> {
        self.state.read().buckets.to_vec()
    }

    /// Takes a point-in-time copy of the bucket counters.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.read();
        Snapshot::from_parts(self.layout, state.buckets.to_vec(), state.total_count)
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn state(&self) -> &RwLock<State> {
        &self.state
    }
}

impl fmt::Debug for Calculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Calculator")
            .field("id", &self.id)
            .field("layout", &self.layout)
            .field("count", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use proptest::{collection::vec, prelude::*};

    use super::Calculator;
    use crate::{AddError, BuildError};

    const MS: Duration = Duration::from_millis(1);

    fn calculator() -> Calculator {
        Calculator::new(MS, Duration::ZERO, MS * 1000).expect("valid calculator")
    }

    #[test]
    fn test_new_invalid() {
        assert_eq!(
            Calculator::new(Duration::ZERO, Duration::ZERO, MS).err(),
            Some(BuildError::ZeroBucketSize)
        );
    }

    #[test]
    fn test_calculator_p50() {
        let calc = calculator();
        calc.add(MS).expect("in range");
        assert_eq!(calc.percentile(0.5), Some(MS));

        let calc = calculator();
        calc.add(MS).expect("in range");
        calc.add(MS * 2).expect("in range");
        calc.add(MS * 3).expect("in range");
        assert_eq!(calc.percentile(0.5), Some(MS * 2));

        calc.add(MS * 4).expect("in range");
        assert_eq!(calc.percentile(0.5), Some(Duration::from_micros(2500)));

        calc.add(MS * 4).expect("in range");
        assert_eq!(calc.percentile(0.5), Some(Duration::from_micros(3000)));
    }

    #[test]
    fn test_add_out_of_range() {
        let calc = Calculator::new(MS, MS * 10, MS * 20).expect("valid calculator");
        calc.add(MS * 15).expect("in range");

        assert_eq!(calc.add(MS * 9), Err(AddError::BelowMinimum { value: MS * 9, min: MS * 10 }));
        assert_eq!(calc.add(MS * 21), Err(AddError::AboveMaximum { value: MS * 21, max: MS * 20 }));
        assert_eq!(
            calc.add_n(MS * 21, 5),
            Err(AddError::AboveMaximum { value: MS * 21, max: MS * 20 })
        );

        assert_eq!(calc.count(), 1);
        assert_eq!(calc.buckets().iter().sum::<u64>(), 1);
        assert_eq!(calc.buckets()[5], 1);
    }

    #[test]
    fn test_add_max_value() {
        let calc = calculator();
        calc.add(MS * 1000).expect("maximum is inclusive");
        assert_eq!(calc.buckets()[999], 1);
        assert_eq!(calc.percentile(0.5), Some(MS * 999));
    }

    #[test]
    fn test_add_n() {
        let calc = calculator();
        calc.add_n(MS * 7, 3).expect("in range");
        calc.add_n(MS * 8, 0).expect("in range");
        assert_eq!(calc.count(), 3);
        assert_eq!(calc.buckets()[7], 3);
        assert_eq!(calc.buckets()[8], 0);
    }

    #[test]
    fn test_add_count_overflow() {
        let calc = calculator();
        calc.add_n(MS * 5, u64::MAX).expect("fits in the counters");

        assert_eq!(calc.add(MS * 5), Err(AddError::CountOverflow { value: MS * 5, n: 1 }));
        // The bucket has room, but the total does not.
        assert_eq!(calc.add(MS * 6), Err(AddError::CountOverflow { value: MS * 6, n: 1 }));

        assert_eq!(calc.count(), u64::MAX);
        assert_eq!(calc.buckets()[5], u64::MAX);
        assert_eq!(calc.buckets()[6], 0);
        assert_eq!(calc.percentile(0.5), Some(MS * 5));

        // Empty additions never overflow.
        calc.add_n(MS * 5, 0).expect("nothing to record");
    }

    #[test]
    fn test_percentile_empty() {
        let calc = calculator();
        assert_eq!(calc.percentile(0.0), None);
        assert_eq!(calc.percentile(0.5), None);
        assert_eq!(calc.percentile(1.0), None);
    }

    #[test]
    fn test_percentiles() {
        let calc = calculator();
        for i in 1..=100 {
            calc.add(MS * i).expect("in range");
        }

        let results = calc.percentiles(&[0.0, 0.5, 0.99, 1.0, 2.0]);
        assert_eq!(
            results,
            vec![
                Some(MS),
                Some(Duration::from_micros(50_500)),
                Some(Duration::from_micros(99_500)),
                Some(MS * 100),
                None,
            ]
        );
        assert_eq!(results[1], calc.percentile(0.5));
    }

    #[test]
    fn test_accessors() {
        let calc = Calculator::new(MS * 2, MS * 10, MS * 31).expect("valid calculator");
        assert_eq!(calc.bucket_size(), MS * 2);
        assert_eq!(calc.min_value(), MS * 10);
        assert_eq!(calc.max_value(), MS * 31);
        assert_eq!(calc.bucket_count(), 10);
        assert_eq!(calc.buckets().len(), 10);
        assert_eq!(calc.layout().bucket_count(), 10);
        assert_eq!(calc.count(), 0);
    }

    #[test]
    fn test_unique_ids() {
        let a = calculator();
        let b = calculator();
        assert_ne!(a.id(), b.id());
    }

    proptest! {
        #[test]
        fn test_add_accounting(samples in vec(0u64..2000, 0..200)) {
            let calc = calculator();
            for sample in samples {
                let value = MS * sample as u32;
                let before = calc.count();
                let before_buckets = calc.buckets();

                match calc.add(value) {
                    Ok(()) => {
                        prop_assert!(sample <= 1000);
                        prop_assert_eq!(calc.count(), before + 1);
                        prop_assert_eq!(calc.buckets().iter().sum::<u64>(), before + 1);
                    }
                    Err(AddError::AboveMaximum { .. }) => {
                        prop_assert!(sample > 1000);
                        prop_assert_eq!(calc.count(), before);
                        prop_assert_eq!(calc.buckets(), before_buckets);
                    }
                    Err(e) => prop_assert!(false, "unexpected error: {}", e),
                }
            }
        }

        #[test]
        fn test_percentile_monotonic(samples in vec(0u32..1000, 1..100)) {
            let calc = calculator();
            for sample in &samples {
                calc.add(MS * *sample).expect("in range");
            }

            let mut previous = calc.percentile(0.0).expect("non-empty");
            prop_assert!(previous >= calc.min_value());
            for step in 1..=200 {
                let current = calc.percentile(f64::from(step) / 200.0).expect("non-empty");
                prop_assert!(
                    current >= previous,
                    "{:?} < {:?} at step {}",
                    current,
                    previous,
                    step
                );
                previous = current;
            }
        }
    }
}
