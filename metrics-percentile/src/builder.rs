use std::time::Duration;

use crate::{BuildError, Calculator, Layout};

const DEFAULT_BUCKET_SIZE: Duration = Duration::from_millis(1);
const DEFAULT_MIN_VALUE: Duration = Duration::ZERO;
const DEFAULT_MAX_VALUE: Duration = Duration::from_secs(1);

/// Builder for a [`Calculator`].
#[derive(Clone, Debug)]
pub struct CalculatorBuilder {
    bucket_size: Duration,
    min_value: Duration,
    max_value: Duration,
}

impl CalculatorBuilder {
    /// Creates a new [`CalculatorBuilder`] with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the width of a single bucket.
    ///
    /// Smaller buckets give more precise estimates at the cost of memory: each bucket is a single
    /// 64-bit counter.
    ///
    /// Defaults to 1 millisecond.
    #[must_use]
    pub fn with_bucket_size(mut self, bucket_size: Duration) -> Self {
        self.bucket_size = bucket_size;
        self
    }

    /// Set the smallest accepted sample.
    ///
    /// Defaults to zero.
    #[must_use]
    pub fn with_min_value(mut self, min_value: Duration) -> Self {
        self.min_value = min_value;
        self
    }

    /// Set the largest accepted sample.
    ///
    /// Defaults to 1 second.
    #[must_use]
    pub fn with_max_value(mut self, max_value: Duration) -> Self {
        self.max_value = max_value;
        self
    }

    /// Set both ends of the accepted range.
    #[must_use]
    pub fn with_range(self, min_value: Duration, max_value: Duration) -> Self {
        self.with_min_value(min_value).with_max_value(max_value)
    }

    /// Builds the bucket layout without creating a calculator.
    ///
    /// Useful for creating several calculators that are meant to be merged.
    ///
    /// # Errors
    ///
    /// If the configuration is not valid, an error is returned.  See [`Layout::new`] for details.
    pub fn layout(&self) -> Result<Layout, BuildError> {
        Layout::new(self.bucket_size, self.min_value, self.max_value)
    }

    /// Builds the calculator.
    ///
    /// # Errors
    ///
    /// If the configuration is not valid, an error is returned.  See [`Layout::new`] for details.
    pub fn build(self) -> Result<Calculator, BuildError> {
        self.layout().map(Calculator::with_layout)
    }
}

impl Default for CalculatorBuilder {
    fn default() -> Self {
        CalculatorBuilder {
            bucket_size: DEFAULT_BUCKET_SIZE,
            min_value: DEFAULT_MIN_VALUE,
            max_value: DEFAULT_MAX_VALUE,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::CalculatorBuilder;
    use crate::BuildError;

    #[test]
    fn test_defaults() {
        let calc = CalculatorBuilder::new().build().expect("defaults are valid");
        assert_eq!(calc.bucket_size(), Duration::from_millis(1));
        assert_eq!(calc.min_value(), Duration::ZERO);
        assert_eq!(calc.max_value(), Duration::from_secs(1));
        assert_eq!(calc.bucket_count(), 1000);
    }

    #[test]
    fn test_overrides() {
        let calc = CalculatorBuilder::new()
            .with_bucket_size(Duration::from_micros(100))
            .with_range(Duration::from_millis(5), Duration::from_millis(10))
            .build()
            .expect("valid configuration");
        assert_eq!(calc.bucket_count(), 50);
        assert_eq!(calc.min_value(), Duration::from_millis(5));

        let builder = CalculatorBuilder::new().with_bucket_size(Duration::from_millis(10));
        let layout = builder.layout().expect("valid configuration");
        assert_eq!(layout, *builder.build().expect("valid configuration").layout());
    }

    #[test]
    fn test_invalid() {
        let result = CalculatorBuilder::new().with_max_value(Duration::ZERO).build();
        assert_eq!(
            result.err(),
            Some(BuildError::EmptyRange { min: Duration::ZERO, max: Duration::ZERO })
        );

        let result = CalculatorBuilder::new().with_bucket_size(Duration::ZERO).build();
        assert_eq!(result.err(), Some(BuildError::ZeroBucketSize));
    }
}
