use std::time::Duration;

use thiserror::Error;

use crate::Layout;

/// Errors that could occur while recording a sample.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum AddError {
    /// The sample was smaller than the minimum value of the calculator.
    #[error("value below limit: {value:?} < {min:?}")]
    BelowMinimum {
        /// The rejected sample.
        value: Duration,
        /// The minimum value of the calculator.
        min: Duration,
    },

    /// The sample was larger than the maximum value of the calculator.
    #[error("value above limit: {value:?} > {max:?}")]
    AboveMaximum {
        /// The rejected sample.
        value: Duration,
        /// The maximum value of the calculator.
        max: Duration,
    },

    /// Recording the sample would overflow a bucket counter or the total count.
    #[error("count overflow: cannot record {n} more samples of {value:?}")]
    CountOverflow {
        /// The rejected sample.
        value: Duration,
        /// The number of occurrences that were to be recorded.
        n: u64,
    },
}

/// Errors that could occur while building a calculator.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum BuildError {
    /// The bucket size was zero.
    #[error("bucket size must be greater than zero")]
    ZeroBucketSize,

    /// The maximum value was not greater than the minimum value.
    #[error("empty value range: maximum {max:?} must be greater than minimum {min:?}")]
    EmptyRange {
        /// The configured minimum value.
        min: Duration,
        /// The configured maximum value.
        max: Duration,
    },

    /// A single bucket is wider than the whole value range, so no buckets would exist.
    #[error("bucket size {bucket_size:?} is larger than the value range {range:?}")]
    BucketLargerThanRange {
        /// The configured bucket size.
        bucket_size: Duration,
        /// The width of the value range.
        range: Duration,
    },

    /// The value range cannot be represented in nanoseconds.
    #[error("value range too large: {max:?} exceeds the representable maximum")]
    RangeTooLarge {
        /// The configured maximum value.
        max: Duration,
    },
}

/// Errors that could occur while merging calculators or snapshots.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum MergeError {
    /// No calculators were given.
    #[error("at least one calculator is required")]
    NoCalculators,

    /// The inputs do not share the same bucket layout.
    #[error("bucket layout mismatch: expected {expected:?}, found {found:?}")]
    LayoutMismatch {
        /// The layout of the first input.
        expected: Layout,
        /// The layout of the offending input.
        found: Layout,
    },
}
