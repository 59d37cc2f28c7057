//! Fixed-range, fixed-resolution histograms for estimating duration percentiles.
//!
//! A [`Calculator`] tracks samples between a minimum and a maximum value by counting them in
//! equally-sized buckets.  Memory usage is fixed at construction and adding a sample is a
//! constant-time operation.  Percentiles are estimated to the precision of the bucket size.
//!
//! ```
//! use std::time::Duration;
//! use metrics_percentile::{multi_percentile, Calculator, CalculatorBuilder};
//!
//! let ms = Duration::from_millis(1);
//! let calc = Calculator::new(ms, Duration::ZERO, ms * 1000).unwrap();
//! calc.add(ms).unwrap();
//! calc.add(ms * 2).unwrap();
//! calc.add(ms * 3).unwrap();
//! assert_eq!(calc.percentile(0.5), Some(ms * 2));
//!
//! // Calculators with the same layout can be combined.
//! let other = CalculatorBuilder::new().build().unwrap();
//! other.add(ms * 4).unwrap();
//! let p50 = multi_percentile(0.5, &[&calc, &other]).unwrap();
//! assert_eq!(p50, Some(Duration::from_micros(2500)));
//! ```
#![deny(missing_docs)]
mod builder;
pub use builder::CalculatorBuilder;

mod calculator;
pub use calculator::Calculator;

mod error;
pub use error::{AddError, BuildError, MergeError};

mod handle;

mod layout;
pub use layout::Layout;

mod merge;
pub use merge::{multi_percentile, multi_percentiles};

mod rank;

mod snapshot;
pub use snapshot::Snapshot;
