use std::time::Duration;

use metrics::HistogramFn;
use tracing::trace;

use crate::Calculator;

/// Records values given in seconds, following the `metrics` convention for durations.
///
/// Values that are negative, not finite, or outside of the calculator's range are dropped.
impl HistogramFn for Calculator {
    fn record(&self, value: f64) {
        match Duration::try_from_secs_f64(value) {
            // Rejections are already traced by `add`.
            Ok(value) => {
                self.add(value).ok();
            }
            Err(e) => trace!(value, error = %e, "dropped non-duration sample"),
        }
    }
}
