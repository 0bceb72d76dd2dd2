//! Reconstruction of absolute sample time.
//!
//! Pressure samples carry the time since the previous sample. Every so often
//! the device also reports its absolute clock for a sample. The running time
//! is advanced by each delta first, and only then compared against the
//! absolute clock; the difference is the error accumulated by the estimate
//! since the last correction.

use crate::types::PressureSample;

/// Outcome of advancing the running time by one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockStep {
    /// Running time after this sample, in microseconds
    pub time_us: u64,
    /// Seconds to add to earlier unflushed points, when the sample carried a clock
    pub correction_s: Option<f64>,
}

/// Advance `running_us` by the sample's delta, then reconcile with its
/// absolute clock if one is attached.
pub fn advance(running_us: u64, sample: &PressureSample) -> ClockStep {
    let estimate = running_us.saturating_add(sample.delta_time_us);
    match sample.absolute_clock_us() {
        Some(clock) => ClockStep {
            time_us: clock,
            correction_s: Some((clock as f64 - estimate as f64) / 1e6),
        },
        None => ClockStep {
            time_us: estimate,
            correction_s: None,
        },
    }
}
