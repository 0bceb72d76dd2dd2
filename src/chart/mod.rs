//! Live chart aggregation of decoded pressure samples.
//!
//! [`ChartAggregator`] turns record batches into a bounded series of
//! [`ChartPoint`](crate::types::ChartPoint)s with absolute device time,
//! handles pause/clear interaction and throttles redraws. [`LiveChart`]
//! wraps it for use from the reader thread and the UI at the same time.

pub mod clock;
pub mod live;
pub mod state;

pub use clock::{advance, ClockStep};
pub use live::LiveChart;
pub use state::{ChartAggregator, ChartFrame, ChartState};
