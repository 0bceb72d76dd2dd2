//! Thread-safe chart shared between the batch producer and the UI.

use crate::chart::state::{ChartAggregator, ChartFrame, ChartState};
use crate::config::ChartConfig;
use crate::protocol::RecordBatch;
use crate::types::ChartPoint;
use crossbeam_channel::Sender;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Chart aggregation guarded by a single lock.
///
/// Every operation runs in one critical section, so a pause or clear from the
/// UI never lands in the middle of a batch. Frames are pushed to the display
/// without blocking; frames the display cannot keep up with are counted and
/// dropped.
pub struct LiveChart {
    inner: Mutex<Inner>,
}

struct Inner {
    chart: ChartAggregator,
    sink: Sender<ChartFrame>,
    dropped: u64,
}

impl Inner {
    fn push(&mut self, frame: ChartFrame) {
        if self.sink.try_send(frame).is_err() {
            self.dropped += 1;
            tracing::trace!(dropped = self.dropped, "Display not keeping up, frame dropped");
        }
    }
}

impl LiveChart {
    pub fn new(config: &ChartConfig, sink: Sender<ChartFrame>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                chart: ChartAggregator::new(config),
                sink,
                dropped: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a decoded batch, redrawing if due
    pub fn update(&self, batch: &RecordBatch) {
        self.update_at(batch, Instant::now());
    }

    /// Same as [`update`](Self::update) with an explicit current time
    pub fn update_at(&self, batch: &RecordBatch, now: Instant) {
        let mut inner = self.lock();
        if let Some(frame) = inner.chart.update(batch, now) {
            inner.push(frame);
        }
    }

    /// Drop all points and reset the time reconstruction
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.chart.clear();
        let frame = inner.chart.frame();
        inner.push(frame);
    }

    pub fn pause(&self) {
        self.lock().chart.pause();
    }

    /// Pause when active, clear when paused
    pub fn toggle(&self) {
        let mut inner = self.lock();
        let before = inner.chart.state();
        inner.chart.toggle();
        if before == ChartState::Inactive {
            let frame = inner.chart.frame();
            inner.push(frame);
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock().chart.is_active()
    }

    pub fn state(&self) -> ChartState {
        self.lock().chart.state()
    }

    /// Copy of every point currently held, for export
    pub fn snapshot_points(&self) -> Vec<ChartPoint> {
        self.lock().chart.snapshot_points()
    }

    /// Sensor description announced by the device
    pub fn label(&self) -> Option<String> {
        self.lock().chart.label().map(str::to_string)
    }

    /// Frames dropped because the display channel was full
    pub fn dropped_frames(&self) -> u64 {
        self.lock().dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PressureSample;
    use crossbeam_channel::bounded;
    use std::sync::Arc;
    use std::thread;

    fn batch(raw: i16) -> RecordBatch {
        RecordBatch {
            pressure: vec![PressureSample::new(raw, 1_000)],
            ..RecordBatch::default()
        }
    }

    #[test]
    fn test_frames_reach_sink() {
        let (tx, rx) = bounded(4);
        let chart = LiveChart::new(&ChartConfig::default(), tx);
        chart.update(&batch(60));
        let frame = rx.try_recv().unwrap();
        assert_eq!(frame.points.len(), 1);
        assert!(chart.is_active());
    }

    #[test]
    fn test_full_sink_counts_drops() {
        let (tx, _rx) = bounded(1);
        let config = ChartConfig {
            redraw_interval_ms: 0,
            ..ChartConfig::default()
        };
        let chart = LiveChart::new(&config, tx);
        chart.update(&batch(1));
        chart.update(&batch(2));
        chart.update(&batch(3));
        assert_eq!(chart.dropped_frames(), 2);
        assert_eq!(chart.snapshot_points().len(), 3);
    }

    #[test]
    fn test_clear_pushes_empty_frame() {
        let (tx, rx) = bounded(4);
        let chart = LiveChart::new(&ChartConfig::default(), tx);
        chart.update(&batch(1));
        chart.clear();
        let frames: Vec<_> = rx.try_iter().collect();
        assert_eq!(frames.len(), 2);
        assert!(frames[1].points.is_empty());
        assert_eq!(chart.state(), ChartState::Cleared);
    }

    #[test]
    fn test_concurrent_toggle_and_update() {
        let (tx, rx) = bounded(1024);
        let config = ChartConfig {
            redraw_interval_ms: 0,
            ..ChartConfig::default()
        };
        let chart = Arc::new(LiveChart::new(&config, tx));

        let producer = {
            let chart = Arc::clone(&chart);
            thread::spawn(move || {
                for i in 0..200 {
                    chart.update(&batch(i));
                }
            })
        };
        for _ in 0..50 {
            chart.toggle();
        }
        producer.join().unwrap();

        // Every frame is a consistent snapshot: x strictly increasing
        for frame in rx.try_iter() {
            assert!(frame.points.windows(2).all(|w| w[0].x < w[1].x));
        }
    }
}
