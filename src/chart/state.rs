//! Chart aggregation state machine.
//!
//! # States
//!
//! - `Cleared` - nothing shown yet; toggling does nothing
//! - `Active` - samples are plotted and flushed to the display periodically
//! - `Inactive` - paused; new samples are dropped but the running time keeps
//!   following the device and scale changes still apply
//!
//! Toggling moves `Active` to `Inactive` and `Inactive` back to `Cleared`
//! (dropping the shown history). A flush with pending points makes the
//! chart `Active`.
//!
//! # Time
//!
//! Points are stamped with the running device time from [`clock::advance`].
//! When a clock correction arrives, points that have not been flushed yet are
//! shifted by the correction. Flushed history is left alone.
//!
//! # Scale
//!
//! A new scale factor from the device rescales every point held, history
//! included, whatever the state.

use crate::chart::clock;
use crate::config::ChartConfig;
use crate::protocol::RecordBatch;
use crate::types::{ChartPoint, DeviceInfo};
use std::time::{Duration, Instant};

/// Interaction state of the chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartState {
    #[default]
    Cleared,
    Active,
    Inactive,
}

impl std::fmt::Display for ChartState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartState::Cleared => write!(f, "Cleared"),
            ChartState::Active => write!(f, "Active"),
            ChartState::Inactive => write!(f, "Paused"),
        }
    }
}

/// What the display receives on every flush
#[derive(Debug, Clone, PartialEq)]
pub struct ChartFrame {
    /// Full series to draw
    pub points: Vec<ChartPoint>,
    /// Sensor description, once the device has announced itself
    pub label: Option<String>,
    /// Scale factor the y values were computed with
    pub scale_factor: i32,
}

/// Single-threaded chart aggregation. See [`LiveChart`](crate::chart::LiveChart)
/// for the shared version.
#[derive(Debug)]
pub struct ChartAggregator {
    state: ChartState,
    /// Points already flushed to the display
    history: Vec<ChartPoint>,
    /// Points stamped since the last flush
    pending: Vec<ChartPoint>,
    /// Running device time in microseconds
    time_shift_us: u64,
    scale_factor: i32,
    label: Option<String>,
    last_flush: Option<Instant>,
    redraw_interval: Duration,
    max_points: usize,
}

impl Default for ChartAggregator {
    fn default() -> Self {
        Self::new(&ChartConfig::default())
    }
}

impl ChartAggregator {
    pub fn new(config: &ChartConfig) -> Self {
        Self {
            state: ChartState::Cleared,
            history: Vec::new(),
            pending: Vec::new(),
            time_shift_us: 0,
            scale_factor: config.default_scale_factor,
            label: None,
            last_flush: None,
            redraw_interval: Duration::from_millis(config.redraw_interval_ms),
            max_points: config.max_points.max(2),
        }
    }

    /// Apply a batch and flush to the display if the redraw interval elapsed.
    pub fn update(&mut self, batch: &RecordBatch, now: Instant) -> Option<ChartFrame> {
        if let Some(info) = &batch.device_info {
            self.apply_device_info(info);
        }

        for sample in &batch.pressure {
            let step = clock::advance(self.time_shift_us, sample);
            if let Some(correction) = step.correction_s {
                if self.state != ChartState::Inactive {
                    for point in &mut self.pending {
                        point.x += correction;
                    }
                }
            }
            self.time_shift_us = step.time_us;

            if self.state != ChartState::Inactive {
                self.pending.push(ChartPoint::new(
                    self.time_shift_us as f64 / 1e6,
                    sample.pressure_pa(self.scale_factor),
                ));
            }
        }

        self.flush_if_due(now)
    }

    fn apply_device_info(&mut self, info: &DeviceInfo) {
        self.label = Some(info.sensor_label());
        self.rescale(info.scale_factor);
    }

    /// Switch to a new scale factor, converting every held point
    pub fn rescale(&mut self, new_scale: i32) {
        if new_scale == 0 {
            tracing::warn!("Ignoring zero pressure scale factor");
            return;
        }
        if new_scale == self.scale_factor {
            return;
        }
        let ratio = self.scale_factor as f64 / new_scale as f64;
        for point in self.history.iter_mut().chain(self.pending.iter_mut()) {
            point.y *= ratio;
        }
        tracing::info!(
            old = self.scale_factor,
            new = new_scale,
            "Pressure scale factor changed"
        );
        self.scale_factor = new_scale;
    }

    fn flush_if_due(&mut self, now: Instant) -> Option<ChartFrame> {
        if self.state == ChartState::Inactive || self.pending.is_empty() {
            return None;
        }
        let due = self
            .last_flush
            .map_or(true, |last| now.saturating_duration_since(last) >= self.redraw_interval);
        if !due {
            return None;
        }

        self.history.append(&mut self.pending);
        if self.history.len() > self.max_points {
            let excess = self.history.len() / 2;
            self.history.drain(..excess);
        }
        if self.state != ChartState::Active {
            tracing::debug!(from = %self.state, "Chart active");
        }
        self.state = ChartState::Active;
        self.last_flush = Some(now);
        Some(self.frame())
    }

    /// Frame describing the current history
    pub fn frame(&self) -> ChartFrame {
        ChartFrame {
            points: self.history.clone(),
            label: self.label.clone(),
            scale_factor: self.scale_factor,
        }
    }

    /// Handle the pause/resume interaction
    pub fn toggle(&mut self) {
        match self.state {
            ChartState::Cleared => {}
            ChartState::Active => {
                tracing::debug!("Chart paused");
                self.state = ChartState::Inactive;
            }
            ChartState::Inactive => self.clear_history(),
        }
    }

    /// Pause an active chart; no effect in other states
    pub fn pause(&mut self) {
        if self.state == ChartState::Active {
            tracing::debug!("Chart paused");
            self.state = ChartState::Inactive;
        }
    }

    /// Drop everything and restart the time reconstruction
    pub fn clear(&mut self) {
        self.clear_history();
        self.time_shift_us = 0;
    }

    /// Drop the shown points but keep following the device clock
    fn clear_history(&mut self) {
        self.history.clear();
        self.pending.clear();
        self.last_flush = None;
        self.state = ChartState::Cleared;
        tracing::debug!("Chart cleared");
    }

    pub fn state(&self) -> ChartState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ChartState::Active
    }

    /// Every point held, flushed ones first, for export
    pub fn snapshot_points(&self) -> Vec<ChartPoint> {
        self.history
            .iter()
            .chain(self.pending.iter())
            .copied()
            .collect()
    }

    /// Number of points waiting for the next flush
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn time_shift_us(&self) -> u64 {
        self.time_shift_us
    }

    pub fn scale_factor(&self) -> i32 {
        self.scale_factor
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}
