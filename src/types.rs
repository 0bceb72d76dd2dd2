//! Core data types for sdp-telemetry
//!
//! This module contains the records decoded from the sensor line protocol
//! and the points the live chart is built from.
//!
//! # Main Types
//!
//! - [`PressureSample`] - One differential pressure reading with its time delta
//! - [`AmbientSample`] - Barometric pressure, humidity and optional temperature
//! - [`TemperatureSample`] - Stand-alone temperature reading
//! - [`StatusSample`] - Device queue and sensor read health
//! - [`DeviceInfo`] - Sensor model, range and pressure scale announced by the device
//! - [`LogLine`] - Diagnostic text printed by the firmware
//! - [`ChartPoint`] - A point of the rendered series (seconds, Pa)
//!
//! # Pressure Scale
//!
//! The sensor reports differential pressure as a raw `i16`. Dividing by the
//! scale factor announced in [`DeviceInfo`] gives Pascals. Until the device
//! announces one, [`DEFAULT_PRESSURE_SCALE`] is assumed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scale factor of the SDP3x family, used before the device announces its own
pub const DEFAULT_PRESSURE_SCALE: i32 = 60;

/// Divisor turning the device's free storage byte count into megabytes
pub const BYTES_PER_MB: u64 = 1 << 20;

/// A single differential pressure reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PressureSample {
    /// Raw sensor value, divide by the scale factor to get Pa
    pub raw_value: i16,
    /// Microseconds elapsed since the previous sample
    pub delta_time_us: u64,
    /// Absolute device clock in microseconds since boot, attached by a later `C` line
    absolute_clock_us: Option<u64>,
}

impl PressureSample {
    /// Create a sample that has no absolute clock yet
    pub fn new(raw_value: i16, delta_time_us: u64) -> Self {
        Self {
            raw_value,
            delta_time_us,
            absolute_clock_us: None,
        }
    }

    /// Create a sample with its absolute clock already known
    pub fn with_clock(raw_value: i16, delta_time_us: u64, clock_us: u64) -> Self {
        Self {
            raw_value,
            delta_time_us,
            absolute_clock_us: Some(clock_us),
        }
    }

    /// Absolute device clock attached to this sample, if any
    pub fn absolute_clock_us(&self) -> Option<u64> {
        self.absolute_clock_us
    }

    /// Attach the absolute clock. The clock can only be set once; returns
    /// `false` and leaves the sample untouched if it was already set.
    pub(crate) fn attach_clock(&mut self, clock_us: u64) -> bool {
        if self.absolute_clock_us.is_some() {
            return false;
        }
        self.absolute_clock_us = Some(clock_us);
        true
    }

    /// Differential pressure in Pa for the given scale factor
    pub fn pressure_pa(&self, scale_factor: i32) -> f64 {
        self.raw_value as f64 / scale_factor as f64
    }
}

impl fmt::Display for PressureSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            format_time_delta(self.delta_time_us),
            self.raw_value
        )
    }
}

/// Format a microsecond delta as `MM:SS.mmm.uuu`, prefixed with hours when non-zero
pub fn format_time_delta(us: u64) -> String {
    let micros = us % 1000;
    let millis = (us % 1_000_000) / 1000;
    let secs = us / 1_000_000;
    let minutes = (secs % 3600) / 60;
    let hours = secs / 3600;
    if hours > 0 {
        format!(
            "{:02} {:02}:{:02}.{:03}.{:03}",
            hours,
            minutes,
            secs % 60,
            millis,
            micros
        )
    } else {
        format!("{:02}:{:02}.{:03}.{:03}", minutes, secs % 60, millis, micros)
    }
}

/// Barometric reading from the ambient sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbientSample {
    /// Atmospheric pressure in Pa
    pub pressure: f32,
    /// Relative humidity in percent
    pub humidity: f32,
    /// Temperature in °C, only reported by the BMP protocol variant
    pub temperature: Option<f32>,
}

impl fmt::Display for AmbientSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.0} atm. Pa, {:.1} humidity",
            self.pressure, self.humidity
        )
    }
}

/// Temperature reported on its own `T` line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureSample {
    /// Temperature in °C
    pub value: f32,
}

/// Device health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSample {
    /// Messages currently waiting in the device's output queue
    pub queue_current: i32,
    /// High-water mark of the output queue
    pub queue_max: i32,
    /// Failed sensor reads, absent in older firmware
    pub reads_failed: Option<i32>,
    /// Longest sensor read in microseconds
    pub max_read_duration_us: u64,
}

/// Sensor and storage information announced by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// SDP model number (e.g. 31, 32, 33)
    pub model_number: i32,
    /// Measurement range in Pa
    pub range_pa: i32,
    /// Divisor from raw pressure to Pa
    pub scale_factor: i32,
    /// Index of the record file the device is writing to, absent in older firmware
    pub record_id: Option<i32>,
    /// Free space on the device's SD card in MB
    pub free_storage_mb: u64,
}

impl DeviceInfo {
    /// Short sensor label used as chart description, e.g. `SDP31 500Pa`
    pub fn sensor_label(&self) -> String {
        format!("SDP{} {}Pa", self.model_number, self.range_pa)
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SDP{} {}Pa", self.model_number, self.range_pa)
    }
}

/// One line of firmware diagnostic output, with ANSI styling removed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogLine(pub String);

impl LogLine {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogLine {
    fn from(s: &str) -> Self {
        LogLine(s.to_string())
    }
}

/// A point of the chart series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Device time in seconds
    pub x: f64,
    /// Differential pressure in Pa
    pub y: f64,
}

impl ChartPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_set_once() {
        let mut sample = PressureSample::new(12, 500);
        assert_eq!(sample.absolute_clock_us(), None);
        assert!(sample.attach_clock(1_000_000));
        assert!(!sample.attach_clock(2_000_000));
        assert_eq!(sample.absolute_clock_us(), Some(1_000_000));
    }

    #[test]
    fn test_pressure_scaling() {
        let sample = PressureSample::new(-120, 0);
        assert_eq!(sample.pressure_pa(60), -2.0);
    }

    #[test]
    fn test_format_time_delta() {
        assert_eq!(format_time_delta(1_234_567), "00:01.234.567");
        assert_eq!(format_time_delta(3_661_000_001), "01 01:01.000.001");
        assert_eq!(PressureSample::new(7, 500).to_string(), "[00:00.000.500] 7");
    }

    #[test]
    fn test_device_info_label() {
        let info = DeviceInfo {
            model_number: 31,
            range_pa: 500,
            scale_factor: 60,
            record_id: None,
            free_storage_mb: 0,
        };
        assert_eq!(info.sensor_label(), "SDP31 500Pa");
        assert_eq!(info.to_string(), "SDP31 500Pa");
    }

    #[test]
    fn test_ambient_display() {
        let ambient = AmbientSample {
            pressure: 101325.0,
            humidity: 45.27,
            temperature: None,
        };
        assert_eq!(ambient.to_string(), "101325 atm. Pa, 45.3 humidity");
    }
}
