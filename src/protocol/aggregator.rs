//! Accumulation of decoded records between drains.
//!
//! Pressure samples are kept in full. Ambient, temperature and status
//! updates arrive at a high rate and only the newest of each survives until
//! the next drain. Device info is a one-shot event: it is handed to exactly
//! one batch and then forgotten until the device announces it again.

use crate::protocol::record::Record;
use crate::types::{
    AmbientSample, DeviceInfo, LogLine, PressureSample, StatusSample, TemperatureSample,
};

/// Immutable snapshot of everything decoded since the previous drain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch {
    /// Pressure samples in arrival order
    pub pressure: Vec<PressureSample>,
    /// Newest ambient reading
    pub ambient: Option<AmbientSample>,
    /// Newest stand-alone temperature reading
    pub temperature: Option<TemperatureSample>,
    /// Newest device status
    pub status: Option<StatusSample>,
    /// Device info announced since the previous drain
    pub device_info: Option<DeviceInfo>,
    /// Firmware log lines in arrival order
    pub logs: Vec<LogLine>,
}

impl RecordBatch {
    /// True when the batch carries no record of any kind
    pub fn is_empty(&self) -> bool {
        self.pressure.is_empty()
            && self.ambient.is_none()
            && self.temperature.is_none()
            && self.status.is_none()
            && self.device_info.is_none()
            && self.logs.is_empty()
    }
}

/// Owns decoded records until they are drained into a [`RecordBatch`]
#[derive(Debug, Default)]
pub struct RecordAggregator {
    pressure: Vec<PressureSample>,
    ambient: Option<AmbientSample>,
    temperature: Option<TemperatureSample>,
    status: Option<StatusSample>,
    device_info: Option<DeviceInfo>,
}

impl RecordAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a parsed record. Text records are not handled here and are ignored.
    pub fn push(&mut self, record: Record) {
        match record {
            Record::Pressure(sample) => self.pressure.push(sample),
            Record::Clock(clock_us) => self.attach_clock(clock_us),
            Record::Temperature(sample) => self.temperature = Some(sample),
            Record::Ambient(sample) => self.ambient = Some(sample),
            Record::Status(sample) => self.status = Some(sample),
            Record::Info(info) => {
                tracing::debug!(sensor = %info, "Device info announced");
                self.device_info = Some(info);
            }
            Record::Text(_) => {}
        }
    }

    fn attach_clock(&mut self, clock_us: u64) {
        match self.pressure.last_mut() {
            Some(sample) => {
                if !sample.attach_clock(clock_us) {
                    tracing::trace!(clock_us, "Sample already has a clock, ignoring");
                }
            }
            None => tracing::trace!(clock_us, "Clock without pending sample, ignoring"),
        }
    }

    /// True once at least one pressure sample is buffered
    pub fn has_pending(&self) -> bool {
        !self.pressure.is_empty()
    }

    /// Number of buffered pressure samples
    pub fn pending_samples(&self) -> usize {
        self.pressure.len()
    }

    /// Move all buffered records into a batch and reset the buffers.
    /// `logs` are attached as given.
    pub fn drain(&mut self, logs: Vec<LogLine>) -> RecordBatch {
        RecordBatch {
            pressure: std::mem::take(&mut self.pressure),
            ambient: self.ambient.take(),
            temperature: self.temperature.take(),
            status: self.status.take(),
            device_info: self.device_info.take(),
            logs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(scale: i32) -> DeviceInfo {
        DeviceInfo {
            model_number: 31,
            range_pa: 500,
            scale_factor: scale,
            record_id: None,
            free_storage_mb: 10,
        }
    }

    #[test]
    fn test_pressure_signals_pending() {
        let mut agg = RecordAggregator::new();
        agg.push(Record::Status(StatusSample {
            queue_current: 1,
            queue_max: 2,
            reads_failed: None,
            max_read_duration_us: 3,
        }));
        agg.push(Record::Info(info(60)));
        assert!(!agg.has_pending());
        agg.push(Record::Pressure(PressureSample::new(1, 2)));
        assert!(agg.has_pending());
    }

    #[test]
    fn test_clock_attaches_to_last_sample() {
        let mut agg = RecordAggregator::new();
        agg.push(Record::Pressure(PressureSample::new(1, 10)));
        agg.push(Record::Pressure(PressureSample::new(2, 10)));
        agg.push(Record::Clock(5000));
        let batch = agg.drain(Vec::new());
        assert_eq!(batch.pressure[0].absolute_clock_us(), None);
        assert_eq!(batch.pressure[1].absolute_clock_us(), Some(5000));
    }

    #[test]
    fn test_clock_after_drain_is_ignored() {
        let mut agg = RecordAggregator::new();
        agg.push(Record::Pressure(PressureSample::new(1, 10)));
        let _ = agg.drain(Vec::new());
        agg.push(Record::Clock(5000));
        agg.push(Record::Pressure(PressureSample::new(2, 10)));
        let batch = agg.drain(Vec::new());
        assert_eq!(batch.pressure[0].absolute_clock_us(), None);
    }

    #[test]
    fn test_last_seen_values_are_coalesced() {
        let mut agg = RecordAggregator::new();
        agg.push(Record::Temperature(TemperatureSample { value: 20.0 }));
        agg.push(Record::Temperature(TemperatureSample { value: 21.5 }));
        let batch = agg.drain(Vec::new());
        assert_eq!(batch.temperature, Some(TemperatureSample { value: 21.5 }));
        assert!(agg.drain(Vec::new()).temperature.is_none());
    }

    #[test]
    fn test_device_info_delivered_once() {
        let mut agg = RecordAggregator::new();
        agg.push(Record::Info(info(30)));
        assert_eq!(agg.drain(Vec::new()).device_info, Some(info(30)));
        assert_eq!(agg.drain(Vec::new()).device_info, None);
        agg.push(Record::Info(info(60)));
        assert_eq!(agg.drain(Vec::new()).device_info, Some(info(60)));
    }

    #[test]
    fn test_drain_empty() {
        let mut agg = RecordAggregator::new();
        let batch = agg.drain(Vec::new());
        assert!(batch.is_empty());
        assert_eq!(batch, RecordBatch::default());
    }
}
