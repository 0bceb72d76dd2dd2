//! # SDP Telemetry: differential pressure sensor link
//!
//! Host side of a Sensirion SDP differential pressure logger that streams a
//! line-oriented text protocol over a serial (Bluetooth RFCOMM) link.
//!
//! ## Architecture
//!
//! - **Protocol**: incremental decoder turning raw bytes into record batches
//! - **Chart**: pause/clear state machine building a time series from batches
//! - **Transport**: serial link plus a reader thread that drives the decoder
//! - **Communication**: crossbeam channels between the reader and the consumer
//!
//! ## Configuration
//!
//! Settings are read from a TOML file, by default in the platform data
//! directory under `dev.kyivaigroup.sdp-telemetry`:
//!
//! - **Linux**: `~/.local/share/dev.kyivaigroup.sdp-telemetry/`
//! - **macOS**: `~/Library/Application Support/dev.kyivaigroup.sdp-telemetry/`
//! - **Windows**: `%APPDATA%\dev.kyivaigroup.sdp-telemetry\`
//!
//! ## Example
//!
//! ```no_run
//! use sdp_telemetry::{
//!     chart::LiveChart,
//!     config::AppConfig,
//!     transport::{spawn_reader, ReaderMessage, SerialLink},
//! };
//! use std::time::Duration;
//!
//! fn main() -> sdp_telemetry::Result<()> {
//!     let mut config = AppConfig::default();
//!     config.serial.port = "/dev/rfcomm0".into();
//!
//!     let link = SerialLink::open(&config.serial)?;
//!     let (bridge, _handle) = spawn_reader(Box::new(link), &config)?;
//!
//!     let (frames_tx, _frames_rx) = crossbeam_channel::bounded(16);
//!     let chart = LiveChart::new(&config.chart, frames_tx);
//!
//!     while let Some(msg) = bridge.recv_timeout(Duration::from_secs(1)) {
//!         if let ReaderMessage::Batch(batch) = msg {
//!             chart.update(&batch);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod chart;
pub mod config;
pub mod error;
pub mod export;
pub mod protocol;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use chart::{ChartAggregator, ChartFrame, ChartState, LiveChart};
pub use config::AppConfig;
pub use error::{Result, SensorError};
pub use protocol::{Record, RecordBatch, SerialDecoder};
pub use types::{
    AmbientSample, ChartPoint, DeviceInfo, LogLine, PressureSample, StatusSample,
    TemperatureSample,
};
