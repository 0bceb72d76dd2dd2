//! Transport between the host and the sensor
//!
//! The link is abstracted behind [`SensorLink`] so the reader loop can run
//! against a real serial port or an in-memory script.
//!
//! - [`SerialLink`] - serial port (typically an RFCOMM-bound Bluetooth device)
//! - [`ReaderWorker`] - reader loop feeding the decoder, run on its own thread
//! - [`ReaderBridge`] - consumer-side handle for commands and messages

pub mod link;
pub mod worker;

pub use link::{available_ports, SensorLink, SerialLink};
pub use worker::{spawn_reader, ReaderBridge, ReaderCommand, ReaderMessage, ReaderWorker};
