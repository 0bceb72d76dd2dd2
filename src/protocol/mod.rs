//! Decoder for the line-oriented sensor telemetry protocol.
//!
//! Raw bytes flow through four stages owned by a [`SerialDecoder`]:
//!
//! ```text
//! bytes ──► [LineAssembler] ──► lines ──► classify() ──► [RecordAggregator] ──► RecordBatch
//!                                               └──────► [LogExtractor] ──────────┘
//! ```
//!
//! The decoder is total over arbitrary input: malformed lines are dropped and
//! never surface as errors. Record boundaries do not depend on how the stream
//! is chunked.

pub mod aggregator;
pub mod assembler;
pub mod command;
pub mod decoder;
pub mod log;
pub mod record;

pub use aggregator::{RecordAggregator, RecordBatch};
pub use assembler::LineAssembler;
pub use command::{handshake, HostCommand};
pub use decoder::{DecoderStats, SerialDecoder};
pub use log::{LogExtractor, ANSI_RESET};
pub use record::{classify, Record};
