//! The complete decoding stage: bytes in, record batches out.

use crate::config::DecoderConfig;
use crate::protocol::aggregator::{RecordAggregator, RecordBatch};
use crate::protocol::assembler::LineAssembler;
use crate::protocol::log::LogExtractor;
use crate::protocol::record::{classify, Record};

/// Counters describing what the decoder has seen so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Bytes passed to [`SerialDecoder::feed`]
    pub bytes_received: u64,
    /// Complete lines, empty ones included
    pub lines_total: u64,
    /// Lines that produced a data record
    pub records_decoded: u64,
    /// Tagged lines that did not match their grammar
    pub lines_dropped: u64,
    /// Lines discarded for exceeding the length cap
    pub lines_overflowed: u64,
    /// Log lines handed out by drains
    pub log_lines: u64,
}

impl DecoderStats {
    /// Share of non-empty lines that could not be decoded, in percent
    pub fn drop_rate(&self) -> f64 {
        let total = self.records_decoded + self.lines_dropped;
        if total == 0 {
            0.0
        } else {
            (self.lines_dropped as f64 / total as f64) * 100.0
        }
    }
}

/// Incremental decoder for the sensor line protocol.
///
/// Must be driven from a single producer; `feed` calls have to arrive in
/// receive order. Decoding never fails: malformed input is dropped.
#[derive(Debug)]
pub struct SerialDecoder {
    assembler: LineAssembler,
    aggregator: RecordAggregator,
    log: LogExtractor,
    stats: DecoderStats,
}

impl Default for SerialDecoder {
    fn default() -> Self {
        Self::new(&DecoderConfig::default())
    }
}

impl SerialDecoder {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            assembler: LineAssembler::new(config.line_limit()),
            aggregator: RecordAggregator::new(),
            log: LogExtractor::new(),
            stats: DecoderStats::default(),
        }
    }

    /// Decode a freshly received chunk of any size
    pub fn feed(&mut self, bytes: &[u8]) {
        self.stats.bytes_received += bytes.len() as u64;
        let Self {
            assembler,
            aggregator,
            log,
            stats,
        } = self;
        assembler.feed(bytes, |line| {
            stats.lines_total += 1;
            if line.is_empty() {
                return;
            }
            match classify(line) {
                Some(Record::Text(text)) => log.push(&text),
                Some(record) => {
                    stats.records_decoded += 1;
                    aggregator.push(record);
                }
                None => {
                    stats.lines_dropped += 1;
                    tracing::trace!(line, "Dropping malformed line");
                }
            }
        });
        self.stats.lines_overflowed = self.assembler.overflowed();
    }

    /// True once at least one pressure sample is waiting to be drained
    pub fn has_pending(&self) -> bool {
        self.aggregator.has_pending()
    }

    /// Take everything decoded since the previous drain
    pub fn drain(&mut self) -> RecordBatch {
        let logs = self.log.drain();
        self.stats.log_lines += logs.len() as u64;
        self.aggregator.drain(logs)
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }
}
