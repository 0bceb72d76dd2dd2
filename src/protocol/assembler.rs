//! Splits the raw byte stream into protocol lines.
//!
//! Bytes are taken as single-byte characters. `\r` is dropped everywhere and
//! `\n` terminates the pending line. A line that grows past the configured
//! cap is discarded up to and including its terminator, so a corrupted stream
//! without newlines cannot grow the buffer without bound.

/// Incremental line splitter that keeps partial lines across chunks
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: String,
    /// Input bytes in `pending`; high bytes take two bytes of UTF-8 there
    pending_bytes: usize,
    max_line_len: Option<usize>,
    /// Set while skipping the rest of an oversized line
    discarding: bool,
    overflowed: u64,
}

impl LineAssembler {
    /// Create an assembler. `None` means no line length limit.
    pub fn new(max_line_len: Option<usize>) -> Self {
        Self {
            pending: String::with_capacity(max_line_len.unwrap_or(256).min(256)),
            pending_bytes: 0,
            max_line_len,
            discarding: false,
            overflowed: 0,
        }
    }

    /// Append `bytes`, calling `on_line` for every line completed by them.
    pub fn feed<F>(&mut self, bytes: &[u8], mut on_line: F)
    where
        F: FnMut(&str),
    {
        for &byte in bytes {
            match byte {
                b'\r' => {}
                b'\n' => {
                    if self.discarding {
                        self.discarding = false;
                    } else {
                        on_line(&self.pending);
                    }
                    self.pending.clear();
                    self.pending_bytes = 0;
                }
                _ if self.discarding => {}
                _ => {
                    if self
                        .max_line_len
                        .is_some_and(|max| self.pending_bytes >= max)
                    {
                        tracing::warn!(
                            max_line_len = self.max_line_len,
                            "Discarding oversized line without terminator"
                        );
                        self.pending.clear();
                        self.pending_bytes = 0;
                        self.discarding = true;
                        self.overflowed += 1;
                        continue;
                    }
                    self.pending.push(char::from(byte));
                    self.pending_bytes += 1;
                }
            }
        }
    }

    /// Input bytes held for the not yet terminated line
    pub fn pending_len(&self) -> usize {
        self.pending_bytes
    }

    /// Number of lines discarded for exceeding the length cap
    pub fn overflowed(&self) -> u64 {
        self.overflowed
    }
}
