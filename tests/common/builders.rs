//! Builders for protocol streams

/// Builder for a byte stream as the device would send it
#[derive(Debug, Default, Clone)]
pub struct StreamBuilder {
    text: String,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `D` line: raw pressure and microseconds since the previous sample
    pub fn pressure(mut self, raw: i16, delta_us: u64) -> Self {
        self.text.push_str(&format!("D{}t{}\r\n", raw, delta_us));
        self
    }

    /// `C` line: absolute clock of the previous sample
    pub fn clock(mut self, clock_us: u64) -> Self {
        self.text.push_str(&format!("C{}\r\n", clock_us));
        self
    }

    /// `I` line with the free storage given in bytes
    pub fn info(mut self, model: i32, range_pa: i32, scale: i32, free_bytes: u64) -> Self {
        self.text
            .push_str(&format!("I{}r{}s{}m{}\r\n", model, range_pa, scale, free_bytes));
        self
    }

    pub fn temperature(mut self, value: &str) -> Self {
        self.text.push_str(&format!("T{}\r\n", value));
        self
    }

    pub fn ambient(mut self, pressure: &str, humidity: &str) -> Self {
        self.text.push_str(&format!("P{}H{}\r\n", pressure, humidity));
        self
    }

    pub fn status(mut self, queue: i32, queue_max: i32, max_read_us: u64) -> Self {
        self.text
            .push_str(&format!("S{}m{}r{}\r\n", queue, queue_max, max_read_us));
        self
    }

    /// Colored firmware log entry
    pub fn log(mut self, color: u8, text: &str) -> Self {
        self.text
            .push_str(&format!("\u{1b}[0;3{}m{}\u{1b}[0m\r\n", color % 10, text));
        self
    }

    /// Arbitrary text, no terminator added
    pub fn raw(mut self, text: &str) -> Self {
        self.text.push_str(text);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.text.into_bytes()
    }
}

/// Split `bytes` into chunks of at most `size` bytes
pub fn chunked(bytes: &[u8], size: usize) -> Vec<Vec<u8>> {
    bytes.chunks(size.max(1)).map(<[u8]>::to_vec).collect()
}

/// Split `bytes` at the given offsets (sorted and clamped)
pub fn split_at_offsets(bytes: &[u8], offsets: &[usize]) -> Vec<Vec<u8>> {
    let mut cuts: Vec<usize> = offsets.iter().map(|&o| o.min(bytes.len())).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut chunks = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        chunks.push(bytes[start..cut].to_vec());
        start = cut;
    }
    chunks.push(bytes[start..].to_vec());
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_builder() {
        let bytes = StreamBuilder::new().pressure(-5, 100).clock(42).build();
        assert_eq!(bytes, b"D-5t100\r\nC42\r\n");
    }

    #[test]
    fn test_split_at_offsets() {
        let chunks = split_at_offsets(b"abcdef", &[4, 2, 2, 10]);
        assert_eq!(chunks, vec![b"ab".to_vec(), b"cd".to_vec(), b"ef".to_vec(), vec![]]);
    }
}
