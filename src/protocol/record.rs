//! Field parser for the sensor line protocol.
//!
//! Every line starts with a tag character that selects a fixed grammar:
//!
//! | Tag | Grammar | Record |
//! |-----|---------|--------|
//! | `D` | `D<i16>t<u64>` | differential pressure and time since previous sample |
//! | `C` | `C<u64>` | absolute clock of the previous `D` sample |
//! | `T` | `T<tenths>` | temperature |
//! | `P` | `P<u32>H<tenths>` or `P<u32>T<tenths>H<tenths>` | ambient pressure/humidity |
//! | `S` | `S<int>m<int>[f<int>]r<u64>` | device status |
//! | `I` | `I<int>r<int>s<int>[i<int>]m<u64>` | sensor info, free storage in bytes |
//!
//! `<tenths>` is `<digits>.<digit>` with exactly one fractional digit; only
//! temperatures may carry a leading minus.
//!
//! Any other leading character makes the whole line diagnostic log text.
//! A line whose tag is known but whose body does not match the grammar
//! exactly, or whose numbers overflow their field type, is dropped.

use crate::types::{
    AmbientSample, DeviceInfo, PressureSample, StatusSample, TemperatureSample, BYTES_PER_MB,
};
use std::str::FromStr;

/// A decoded protocol line
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Pressure(PressureSample),
    /// Absolute clock in microseconds for the most recent pressure sample
    Clock(u64),
    Temperature(TemperatureSample),
    Ambient(AmbientSample),
    Status(StatusSample),
    Info(DeviceInfo),
    /// Free text, possibly carrying ANSI color codes
    Text(String),
}

/// Classify and parse one complete line (without terminator).
///
/// Returns `None` for empty lines and for tagged lines that do not match
/// their grammar.
pub fn classify(line: &str) -> Option<Record> {
    let tag = line.chars().next()?;
    let body = &line[tag.len_utf8()..];
    match tag {
        'D' => parse_pressure(body),
        'C' => parse_clock(body),
        'T' => parse_temperature(body),
        'P' => parse_ambient(body),
        'S' => parse_status(body),
        'I' => parse_info(body),
        _ => Some(Record::Text(line.to_string())),
    }
}

fn parse_pressure(body: &str) -> Option<Record> {
    let mut fields = Fields::new(body);
    let raw_value = fields.signed::<i16>()?;
    fields.tag('t')?;
    let delta_time_us = fields.unsigned::<u64>()?;
    fields.finish()?;
    Some(Record::Pressure(PressureSample::new(raw_value, delta_time_us)))
}

fn parse_clock(body: &str) -> Option<Record> {
    let mut fields = Fields::new(body);
    let clock = fields.unsigned::<u64>()?;
    fields.finish()?;
    Some(Record::Clock(clock))
}

fn parse_temperature(body: &str) -> Option<Record> {
    let mut fields = Fields::new(body);
    let value = fields.tenths(true)?;
    fields.finish()?;
    Some(Record::Temperature(TemperatureSample { value }))
}

fn parse_ambient(body: &str) -> Option<Record> {
    let mut fields = Fields::new(body);
    // Whole pascals
    let pressure = fields.unsigned::<u32>()? as f32;
    let temperature = if fields.optional_tag('T') {
        Some(fields.tenths(true)?)
    } else {
        None
    };
    fields.tag('H')?;
    let humidity = fields.tenths(false)?;
    fields.finish()?;
    Some(Record::Ambient(AmbientSample {
        pressure,
        humidity,
        temperature,
    }))
}

fn parse_status(body: &str) -> Option<Record> {
    let mut fields = Fields::new(body);
    let queue_current = fields.unsigned::<i32>()?;
    fields.tag('m')?;
    let queue_max = fields.unsigned::<i32>()?;
    let reads_failed = if fields.optional_tag('f') {
        Some(fields.unsigned::<i32>()?)
    } else {
        None
    };
    fields.tag('r')?;
    let max_read_duration_us = fields.unsigned::<u64>()?;
    fields.finish()?;
    Some(Record::Status(StatusSample {
        queue_current,
        queue_max,
        reads_failed,
        max_read_duration_us,
    }))
}

fn parse_info(body: &str) -> Option<Record> {
    let mut fields = Fields::new(body);
    let model_number = fields.unsigned::<i32>()?;
    fields.tag('r')?;
    let range_pa = fields.unsigned::<i32>()?;
    fields.tag('s')?;
    let scale_factor = fields.unsigned::<i32>()?;
    let record_id = if fields.optional_tag('i') {
        Some(fields.unsigned::<i32>()?)
    } else {
        None
    };
    fields.tag('m')?;
    let free_storage_bytes = fields.unsigned::<u64>()?;
    fields.finish()?;
    Some(Record::Info(DeviceInfo {
        model_number,
        range_pa,
        scale_factor,
        record_id,
        free_storage_mb: free_storage_bytes / BYTES_PER_MB,
    }))
}

/// Left-to-right scanner over the body of a tagged line
struct Fields<'a> {
    rest: &'a str,
}

impl<'a> Fields<'a> {
    fn new(body: &'a str) -> Self {
        Self { rest: body }
    }

    fn digits(&mut self) -> Option<&'a str> {
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let (digits, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(digits)
    }

    fn optional_tag(&mut self, tag: char) -> bool {
        match self.rest.strip_prefix(tag) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn tag(&mut self, tag: char) -> Option<()> {
        self.optional_tag(tag).then_some(())
    }

    /// Plain decimal digits. `FromStr` rejects values that overflow `T`.
    fn unsigned<T: FromStr>(&mut self) -> Option<T> {
        self.digits()?.parse().ok()
    }

    /// Decimal digits with an optional leading minus sign
    fn signed<T: FromStr>(&mut self) -> Option<T> {
        let start = self.rest;
        let negative = self.optional_tag('-');
        let digits = self.digits()?;
        let len = digits.len() + usize::from(negative);
        start[..len].parse().ok()
    }

    /// `<digits>.<digit>`, exactly one fractional digit.
    /// Negative values are accepted only when `allow_negative` is set.
    fn tenths(&mut self, allow_negative: bool) -> Option<f32> {
        let start = self.rest;
        let negative = allow_negative && self.optional_tag('-');
        let whole = self.digits()?.len();
        self.tag('.')?;
        let fraction = self.rest.chars().next().filter(char::is_ascii_digit)?;
        self.rest = &self.rest[fraction.len_utf8()..];
        start[..usize::from(negative) + whole + 1 + fraction.len_utf8()]
            .parse()
            .ok()
    }

    fn finish(&self) -> Option<()> {
        self.rest.is_empty().then_some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressure_line() {
        assert_eq!(
            classify("D12t500"),
            Some(Record::Pressure(PressureSample::new(12, 500)))
        );
        assert_eq!(
            classify("D-32768t0"),
            Some(Record::Pressure(PressureSample::new(i16::MIN, 0)))
        );
    }

    #[test]
    fn test_pressure_overflow_is_dropped() {
        assert_eq!(classify("D32768t500"), None);
        assert_eq!(classify("D1t18446744073709551616"), None);
    }

    #[test]
    fn test_pressure_grammar_mismatch() {
        assert_eq!(classify("D12"), None);
        assert_eq!(classify("D12t"), None);
        assert_eq!(classify("D12t500x"), None);
        assert_eq!(classify("D+12t500"), None);
        assert_eq!(classify("D12t-5"), None);
        assert_eq!(classify("d12t500"), Some(Record::Text("d12t500".into())));
    }

    #[test]
    fn test_clock_line() {
        assert_eq!(classify("C1000000"), Some(Record::Clock(1_000_000)));
        assert_eq!(classify("C"), None);
        assert_eq!(classify("C-1"), None);
    }

    #[test]
    fn test_temperature_line() {
        assert_eq!(
            classify("T23.5"),
            Some(Record::Temperature(TemperatureSample { value: 23.5 }))
        );
        assert_eq!(
            classify("T-4.0"),
            Some(Record::Temperature(TemperatureSample { value: -4.0 }))
        );
        assert_eq!(classify("T23.55"), None);
        assert_eq!(classify("T23."), None);
        assert_eq!(classify("T23"), None);
        assert_eq!(classify("T.5"), None);
    }

    #[test]
    fn test_ambient_variants() {
        assert_eq!(
            classify("P101325H45.5"),
            Some(Record::Ambient(AmbientSample {
                pressure: 101325.0,
                humidity: 45.5,
                temperature: None,
            }))
        );
        assert_eq!(
            classify("P101325T21.0H40.0"),
            Some(Record::Ambient(AmbientSample {
                pressure: 101325.0,
                humidity: 40.0,
                temperature: Some(21.0),
            }))
        );
        assert_eq!(classify("P101325"), None);
        assert_eq!(classify("P101325H45"), None);
        assert_eq!(classify("P101325.5H45.0"), None);
        assert_eq!(classify("P101325T21H40.0"), None);
        assert_eq!(classify("PH45.5"), None);
    }

    #[test]
    fn test_status_variants() {
        assert_eq!(
            classify("S3m10r1500"),
            Some(Record::Status(StatusSample {
                queue_current: 3,
                queue_max: 10,
                reads_failed: None,
                max_read_duration_us: 1500,
            }))
        );
        assert_eq!(
            classify("S3m10f2r1500"),
            Some(Record::Status(StatusSample {
                queue_current: 3,
                queue_max: 10,
                reads_failed: Some(2),
                max_read_duration_us: 1500,
            }))
        );
        assert_eq!(classify("S3m10f2"), None);
    }

    #[test]
    fn test_info_line() {
        assert_eq!(
            classify("I100r500s60m104857600"),
            Some(Record::Info(DeviceInfo {
                model_number: 100,
                range_pa: 500,
                scale_factor: 60,
                record_id: None,
                free_storage_mb: 100,
            }))
        );
        assert_eq!(
            classify("I31r500s60i7m1048575"),
            Some(Record::Info(DeviceInfo {
                model_number: 31,
                range_pa: 500,
                scale_factor: 60,
                record_id: Some(7),
                free_storage_mb: 0,
            }))
        );
        assert_eq!(classify("I31r500s99999999999m0"), None);
    }

    #[test]
    fn test_free_text_and_empty() {
        assert_eq!(classify(""), None);
        assert_eq!(
            classify("\u{1b}[0;32mboot ok"),
            Some(Record::Text("\u{1b}[0;32mboot ok".into()))
        );
    }
}
