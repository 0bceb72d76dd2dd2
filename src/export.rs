//! Export of a chart snapshot to disk.
//!
//! Two formats are supported:
//! - **CSV**: the sensor label on the first line, then one `time,pressure`
//!   row per point. Time has microsecond precision, pressure four decimals.
//! - **JSON lines**: one `{"t":..,"v":..}` object per point.

use crate::error::{Result, ResultExt, SensorError};
use crate::types::ChartPoint;
use chrono::{DateTime, TimeZone};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// File name used when the user exports without choosing one
pub const EXPORT_FILE_NAME_FORMAT: &str = "%Y.%m.%d %H:%M:%S.txt";

/// Export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = SensorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" | "txt" => Ok(ExportFormat::Csv),
            "json" | "jsonl" => Ok(ExportFormat::Json),
            other => Err(SensorError::Export(format!("unknown export format '{}'", other))),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Json => write!(f, "json"),
        }
    }
}

/// Write `points` to `writer`, returning the number of points written.
///
/// Nothing is written for an empty snapshot, not even the label.
pub fn export_points<W: Write>(
    writer: &mut W,
    label: Option<&str>,
    points: &[ChartPoint],
    format: ExportFormat,
) -> Result<usize> {
    if points.is_empty() {
        return Ok(0);
    }

    match format {
        ExportFormat::Csv => {
            if let Some(label) = label {
                writeln!(writer, "{}", label)?;
            }
            for point in points {
                writeln!(writer, "{:.6},{:.4}", point.x, point.y)?;
            }
        }
        ExportFormat::Json => {
            for point in points {
                writeln!(writer, r#"{{"t":{:.6},"v":{:.4}}}"#, point.x, point.y)?;
            }
        }
    }

    writer.flush()?;
    Ok(points.len())
}

/// Export to a file, creating parent directories as needed.
pub fn export_to_file(
    path: impl AsRef<Path>,
    label: Option<&str>,
    points: &[ChartPoint],
    format: ExportFormat,
) -> Result<usize> {
    let path = path.as_ref();
    if points.is_empty() {
        tracing::debug!("Nothing to export");
        return Ok(0);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create export directory {:?}", parent))?;
    }

    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    let written = export_points(&mut writer, label, points, format)
        .with_context(|| format!("Failed to write {:?}", path))?;

    tracing::info!("Exported {} points to {:?}", written, path);
    Ok(written)
}

/// Default export file name derived from the current time
pub fn default_export_file_name<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    now.format(EXPORT_FILE_NAME_FORMAT).to_string()
}
