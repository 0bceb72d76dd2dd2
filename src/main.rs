//! SDP Telemetry - Main Entry Point
//!
//! Connects to the sensor over a serial port, decodes its stream, logs what
//! the device reports and optionally exports the pressure chart on exit.

use anyhow::{anyhow, Context};
use chrono::Local;
use clap::Parser;
use sdp_telemetry::{
    chart::{ChartFrame, LiveChart},
    config::AppConfig,
    export::{default_export_file_name, export_to_file, ExportFormat},
    protocol::{HostCommand, RecordBatch},
    transport::{available_ports, spawn_reader, ReaderMessage, SerialLink},
};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How long the main loop waits for reader messages before checking the deadline
const RECV_TIMEOUT: Duration = Duration::from_millis(200);

/// Host tool for the SDP differential pressure logger.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Serial port, e.g. /dev/rfcomm0
    #[arg(short, long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Export the chart on exit to this file, or into this directory
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Export format: csv or json
    #[arg(long, default_value_t = ExportFormat::Csv)]
    format: ExportFormat,

    /// Stop after this many seconds
    #[arg(short, long)]
    duration: Option<u64>,

    /// Command to send to the device after connecting, without the leading slash
    #[arg(long = "command")]
    commands: Vec<String>,

    /// Also write logs to a daily rotated file in this directory
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref());

    if cli.list_ports {
        for port in available_ports()? {
            println!("{}", port);
        }
        return Ok(());
    }

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    if let Some(port) = cli.port.clone() {
        config.serial.port = port;
    }
    if let Some(baud) = cli.baud {
        config.serial.baud = baud;
    }
    config.validate()?;

    tracing::info!("Starting SDP telemetry on {}", config.serial.port);

    let link = SerialLink::open(&config.serial)?;
    let (bridge, reader_handle) =
        spawn_reader(Box::new(link), &config).context("Failed to start reader thread")?;

    for command in &cli.commands {
        bridge.send(HostCommand::Raw(command.clone()));
    }

    let (frames_tx, frames_rx) = crossbeam_channel::bounded::<ChartFrame>(4);
    let chart = LiveChart::new(&config.chart, frames_tx);
    let deadline = cli.duration.map(|secs| Instant::now() + Duration::from_secs(secs));

    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) && bridge.is_running() {
            tracing::info!("Duration elapsed, stopping");
            bridge.shutdown();
        }

        if let Some(msg) = bridge.recv_timeout(RECV_TIMEOUT) {
            match msg {
                ReaderMessage::Batch(batch) => {
                    report_batch(&batch);
                    chart.update(&batch);
                }
                ReaderMessage::Sent(command) => tracing::info!("> {}", command),
                ReaderMessage::ConnectionLost(reason) => {
                    tracing::warn!("Connection lost: {}", reason)
                }
                ReaderMessage::Stopped(stats) => {
                    tracing::info!(
                        bytes = stats.bytes_received,
                        lines = stats.lines_total,
                        records = stats.records_decoded,
                        dropped = stats.lines_dropped,
                        overflowed = stats.lines_overflowed,
                        "Decoder finished ({:.1}% dropped)",
                        stats.drop_rate()
                    );
                    break;
                }
            }
        }

        for frame in frames_rx.try_iter() {
            tracing::debug!(
                points = frame.points.len(),
                scale = frame.scale_factor,
                "Chart redraw"
            );
        }
    }

    reader_handle
        .join()
        .map_err(|_| anyhow!("Reader thread panicked"))?;

    if chart.dropped_frames() > 0 {
        tracing::debug!("{} chart frames dropped", chart.dropped_frames());
    }

    if let Some(target) = cli.export {
        let path = export_path(&target);
        let label = chart.label();
        export_to_file(&path, label.as_deref(), &chart.snapshot_points(), cli.format)
            .with_context(|| format!("Exporting chart to {}", path.display()))?;
    }

    tracing::info!("Shutting down...");
    Ok(())
}

/// Install the console logger and, when asked, a rolling file logger.
///
/// The returned guard must be kept alive for the file writer to flush.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sdp_telemetry=debug"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "sdp-telemetry.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Log the non-chart contents of a batch
fn report_batch(batch: &RecordBatch) {
    if let Some(info) = &batch.device_info {
        tracing::info!(
            free_mb = info.free_storage_mb,
            record = ?info.record_id,
            "Sensor {}",
            info
        );
    }
    for line in &batch.logs {
        tracing::info!(target: "device", "{}", line);
    }
    if let Some(status) = &batch.status {
        tracing::debug!(
            queue = status.queue_current,
            queue_max = status.queue_max,
            failed = ?status.reads_failed,
            max_read_us = status.max_read_duration_us,
            "Device status"
        );
    }
    if let Some(ambient) = &batch.ambient {
        tracing::debug!("Ambient: {}", ambient);
    }
    if let Some(temperature) = &batch.temperature {
        tracing::debug!("Temperature: {:.1} C", temperature.value);
    }
}

/// A directory target gets a timestamped file name
fn export_path(target: &Path) -> PathBuf {
    if target.is_dir() {
        target.join(default_export_file_name(&Local::now()))
    } else {
        target.to_path_buf()
    }
}
