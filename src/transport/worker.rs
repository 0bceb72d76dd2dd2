//! Reader worker thread
//!
//! The worker owns the link and the decoder. It runs in its own thread and
//! talks to the consumer through crossbeam channels.
//!
//! # Responsibilities
//!
//! - **Handshake**: requests the sensor info and syncs the device clock on start
//! - **Reading**: reads one chunk per iteration and feeds it to the decoder
//! - **Batching**: forwards a [`RecordBatch`] whenever the decoder has something
//! - **Clock sync**: re-sends the host clock periodically
//! - **Commands**: forwards user commands to the device
//!
//! On a link error the worker reports [`ReaderMessage::ConnectionLost`] and
//! stops. It finishes with [`ReaderMessage::Stopped`].
//!
//! The worker never blocks on a full message queue: batches the consumer has
//! no room for are dropped and counted, and the closing messages give up
//! after a short timeout.

use crate::config::{AppConfig, ClockSyncConfig};
use crate::protocol::{handshake, DecoderStats, HostCommand, RecordBatch, SerialDecoder};
use crate::transport::link::SensorLink;
use chrono::{Local, Utc};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Channel capacity for commands (consumer → worker)
const CMD_CHANNEL_CAPACITY: usize = 64;
/// Channel capacity for messages (worker → consumer)
const MSG_CHANNEL_CAPACITY: usize = 1_024;
/// How long the last messages of a stopping worker wait for queue space
const FINAL_SEND_TIMEOUT: Duration = Duration::from_millis(250);

/// Commands accepted by the reader worker
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderCommand {
    /// Send a command to the device
    Send(HostCommand),
    /// Stop the worker
    Shutdown,
}

/// Messages emitted by the reader worker
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderMessage {
    /// Records decoded since the previous batch
    Batch(RecordBatch),
    /// A user visible command was written to the device
    Sent(HostCommand),
    /// The link failed; the worker is stopping
    ConnectionLost(String),
    /// The worker has exited
    Stopped(DecoderStats),
}

/// The reader loop. See the module docs.
pub struct ReaderWorker {
    link: Box<dyn SensorLink>,
    decoder: SerialDecoder,
    command_rx: Receiver<ReaderCommand>,
    message_tx: Sender<ReaderMessage>,
    running: Arc<AtomicBool>,
    buffer: Vec<u8>,
    poll_interval: Duration,
    clock_sync: ClockSyncConfig,
    next_sync: Option<Instant>,
    dropped_messages: u64,
}

impl ReaderWorker {
    pub fn new(
        link: Box<dyn SensorLink>,
        config: &AppConfig,
        command_rx: Receiver<ReaderCommand>,
        message_tx: Sender<ReaderMessage>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            link,
            decoder: SerialDecoder::new(&config.decoder),
            command_rx,
            message_tx,
            running,
            buffer: vec![0; config.serial.read_buffer_size.max(1)],
            poll_interval: config.serial.poll_interval(),
            clock_sync: config.clock_sync.clone(),
            next_sync: None,
            dropped_messages: 0,
        }
    }

    /// Run the main worker loop
    pub fn run(&mut self) {
        tracing::info!("Reader worker started");

        if self.write(&handshake(&Local::now())) {
            tracing::debug!("Handshake sent");
            if self.clock_sync.enabled {
                self.next_sync =
                    Some(Instant::now() + Duration::from_millis(self.clock_sync.initial_delay_ms));
            }
        }

        while self.running.load(Ordering::SeqCst) {
            self.process_commands();
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            self.sync_clock_if_due(Instant::now());
            self.read_once();

            if !self.poll_interval.is_zero() && self.running.load(Ordering::SeqCst) {
                std::thread::sleep(self.poll_interval);
            }
        }

        // Hand out whatever is complete before stopping
        if self.decoder.has_pending() {
            let batch = self.decoder.drain();
            self.emit_final(ReaderMessage::Batch(batch));
        }

        let stats = self.decoder.stats();
        tracing::info!(
            bytes = stats.bytes_received,
            records = stats.records_decoded,
            dropped = stats.lines_dropped,
            dropped_messages = self.dropped_messages,
            "Reader worker stopped"
        );
        self.emit_final(ReaderMessage::Stopped(stats));
    }

    /// Messages the consumer had no room for
    pub fn dropped_messages(&self) -> u64 {
        self.dropped_messages
    }

    /// Process pending commands from the consumer
    fn process_commands(&mut self) {
        loop {
            match self.command_rx.try_recv() {
                Ok(cmd) => self.handle_command(cmd),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
    }

    fn handle_command(&mut self, cmd: ReaderCommand) {
        match cmd {
            ReaderCommand::Send(command) => self.send_command(command),
            ReaderCommand::Shutdown => self.running.store(false, Ordering::SeqCst),
        }
    }

    fn send_command(&mut self, command: HostCommand) {
        let Some(bytes) = command.encode() else {
            tracing::debug!("Skipping empty command");
            return;
        };
        if self.write(&bytes) {
            tracing::debug!("Sent {}", command);
            if command.is_user_visible() {
                self.emit(ReaderMessage::Sent(command));
            }
        }
    }

    fn sync_clock_if_due(&mut self, now: Instant) {
        let Some(due) = self.next_sync else {
            return;
        };
        if now < due {
            return;
        }
        self.send_command(HostCommand::SyncClock {
            epoch_ms: Utc::now().timestamp_millis(),
        });
        self.next_sync = Some(now + Duration::from_millis(self.clock_sync.period_ms.max(1)));
    }

    fn read_once(&mut self) {
        match self.link.read_chunk(&mut self.buffer) {
            Ok(0) => {}
            Ok(n) => {
                self.decoder.feed(&self.buffer[..n]);
                if self.decoder.has_pending() {
                    let batch = self.decoder.drain();
                    self.emit(ReaderMessage::Batch(batch));
                }
            }
            Err(e) => self.connection_lost(e),
        }
    }

    /// Write to the link, stopping the worker on failure
    fn write(&mut self, bytes: &[u8]) -> bool {
        match self.link.send(bytes) {
            Ok(()) => true,
            Err(e) => {
                self.connection_lost(e);
                false
            }
        }
    }

    fn connection_lost(&mut self, e: std::io::Error) {
        tracing::error!("Connection lost: {}", e);
        self.running.store(false, Ordering::SeqCst);
        self.emit_final(ReaderMessage::ConnectionLost(e.to_string()));
    }

    fn emit(&mut self, msg: ReaderMessage) {
        match self.message_tx.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped_messages += 1;
                tracing::trace!(
                    dropped = self.dropped_messages,
                    "Consumer not keeping up, message dropped"
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("Consumer gone, stopping reader");
                self.running.store(false, Ordering::SeqCst);
            }
        }
    }

    fn emit_final(&mut self, msg: ReaderMessage) {
        if self.message_tx.send_timeout(msg, FINAL_SEND_TIMEOUT).is_err() {
            self.dropped_messages += 1;
        }
    }
}

/// Consumer-side handle for a reader worker
pub struct ReaderBridge {
    cmd_tx: Sender<ReaderCommand>,
    msg_rx: Receiver<ReaderMessage>,
    running: Arc<AtomicBool>,
}

impl ReaderBridge {
    /// Create a new bridge pair: `(bridge, cmd_rx, msg_tx, running)`.
    ///
    /// The worker owns the returned receiver, sender and flag.
    pub fn new() -> (
        Self,
        Receiver<ReaderCommand>,
        Sender<ReaderMessage>,
        Arc<AtomicBool>,
    ) {
        let (cmd_tx, cmd_rx) = bounded(CMD_CHANNEL_CAPACITY);
        let (msg_tx, msg_rx) = bounded(MSG_CHANNEL_CAPACITY);
        let running = Arc::new(AtomicBool::new(true));
        let bridge = Self {
            cmd_tx,
            msg_rx,
            running: Arc::clone(&running),
        };
        (bridge, cmd_rx, msg_tx, running)
    }

    /// Queue a command for the device. Returns false once the worker is gone.
    pub fn send(&self, command: HostCommand) -> bool {
        self.cmd_tx.send(ReaderCommand::Send(command)).is_ok()
    }

    /// Drain all pending messages
    pub fn drain(&self) -> Vec<ReaderMessage> {
        self.msg_rx.try_iter().collect()
    }

    /// Wait up to `timeout` for the next message.
    ///
    /// `None` on timeout or when the worker has exited and every message
    /// has been consumed.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ReaderMessage> {
        match self.msg_rx.recv_timeout(timeout) {
            Ok(msg) => Some(msg),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Whether the worker is still running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the worker to stop
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(ReaderCommand::Shutdown);
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Start a reader worker for `link` on a new thread
pub fn spawn_reader(
    link: Box<dyn SensorLink>,
    config: &AppConfig,
) -> std::io::Result<(ReaderBridge, JoinHandle<()>)> {
    let (bridge, cmd_rx, msg_tx, running) = ReaderBridge::new();
    let mut worker = ReaderWorker::new(link, config, cmd_rx, msg_tx, running);
    let handle = std::thread::Builder::new()
        .name("sdp-reader".into())
        .spawn(move || worker.run())?;
    Ok((bridge, handle))
}
