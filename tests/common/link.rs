//! In-memory sensor link replaying a fixed script

use sdp_telemetry::transport::SensorLink;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

/// Link that hands out pre-recorded chunks and records everything sent.
///
/// Once the script is exhausted it either keeps timing out (`Ok(0)`) or
/// fails like a dropped connection.
pub struct ScriptedLink {
    chunks: VecDeque<Vec<u8>>,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    fail_when_done: bool,
}

impl ScriptedLink {
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks: chunks.into(),
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_when_done: true,
        }
    }

    /// Keep returning `Ok(0)` after the last chunk instead of failing
    pub fn idle_when_done(mut self) -> Self {
        self.fail_when_done = false;
        self
    }

    /// Handle on the writes made to this link
    pub fn sent(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        Arc::clone(&self.sent)
    }
}

impl SensorLink for ScriptedLink {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.chunks.pop_front() {
            Some(mut chunk) => {
                if chunk.len() > buf.len() {
                    let rest = chunk.split_off(buf.len());
                    self.chunks.push_front(rest);
                }
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            }
            None if self.fail_when_done => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "script finished",
            )),
            None => Ok(0),
        }
    }

    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.sent
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "poisoned"))?
            .push(data.to_vec());
        Ok(())
    }
}
