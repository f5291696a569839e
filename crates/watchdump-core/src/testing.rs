//! Scripted transport used by the unit tests.

use std::collections::VecDeque;
use std::time::Duration;

use crate::transport::{Transport, TransportError};
use crate::wire::{FRAME_SIZE, REPLY_MARKER};

pub(crate) enum Step {
    /// Well-formed reply echoing the counter of the last write.
    Reply(Vec<u8>),
    /// Exact bytes returned from the IN endpoint.
    Raw(Vec<u8>),
    /// The read fails.
    Fail(TransportError),
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    pub writes: Vec<Vec<u8>>,
    script: VecDeque<Step>,
    /// Report this many bytes written instead of the real count.
    pub write_count_override: Option<usize>,
    /// Fail the next write with this error.
    pub write_error: Option<TransportError>,
    /// Number of reads attempted.
    pub reads: usize,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self { script: steps.into_iter().collect(), ..Default::default() }
    }

    /// Verb byte of every command written so far.
    pub fn verbs(&self) -> Vec<u8> {
        self.writes.iter().map(|w| w[3]).collect()
    }

    fn last_counter(&self) -> u8 {
        self.writes.last().map(|w| w[2]).unwrap_or(0)
    }
}

impl Transport for ScriptedTransport {
    fn write(&mut self, _endpoint: u8, data: &[u8], _timeout: Duration)
        -> Result<usize, TransportError> {
        self.writes.push(data.to_vec());
        if let Some(e) = self.write_error.take() {
            return Err(e);
        }
        Ok(self.write_count_override.unwrap_or(data.len()))
    }

    fn read(&mut self, _endpoint: u8, buf: &mut [u8], _timeout: Duration)
        -> Result<usize, TransportError> {
        self.reads += 1;
        let frame = match self.script.pop_front() {
            Some(Step::Reply(payload)) => {
                let mut frame = vec![REPLY_MARKER, payload.len() as u8, self.last_counter()];
                frame.extend_from_slice(&payload);
                frame
            }
            Some(Step::Raw(bytes)) => bytes,
            Some(Step::Fail(e)) => return Err(e),
            None => return Err(TransportError::Timeout),
        };
        let n = frame.len().min(FRAME_SIZE).min(buf.len());
        buf[..n].copy_from_slice(&frame[..n]);
        Ok(n)
    }
}
