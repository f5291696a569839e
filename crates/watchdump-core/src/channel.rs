//! Command channel — one framed request, one matched reply.
//!
//! The channel owns the session counter. It is pre-incremented for every
//! frame put on the wire, so the first command of a session carries 1, and it
//! is never reset: a reply is only accepted if it echoes the counter just sent.
//! A failed exchange still consumes its counter value, so a late reply to it
//! can never be mistaken for the answer to the next command.

use std::time::Duration;

use bytes::Bytes;
use zerocopy::FromBytes;

use crate::diag::hex_dump;
use crate::error::{Error, ErrorContext, Violation};
use crate::transport::{Transport, TransportError};
use crate::wire::{
    Command, CommandFrame, ReplyHeader, FRAME_HEADER_SIZE, FRAME_SIZE, IN_ENDPOINT, OUT_ENDPOINT,
    REPLY_MARKER,
};

/// Default per-direction transfer timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct CommandChannel<T> {
    transport: T,
    counter: u8,
    timeout: Duration,
}

impl<T: Transport> CommandChannel<T> {
    pub fn new(transport: T) -> Self {
        Self::with_timeout(transport, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(transport: T, timeout: Duration) -> Self {
        Self { transport, counter: 0, timeout }
    }

    /// Send a typed command and return its reply payload.
    pub fn exchange(&mut self, command: &Command) -> Result<Bytes, Error> {
        let result = self.exchange_raw(&command.encode());
        match command.file_id() {
            Some(id) => result.map_err(|e| e.for_file(id)),
            None => result,
        }
    }

    /// Send an arbitrary payload (verb byte first) and return the reply payload.
    ///
    /// Payloads over 60 bytes fail with `InvalidCommand` before any I/O and
    /// without consuming a counter value.
    pub fn exchange_raw(&mut self, payload: &[u8]) -> Result<Bytes, Error> {
        let context = ErrorContext::new(payload.first().copied().unwrap_or(0));
        let counter = self.counter.wrapping_add(1);
        let frame = CommandFrame::new(counter, payload)
            .map_err(|_| Error::InvalidCommand { context, len: payload.len() })?;
        self.counter = counter;

        let out = frame.wire_bytes();
        let transport_err = |source| Error::Transport { context, source };
        let written = self
            .transport
            .write(OUT_ENDPOINT, out, self.timeout)
            .map_err(transport_err)?;
        if written != out.len() {
            tracing::debug!(counter, expected = out.len(), written, "short command write");
            return Err(transport_err(TransportError::ShortWrite {
                expected: out.len(),
                transferred: written,
            }));
        }

        let mut buf = [0u8; FRAME_SIZE];
        let received = self
            .transport
            .read(IN_ENDPOINT, &mut buf, self.timeout)
            .map_err(transport_err)?
            .min(FRAME_SIZE);

        let reply = &buf[..received];
        match validate_reply(reply, counter) {
            Ok(payload) => {
                tracing::trace!(
                    verb = context.verb,
                    counter,
                    sent = out.len(),
                    reply_len = payload.len(),
                    "exchange complete"
                );
                Ok(Bytes::copy_from_slice(payload))
            }
            Err(violation) => {
                tracing::debug!(
                    verb = context.verb,
                    counter,
                    %violation,
                    reply = %hex_dump(reply),
                    "invalid reply received"
                );
                Err(Error::Protocol { context, violation })
            }
        }
    }

    /// Give the transport back, ending the session.
    pub fn into_inner(self) -> T {
        self.transport
    }
}

/// Check framing and sequencing, returning the declared payload.
fn validate_reply(reply: &[u8], sent: u8) -> Result<&[u8], Violation> {
    let header =
        ReplyHeader::read_from_prefix(reply).ok_or(Violation::ShortReply(reply.len()))?;
    if header.marker != REPLY_MARKER {
        return Err(Violation::BadMarker(header.marker));
    }
    if header.counter != sent {
        return Err(Violation::CounterMismatch { sent, received: header.counter });
    }
    let declared = header.length as usize;
    let available = reply.len() - FRAME_HEADER_SIZE;
    if declared > available {
        return Err(Violation::LengthOverrun { declared, available });
    }
    Ok(&reply[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + declared])
}
