//! Protocol engine errors.
//!
//! Every error names the command verb it happened on and, where it applies,
//! the file id and byte offset. That is usually enough to tell a desynchronised
//! counter from a firmware that simply disagrees with us.

use std::fmt;

use crate::transport::TransportError;
use crate::wire::{Verb, MAX_COMMAND_LEN};

/// Where in the protocol an error happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorContext {
    /// Raw verb byte of the command in flight.
    pub verb: u8,
    pub file_id: Option<u32>,
    pub offset: Option<u32>,
}

impl ErrorContext {
    pub fn new(verb: u8) -> Self {
        Self { verb, file_id: None, offset: None }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Verb::try_from(self.verb) {
            Ok(verb) => write!(f, "verb 0x{:02x} ({})", self.verb, verb.name())?,
            Err(_) => write!(f, "verb 0x{:02x}", self.verb)?,
        }
        if let Some(id) = self.file_id {
            write!(f, ", file {id:08X}")?;
        }
        if let Some(offset) = self.offset {
            write!(f, ", offset {offset}")?;
        }
        Ok(())
    }
}

/// The framing or content rule a reply broke.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("reply of {0} bytes is shorter than the frame header")]
    ShortReply(usize),

    #[error("reply marker is 0x{0:02x}, expected 0x01")]
    BadMarker(u8),

    #[error("reply counter {received} does not match sent counter {sent}")]
    CounterMismatch { sent: u8, received: u8 },

    #[error("declared reply length {declared} exceeds the {available} bytes received")]
    LengthOverrun { declared: usize, available: usize },

    #[error("directory entry is {0} bytes, expected 22")]
    EntrySize(usize),

    #[error("read reply of {0} bytes is shorter than its 9-byte header")]
    ReadReplyTooShort(usize),

    #[error("read reply reports {reported} bytes, requested {requested}")]
    ChunkSizeMismatch { requested: u8, reported: u8 },

    #[error("read reply carries {received} data bytes, expected {expected}")]
    ChunkTruncated { expected: usize, received: usize },
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller bug. Never retried.
    InvalidCommand,
    /// The transport failed or moved the wrong number of bytes.
    Transport,
    /// The device answered with something that breaks the protocol.
    Protocol,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid command ({context}): {len}-byte payload exceeds {}-byte frame capacity", MAX_COMMAND_LEN)]
    InvalidCommand { context: ErrorContext, len: usize },

    #[error("transport error ({context}): {source}")]
    Transport {
        context: ErrorContext,
        #[source]
        source: TransportError,
    },

    #[error("protocol error ({context}): {violation}")]
    Protocol {
        context: ErrorContext,
        violation: Violation,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidCommand { .. } => ErrorKind::InvalidCommand,
            Error::Transport { .. } => ErrorKind::Transport,
            Error::Protocol { .. } => ErrorKind::Protocol,
        }
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            Error::InvalidCommand { context, .. }
            | Error::Transport { context, .. }
            | Error::Protocol { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Error::InvalidCommand { context, .. }
            | Error::Transport { context, .. }
            | Error::Protocol { context, .. } => context,
        }
    }

    /// The violation behind a protocol error.
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Error::Protocol { violation, .. } => Some(violation),
            _ => None,
        }
    }

    pub(crate) fn protocol(verb: Verb, violation: Violation) -> Self {
        Error::Protocol { context: ErrorContext::new(verb.into()), violation }
    }

    /// Attach the file id the failing command addressed.
    pub fn for_file(mut self, file_id: u32) -> Self {
        self.context_mut().file_id = Some(file_id);
        self
    }

    /// Attach the byte offset a failing read started at.
    pub fn at_offset(mut self, offset: u32) -> Self {
        self.context_mut().offset = Some(offset);
        self
    }
}
