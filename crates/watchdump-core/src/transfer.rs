//! File transfer — open, chunked read, close.
//!
//! Opening takes two commands, `Prepare` then `Open`, both carrying the file
//! id. The firmware needs both; nobody knows why. Data is then pulled in
//! chunks of at most 50 bytes, and every open must be followed by `Close`,
//! including after a failure, or the watch starts failing reads a few files
//! later.
//!
//! [`OpenFile`] is a scoped handle: if it is dropped without [`OpenFile::close`]
//! it still sends `Close` and logs the outcome.

use bytes::{Bytes, BytesMut};
use zerocopy::FromBytes;

use crate::channel::CommandChannel;
use crate::error::{Error, Violation};
use crate::transport::Transport;
use crate::wire::{
    Command, FileRecord, ReadReplyHeader, Verb, MAX_READ_CHUNK, READ_REPLY_HEADER_SIZE,
};

/// Upper bound on the buffer reserved before the first chunk arrives. The
/// declared length comes from the device and is not trusted for allocation.
const INITIAL_CAPACITY: u32 = 64 * 1024;

/// A fully read file.
#[derive(Debug, Clone)]
pub struct RetrievedFile {
    pub record: FileRecord,
    /// Exactly `record.length()` bytes.
    pub data: Bytes,
    /// Outcome of the `Close` that followed the read. A failed close does not
    /// invalidate `data`.
    pub close: Result<(), Error>,
}

/// A file read that failed part way.
#[derive(Debug, Clone, thiserror::Error)]
#[error("reading file {record} failed: {error}")]
pub struct TransferFailure {
    pub record: FileRecord,
    #[source]
    pub error: Error,
    /// Outcome of the cleanup `Close`.
    pub close: Result<(), Error>,
}

enum Cursor {
    /// Next read starts at this byte offset.
    At(u32),
    /// A read failed; the position on the device is unknown.
    Failed(Error),
}

/// A file opened on the watch.
pub struct OpenFile<'a, T: Transport> {
    channel: &'a mut CommandChannel<T>,
    record: FileRecord,
    cursor: Cursor,
    closed: bool,
}

/// Open `record` for reading.
///
/// If either open command fails the handle is dropped, which sends `Close`.
/// The error keeps its kind, so a transport failure stays `ErrorKind::Transport`.
pub fn open_file<T: Transport>(
    channel: &mut CommandChannel<T>,
    record: FileRecord,
) -> Result<OpenFile<'_, T>, Error> {
    let mut file = OpenFile::new(channel, record);
    file.open()?;
    Ok(file)
}

/// Open, read to the end, and close `record`.
///
/// `Close` is sent whatever happened before it, and its outcome is reported
/// alongside the data or the failure.
pub fn read_file<T: Transport>(
    channel: &mut CommandChannel<T>,
    record: FileRecord,
) -> Result<RetrievedFile, TransferFailure> {
    let mut file = OpenFile::new(channel, record);
    let outcome = file.open().and_then(|()| file.read_to_end());
    let close = file.close();
    if let Err(e) = &close {
        tracing::warn!(error = %e, "failed to close file");
    }

    match outcome {
        Ok(data) => Ok(RetrievedFile { record, data, close }),
        Err(error) => Err(TransferFailure { record, error, close }),
    }
}

impl<'a, T: Transport> OpenFile<'a, T> {
    fn new(channel: &'a mut CommandChannel<T>, record: FileRecord) -> Self {
        Self { channel, record, cursor: Cursor::At(0), closed: false }
    }

    fn open(&mut self) -> Result<(), Error> {
        let id = self.record.id();
        self.channel.exchange(&Command::Prepare(id))?;
        self.channel.exchange(&Command::Open(id))?;
        tracing::debug!(file = %self.record, "file opened");
        Ok(())
    }

    pub fn record(&self) -> FileRecord {
        self.record
    }

    /// Bytes read so far. `None` once a read has failed.
    pub fn offset(&self) -> Option<u32> {
        match self.cursor {
            Cursor::At(offset) => Some(offset),
            Cursor::Failed(_) => None,
        }
    }

    /// Read the next chunk. `Ok(None)` at end of file.
    ///
    /// After a failure every further call returns the same error.
    pub fn read_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        let offset = match &self.cursor {
            Cursor::At(offset) => *offset,
            Cursor::Failed(e) => return Err(e.clone()),
        };
        let remaining = self.record.length().saturating_sub(offset);
        if remaining == 0 {
            return Ok(None);
        }

        let len = remaining.min(MAX_READ_CHUNK) as u8;
        match self.fetch(len) {
            Ok(data) => {
                self.cursor = Cursor::At(offset + u32::from(len));
                Ok(Some(data))
            }
            Err(e) => {
                let e = e.for_file(self.record.id()).at_offset(offset);
                tracing::debug!(error = %e, "file read aborted");
                self.cursor = Cursor::Failed(e.clone());
                Err(e)
            }
        }
    }

    /// Read the rest of the file.
    pub fn read_to_end(&mut self) -> Result<Bytes, Error> {
        let remaining = self
            .record
            .length()
            .saturating_sub(self.offset().unwrap_or(0));
        let mut data = BytesMut::with_capacity(remaining.min(INITIAL_CAPACITY) as usize);
        while let Some(chunk) = self.read_chunk()? {
            data.extend_from_slice(&chunk);
        }
        Ok(data.freeze())
    }

    /// Send `Close` and release the handle.
    pub fn close(mut self) -> Result<(), Error> {
        self.send_close()
    }

    fn fetch(&mut self, len: u8) -> Result<Bytes, Error> {
        let reply = self
            .channel
            .exchange(&Command::Read { file_id: self.record.id(), len })?;
        let header = ReadReplyHeader::read_from_prefix(&reply[..])
            .ok_or_else(|| Error::protocol(Verb::Read, Violation::ReadReplyTooShort(reply.len())))?;
        if header.length != len {
            return Err(Error::protocol(
                Verb::Read,
                Violation::ChunkSizeMismatch { requested: len, reported: header.length },
            ));
        }

        let expected = usize::from(len);
        let received = reply.len() - READ_REPLY_HEADER_SIZE;
        if received < expected {
            return Err(Error::protocol(
                Verb::Read,
                Violation::ChunkTruncated { expected, received },
            ));
        }
        if received > expected {
            tracing::trace!(expected, received, "ignoring trailing bytes in read reply");
        }
        Ok(reply.slice(READ_REPLY_HEADER_SIZE..READ_REPLY_HEADER_SIZE + expected))
    }

    fn send_close(&mut self) -> Result<(), Error> {
        self.closed = true;
        self.channel.exchange(&Command::Close(self.record.id()))?;
        tracing::debug!(file = %self.record, "file closed");
        Ok(())
    }
}

impl<T: Transport> Drop for OpenFile<'_, T> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.send_close() {
                tracing::warn!(error = %e, "failed to close file on drop");
            }
        }
    }
}
