//! Watch session — directory listing and bulk extraction over one channel.
//!
//! A `Watch` owns the transport for the length of a session. There is one
//! counter sequence per session and one command in flight at a time, which
//! `&mut self` on every operation enforces.

use std::time::Duration;

use crate::channel::{CommandChannel, DEFAULT_TIMEOUT};
use crate::config::ProtocolConfig;
use crate::directory::{list_files, DEFAULT_MAX_ENTRIES};
use crate::error::Error;
use crate::transfer::{read_file, RetrievedFile, TransferFailure};
use crate::transport::Transport;
use crate::wire::FileRecord;

/// Boxed error returned by a [`FileSink`].
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Which directory entries to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFilter {
    /// Activity tracks only (`0x91` file class).
    TracksOnly,
    All,
}

impl FileFilter {
    pub fn matches(self, record: &FileRecord) -> bool {
        match self {
            FileFilter::TracksOnly => record.is_track(),
            FileFilter::All => true,
        }
    }
}

/// What to do when one file fails to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the extraction.
    Abort,
    /// Record the failure and move on to the next file.
    Continue,
}

/// Receives the contents of each extracted file.
pub trait FileSink {
    fn store(&mut self, record: &FileRecord, data: &[u8]) -> Result<(), SinkError>;
}

impl<F> FileSink for F
where
    F: FnMut(&FileRecord, &[u8]) -> Result<(), SinkError>,
{
    fn store(&mut self, record: &FileRecord, data: &[u8]) -> Result<(), SinkError> {
        self(record, data)
    }
}

/// Result of a completed extraction.
#[derive(Debug, Default)]
pub struct ExtractSummary {
    pub extracted: Vec<FileRecord>,
    /// Entries excluded by the filter.
    pub skipped: usize,
    /// Reads that failed under `FailurePolicy::Continue`.
    pub failed: Vec<TransferFailure>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read the file directory: {0}")]
    Directory(#[source] Error),

    #[error(transparent)]
    Transfer(#[from] TransferFailure),

    #[error("failed to store file {record}: {source}")]
    Sink {
        record: FileRecord,
        #[source]
        source: SinkError,
    },
}

pub struct Watch<T> {
    channel: CommandChannel<T>,
    max_directory_entries: usize,
}

impl<T: Transport> Watch<T> {
    pub fn new(transport: T) -> Self {
        Self::with_limits(transport, DEFAULT_TIMEOUT, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_config(transport: T, config: &ProtocolConfig) -> Self {
        Self::with_limits(transport, config.timeout(), config.max_directory_entries)
    }

    pub fn with_limits(transport: T, timeout: Duration, max_directory_entries: usize) -> Self {
        Self {
            channel: CommandChannel::with_timeout(transport, timeout),
            max_directory_entries,
        }
    }

    pub fn list_files(&mut self) -> Result<Vec<FileRecord>, Error> {
        list_files(&mut self.channel, self.max_directory_entries)
    }

    pub fn read_file(&mut self, record: FileRecord) -> Result<RetrievedFile, TransferFailure> {
        read_file(&mut self.channel, record)
    }

    /// List the directory and hand every file matching `filter` to `sink`.
    ///
    /// Storage failures always abort. Read failures abort or are collected
    /// according to `policy`; the failed file has been closed either way.
    pub fn extract<S: FileSink>(
        &mut self,
        filter: FileFilter,
        policy: FailurePolicy,
        sink: &mut S,
    ) -> Result<ExtractSummary, ExtractError> {
        let files = self.list_files().map_err(ExtractError::Directory)?;
        tracing::info!(files = files.len(), "directory read");

        let mut summary = ExtractSummary::default();
        for record in files {
            if !filter.matches(&record) {
                summary.skipped += 1;
                continue;
            }

            tracing::info!(file = %record, "reading file");
            match self.read_file(record) {
                Ok(file) => {
                    sink.store(&record, &file.data)
                        .map_err(|source| ExtractError::Sink { record, source })?;
                    summary.extracted.push(record);
                }
                Err(failure) if policy == FailurePolicy::Continue => {
                    tracing::warn!(error = %failure, "skipping unreadable file");
                    summary.failed.push(failure);
                }
                Err(failure) => return Err(failure.into()),
            }
        }
        Ok(summary)
    }

    /// End the session and return the transport.
    pub fn into_inner(self) -> T {
        self.channel.into_inner()
    }
}
