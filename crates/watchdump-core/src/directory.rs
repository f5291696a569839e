//! Directory enumeration.
//!
//! The watch keeps a directory iterator on its side. `BeginListing` rewinds
//! it, then each `NextEntry` returns one 22-byte entry until an entry with the
//! end byte set. The terminating entry carries no file.

use zerocopy::FromBytes;

use crate::channel::CommandChannel;
use crate::error::{Error, Violation};
use crate::transport::Transport;
use crate::wire::{Command, DirectoryEntry, FileRecord, Verb};

/// Default bound on `NextEntry` round trips for one listing.
///
/// Guards against a device that never sends the end entry. It is not a
/// firmware limit.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// List every file on the watch, in the order the firmware reports them.
///
/// Any failed exchange or malformed entry aborts the whole listing, since the
/// device-side iterator is then in an unknown state. Hitting `max_entries`
/// returns what was collected so far. A transport failure keeps
/// `ErrorKind::Transport`; it is not reported as a protocol error.
pub fn list_files<T: Transport>(
    channel: &mut CommandChannel<T>,
    max_entries: usize,
) -> Result<Vec<FileRecord>, Error> {
    channel.exchange(&Command::BeginListing)?;

    let mut files = Vec::new();
    for _ in 0..max_entries {
        let reply = channel.exchange(&Command::NextEntry)?;
        let entry = DirectoryEntry::read_from(&reply[..])
            .ok_or_else(|| Error::protocol(Verb::NextEntry, Violation::EntrySize(reply.len())))?;
        if entry.is_end() {
            tracing::debug!(files = files.len(), "directory listing complete");
            return Ok(files);
        }
        let record = entry.record();
        tracing::trace!(
            id = format_args!("{:08X}", record.id()),
            length = record.length(),
            "directory entry"
        );
        files.push(record);
    }

    tracing::warn!(
        max_entries,
        files = files.len(),
        "directory listing stopped at entry limit without an end entry"
    );
    Ok(files)
}
