//! Watch wire format — on-wire types for the USB command protocol.
//!
//! These types ARE the protocol. The firmware is undocumented and every byte
//! offset here was observed on real hardware, so nothing in this module is
//! free to change. Unknown reply bytes are carried as opaque arrays and must
//! not be interpreted.
//!
//! Frames are #[repr(C)] byte structs with zerocopy derives, so encoding and
//! decoding is allocation-free and there is no unsafe code in this module.

use std::fmt;

use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Maximum HID interrupt packet size for the watch (USB 1.1 full speed).
pub const FRAME_SIZE: usize = 64;

/// Marker, length and counter bytes that precede every payload.
pub const FRAME_HEADER_SIZE: usize = 3;

/// Largest command payload the firmware accepts in one frame.
pub const MAX_COMMAND_LEN: usize = 60;

/// First byte of every outgoing frame.
pub const COMMAND_MARKER: u8 = 0x09;

/// First byte of every reply frame.
pub const REPLY_MARKER: u8 = 0x01;

/// Interrupt OUT endpoint commands are written to.
pub const OUT_ENDPOINT: u8 = 0x05;

/// Interrupt IN endpoint replies are read from.
pub const IN_ENDPOINT: u8 = 0x84;

/// Firmware cap on bytes returned by a single read command (0x32).
pub const MAX_READ_CHUNK: u32 = 0x32;

/// Size of a "next entry" reply.
pub const DIRECTORY_ENTRY_SIZE: usize = 22;

/// Bytes that precede file data in a read reply.
pub const READ_REPLY_HEADER_SIZE: usize = 9;

/// Value of the end-of-directory byte on the terminating entry.
pub const DIRECTORY_END: u8 = 1;

/// Files with this id prefix hold activity tracks.
pub const TRACK_FILE_PREFIX: u32 = 0x9100_0000;

/// Mask selecting the file-class byte of a file id.
pub const FILE_CLASS_MASK: u32 = 0xFF00_0000;

// ── Frames ────────────────────────────────────────────────────────────────────

/// Outgoing command frame.
///
/// `[0x09, payload_len, counter, payload..]`, zero-padded to 64 bytes.
/// Only the first `3 + length` bytes are put on the wire.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct CommandFrame {
    /// Always `COMMAND_MARKER`.
    pub marker: u8,
    /// Number of meaningful payload bytes.
    pub length: u8,
    /// Session sequence counter the reply must echo.
    pub counter: u8,
    pub payload: [u8; FRAME_SIZE - FRAME_HEADER_SIZE],
}

assert_eq_size!(CommandFrame, [u8; FRAME_SIZE]);

impl CommandFrame {
    /// Frame `payload` under `counter`.
    pub fn new(counter: u8, payload: &[u8]) -> Result<Self, WireError> {
        if payload.len() > MAX_COMMAND_LEN {
            return Err(WireError::CommandTooLong(payload.len()));
        }
        let mut frame = Self::new_zeroed();
        frame.marker = COMMAND_MARKER;
        frame.length = payload.len() as u8;
        frame.counter = counter;
        frame.payload[..payload.len()].copy_from_slice(payload);
        Ok(frame)
    }

    /// The bytes actually written to the OUT endpoint.
    pub fn wire_bytes(&self) -> &[u8] {
        &self.as_bytes()[..FRAME_HEADER_SIZE + self.length as usize]
    }
}

/// Header of every reply frame: `[0x01, reply_len, counter]`.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct ReplyHeader {
    pub marker: u8,
    pub length: u8,
    pub counter: u8,
}

assert_eq_size!(ReplyHeader, [u8; FRAME_HEADER_SIZE]);

/// Payload of a "next entry" reply.
///
/// Only the id, the length and the end-of-directory byte are understood.
/// The remaining bytes change between entries but their meaning is unknown.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct DirectoryEntry {
    pub head: [u8; 6],
    /// File id, big-endian. Offset 6.
    pub id: [u8; 4],
    pub gap: [u8; 3],
    /// File length in bytes, big-endian. Offset 13.
    pub length: [u8; 4],
    pub tail: [u8; 3],
    /// `DIRECTORY_END` on the entry that terminates the listing. Offset 20.
    pub end: u8,
    pub trailer: u8,
}

assert_eq_size!(DirectoryEntry, [u8; DIRECTORY_ENTRY_SIZE]);

impl DirectoryEntry {
    pub fn is_end(&self) -> bool {
        self.end == DIRECTORY_END
    }

    pub fn record(&self) -> FileRecord {
        FileRecord::new(u32::from_be_bytes(self.id), u32::from_be_bytes(self.length))
    }
}

/// Leading bytes of a read reply. File data follows immediately.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct ReadReplyHeader {
    pub head: [u8; 8],
    /// Echo of the chunk length that was requested. Offset 8.
    pub length: u8,
}

assert_eq_size!(ReadReplyHeader, [u8; READ_REPLY_HEADER_SIZE]);

// ── Commands ──────────────────────────────────────────────────────────────────

/// Command verbs understood by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Verb {
    /// Second of the two open commands.
    Open = 0x05,
    /// First of the two open commands.
    Prepare = 0x06,
    Read = 0x07,
    Close = 0x0C,
    /// Resets the device-side directory iterator.
    BeginListing = 0x11,
    NextEntry = 0x12,
}

impl Verb {
    pub fn name(self) -> &'static str {
        match self {
            Verb::Open => "open",
            Verb::Prepare => "prepare",
            Verb::Read => "read",
            Verb::Close => "close",
            Verb::BeginListing => "begin-listing",
            Verb::NextEntry => "next-entry",
        }
    }
}

impl TryFrom<u8> for Verb {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x05 => Ok(Verb::Open),
            0x06 => Ok(Verb::Prepare),
            0x07 => Ok(Verb::Read),
            0x0C => Ok(Verb::Close),
            0x11 => Ok(Verb::BeginListing),
            0x12 => Ok(Verb::NextEntry),
            other => Err(WireError::UnknownVerb(other)),
        }
    }
}

impl From<Verb> for u8 {
    fn from(v: Verb) -> u8 {
        v as u8
    }
}

/// A typed command payload.
///
/// File commands put a zero byte between the verb and the big-endian id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `11 00 00 00 00 00 00 00 00 00`
    BeginListing,
    /// `12 00`
    NextEntry,
    /// `06 00 id[4]`
    Prepare(u32),
    /// `05 00 id[4]`
    Open(u32),
    /// `07 00 id[4] 00 len 32 00`
    Read { file_id: u32, len: u8 },
    /// `0C 00 id[4]`
    Close(u32),
}

impl Command {
    pub fn verb(&self) -> Verb {
        match self {
            Command::BeginListing => Verb::BeginListing,
            Command::NextEntry => Verb::NextEntry,
            Command::Prepare(_) => Verb::Prepare,
            Command::Open(_) => Verb::Open,
            Command::Read { .. } => Verb::Read,
            Command::Close(_) => Verb::Close,
        }
    }

    /// The file a command addresses, if any.
    pub fn file_id(&self) -> Option<u32> {
        match *self {
            Command::BeginListing | Command::NextEntry => None,
            Command::Prepare(id) | Command::Open(id) | Command::Close(id) => Some(id),
            Command::Read { file_id, .. } => Some(file_id),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![u8::from(self.verb())];
        match *self {
            Command::BeginListing => buf.extend_from_slice(&[0u8; 9]),
            Command::NextEntry => buf.push(0),
            Command::Prepare(id) | Command::Open(id) | Command::Close(id) => {
                buf.push(0);
                buf.extend_from_slice(&id.to_be_bytes());
            }
            Command::Read { file_id, len } => {
                buf.push(0);
                buf.extend_from_slice(&file_id.to_be_bytes());
                buf.extend_from_slice(&[0, len, MAX_READ_CHUNK as u8, 0]);
            }
        }
        buf
    }
}

// ── File records ──────────────────────────────────────────────────────────────

/// A file stored on the watch, as reported by the directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileRecord {
    id: u32,
    length: u32,
}

impl FileRecord {
    pub fn new(id: u32, length: u32) -> Self {
        Self { id, length }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    /// Activity track files live in the `0x91` class.
    pub fn is_track(&self) -> bool {
        self.id & FILE_CLASS_MASK == TRACK_FILE_PREFIX
    }
}

impl fmt::Display for FileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X} ({} bytes)", self.id, self.length)
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when building or interpreting wire-format data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("command payload of {0} bytes exceeds maximum {}", MAX_COMMAND_LEN)]
    CommandTooLong(usize),

    #[error("unknown verb byte: 0x{0:02x}")]
    UnknownVerb(u8),
}

// ── Tests ─────────────────────────────────────────────────────────────────────
