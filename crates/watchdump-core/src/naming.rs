//! Output file names for extracted files.
//!
//! Activity tracks are named after the Unix timestamp in their header, in UTC,
//! e.g. `2014-03-02_08:15:42.ttbin`. Everything else is named by file id,
//! e.g. `810002.bin`.

use chrono::DateTime;

use crate::wire::FileRecord;

/// Leading bytes of a track file.
const TRACK_MAGIC: [u8; 2] = [0x20, 0x05];

/// A track file must be longer than this to carry a timestamp.
const TRACK_MIN_LEN: usize = 100;

/// Little-endian u32 Unix timestamp inside a track header.
const TIMESTAMP_RANGE: std::ops::Range<usize> = 8..12;

/// Start time of a track file, if `data` is one.
pub fn track_timestamp(record: &FileRecord, data: &[u8]) -> Option<u32> {
    if !record.is_track() || data.len() <= TRACK_MIN_LEN || !data.starts_with(&TRACK_MAGIC) {
        return None;
    }
    let raw: [u8; 4] = data[TIMESTAMP_RANGE].try_into().ok()?;
    Some(u32::from_le_bytes(raw))
}

/// Name to store `data` under.
pub fn output_name(record: &FileRecord, data: &[u8]) -> String {
    track_timestamp(record, data)
        .and_then(|secs| DateTime::from_timestamp(i64::from(secs), 0))
        .map(|start| start.format("%Y-%m-%d_%H:%M:%S.ttbin").to_string())
        .unwrap_or_else(|| format!("{:X}.bin", record.id()))
}
