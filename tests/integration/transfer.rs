use watchdump_core::transfer::{open_file, read_file};
use watchdump_core::wire::MAX_READ_CHUNK;
use watchdump_core::{CommandChannel, ErrorKind, Violation};

use crate::*;

/// A 130-byte file comes back in three reads of 50, 50 and 30 bytes and is
/// closed afterwards.
#[test]
fn test_file_read_in_capped_chunks() -> anyhow::Result<()> {
    let data = body(7, 130);
    let mut channel = CommandChannel::new(SimulatedWatch::with_files(&[(0x9100_0003, data.clone())]));

    let file = read_file(&mut channel, record(0x9100_0003, &data))?;
    assert_eq!(&file.data[..], &data[..]);
    assert!(file.close.is_ok());

    let sim = channel.into_inner();
    assert_eq!(sim.read_sizes(), vec![50, 50, 30]);
    assert_eq!(sim.verbs(), vec![0x06, 0x05, 0x07, 0x07, 0x07, 0x0C]);
    assert_eq!(sim.closed, vec![0x9100_0003]);
    Ok(())
}

/// No read ever asks for more than the chunk cap, whatever the file size.
#[test]
fn test_chunk_sizes_never_exceed_cap() {
    let data = body(0, 1001);
    let mut channel = CommandChannel::new(SimulatedWatch::with_files(&[(0x9100_0004, data.clone())]));

    let file = read_file(&mut channel, record(0x9100_0004, &data)).unwrap();
    assert_eq!(file.data.len(), 1001);

    let sizes = channel.into_inner().read_sizes();
    assert_eq!(sizes.len(), 21);
    assert!(sizes.iter().all(|&s| u32::from(s) <= MAX_READ_CHUNK));
    assert_eq!(sizes.iter().map(|&s| s as usize).sum::<usize>(), 1001);
}

/// A wrong chunk length aborts the file, the file is still closed, and the
/// next file reads normally.
#[test]
fn test_bad_chunk_closes_file_and_session_continues() {
    let first = body(1, 120);
    let second = body(2, 60);
    let mut sim = SimulatedWatch::with_files(&[(0x9100_0001, first.clone()), (0x9100_0002, second.clone())]);
    sim.faults.bad_chunk_at = Some(1);
    let mut channel = CommandChannel::new(sim);

    let failure = read_file(&mut channel, record(0x9100_0001, &first)).unwrap_err();
    assert_eq!(failure.error.kind(), ErrorKind::Protocol);
    assert_eq!(
        failure.error.violation(),
        Some(&Violation::ChunkSizeMismatch { requested: 50, reported: 49 })
    );
    assert_eq!(failure.error.context().file_id, Some(0x9100_0001));
    assert_eq!(failure.error.context().offset, Some(50));
    assert!(failure.close.is_ok());

    let file = read_file(&mut channel, record(0x9100_0002, &second)).unwrap();
    assert_eq!(&file.data[..], &second[..]);
    assert_eq!(channel.into_inner().closed, vec![0x9100_0001, 0x9100_0002]);
}

/// Abandoning a file half way still closes it, so the firmware accepts the
/// next open.
#[test]
fn test_abandoned_file_is_closed_on_drop() {
    let first = body(3, 200);
    let second = body(4, 80);
    let mut channel = CommandChannel::new(SimulatedWatch::with_files(&[
        (0x9100_0001, first.clone()),
        (0x9100_0002, second.clone()),
    ]));

    {
        let mut file = open_file(&mut channel, record(0x9100_0001, &first)).unwrap();
        let chunk = file.read_chunk().unwrap().unwrap();
        assert_eq!(&chunk[..], &first[..50]);
        assert_eq!(file.offset(), Some(50));
    }

    let file = read_file(&mut channel, record(0x9100_0002, &second)).unwrap();
    assert_eq!(&file.data[..], &second[..]);
    assert_eq!(channel.into_inner().closed, vec![0x9100_0001, 0x9100_0002]);
}

/// An empty file is opened and closed without any read.
#[test]
fn test_empty_file() {
    let mut channel = CommandChannel::new(SimulatedWatch::with_files(&[(0x9100_0009, Vec::new())]));
    let file = read_file(&mut channel, record(0x9100_0009, &[])).unwrap();
    assert!(file.data.is_empty());
    assert_eq!(channel.into_inner().verbs(), vec![0x06, 0x05, 0x0C]);
}

/// A directory length larger than what the device actually returns shows up
/// as a truncated or mismatched chunk, never as silently short data.
#[test]
fn test_file_shorter_than_listed_is_an_error() {
    let data = body(5, 30);
    let mut channel = CommandChannel::new(SimulatedWatch::with_files(&[(0x9100_0005, data)]));

    let failure = read_file(&mut channel, FileRecord::new(0x9100_0005, 40)).unwrap_err();
    assert_eq!(
        failure.error.violation(),
        Some(&Violation::ChunkSizeMismatch { requested: 40, reported: 30 })
    );
    assert_eq!(channel.into_inner().closed, vec![0x9100_0005]);
}
