use watchdump_core::naming::output_name;
use watchdump_core::session::SinkError;
use watchdump_core::{ExtractError, FailurePolicy, FileFilter, FileRecord, Watch};

use crate::*;

fn watch_with(files: &[(u32, Vec<u8>)]) -> Watch<SimulatedWatch> {
    Watch::new(SimulatedWatch::with_files(files))
}

/// Only track files are read by default; the rest are counted as skipped and
/// never opened.
#[test]
fn test_tracks_only_extraction() -> anyhow::Result<()> {
    let track = track_body(1_393_748_142, 300);
    let mut watch = watch_with(&[
        (0x0081_0002, body(0, 40)),
        (0x9100_0001, track.clone()),
        (0x00F2_0000, body(1, 5)),
    ]);

    let mut stored: Vec<(FileRecord, Vec<u8>)> = Vec::new();
    let mut sink = |record: &FileRecord, data: &[u8]| -> Result<(), SinkError> {
        stored.push((*record, data.to_vec()));
        Ok(())
    };
    let summary = watch.extract(FileFilter::TracksOnly, FailurePolicy::Abort, &mut sink)?;

    assert_eq!(summary.skipped, 2);
    assert!(summary.failed.is_empty());
    assert_eq!(summary.extracted, vec![record(0x9100_0001, &track)]);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].1, track);
    assert_eq!(output_name(&stored[0].0, &stored[0].1), "2014-03-02_08:15:42.ttbin");
    assert_eq!(watch.into_inner().closed, vec![0x9100_0001]);
    Ok(())
}

/// `FileFilter::All` extracts every entry, in directory order.
#[test]
fn test_all_files_extraction() {
    let files = [
        (0x0081_0002, body(0, 40)),
        (0x9100_0001, track_body(1_400_000_000, 120)),
        (0x00F2_0000, body(1, 5)),
    ];
    let mut watch = watch_with(&files);

    let mut names = Vec::new();
    let mut sink = |record: &FileRecord, data: &[u8]| -> Result<(), SinkError> {
        names.push(output_name(record, data));
        Ok(())
    };
    let summary = watch.extract(FileFilter::All, FailurePolicy::Abort, &mut sink).unwrap();

    assert_eq!(summary.extracted.len(), 3);
    assert_eq!(summary.skipped, 0);
    assert_eq!(names, vec!["810002.bin", "2014-05-13_16:53:20.ttbin", "F20000.bin"]);
}

/// Under `Continue` a failed file is reported and the remaining files are
/// still extracted.
#[test]
fn test_continue_collects_failures() {
    let mut sim = SimulatedWatch::with_files(&[
        (0x9100_0001, track_body(1_400_000_000, 150)),
        (0x9100_0002, track_body(1_400_000_100, 150)),
    ]);
    sim.faults.bad_chunk_at = Some(0);
    let mut watch = Watch::new(sim);

    let mut stored = Vec::new();
    let mut sink = |record: &FileRecord, _: &[u8]| -> Result<(), SinkError> {
        stored.push(record.id());
        Ok(())
    };
    let summary = watch
        .extract(FileFilter::TracksOnly, FailurePolicy::Continue, &mut sink)
        .unwrap();

    assert_eq!(stored, vec![0x9100_0002]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].record.id(), 0x9100_0001);
    assert_eq!(watch.into_inner().closed, vec![0x9100_0001, 0x9100_0002]);
}

/// Under `Abort` the first failed file ends the extraction.
#[test]
fn test_abort_stops_at_first_failure() {
    let mut sim = SimulatedWatch::with_files(&[
        (0x9100_0001, track_body(1_400_000_000, 150)),
        (0x9100_0002, track_body(1_400_000_100, 150)),
    ]);
    sim.faults.bad_chunk_at = Some(0);
    let mut watch = Watch::new(sim);

    let mut sink = |_: &FileRecord, _: &[u8]| -> Result<(), SinkError> { Ok(()) };
    let err = watch
        .extract(FileFilter::TracksOnly, FailurePolicy::Abort, &mut sink)
        .unwrap_err();

    match err {
        ExtractError::Transfer(failure) => assert_eq!(failure.record.id(), 0x9100_0001),
        other => panic!("unexpected error: {other}"),
    }
    let sim = watch.into_inner();
    assert_eq!(sim.closed, vec![0x9100_0001]);
    assert!(sim.received.iter().all(|r| r.verb() == 0x11 || r.verb() == 0x12 || r.file_id() == 0x9100_0001));
}

/// A directory failure is reported as such, before any file is touched.
#[test]
fn test_directory_failure() {
    let mut sim = SimulatedWatch::with_files(&[(0x9100_0001, body(0, 10))]);
    sim.faults.stale_counter_at = Some(1);
    let mut watch = Watch::new(sim);

    let mut sink = |_: &FileRecord, _: &[u8]| -> Result<(), SinkError> { Ok(()) };
    let err = watch.extract(FileFilter::All, FailurePolicy::Continue, &mut sink).unwrap_err();
    assert!(matches!(err, ExtractError::Directory(_)));
    assert!(watch.into_inner().closed.is_empty());
}
