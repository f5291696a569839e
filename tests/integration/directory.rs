use watchdump_core::directory::{list_files, DEFAULT_MAX_ENTRIES};
use watchdump_core::{CommandChannel, FileRecord, Watch};

use crate::*;

/// Files come back in firmware order, and the listing stops at the first end
/// entry without producing a record for it.
#[test]
fn test_listing_preserves_device_order() {
    let files = [
        (0x0081_0002, body(0, 40)),
        (0x9100_0007, body(1, 900)),
        (0x9100_0001, body(2, 10)),
    ];
    let mut sim = SimulatedWatch::with_files(&files);
    sim.end_entry = (0x9100_00FF, 12);
    let mut watch = Watch::new(sim);

    let listed = watch.list_files().unwrap();
    assert_eq!(
        listed,
        vec![
            FileRecord::new(0x0081_0002, 40),
            FileRecord::new(0x9100_0007, 900),
            FileRecord::new(0x9100_0001, 10),
        ]
    );
    assert_eq!(watch.into_inner().verbs(), vec![0x11, 0x12, 0x12, 0x12, 0x12]);
}

/// An end entry carrying a real-looking record still yields an empty listing
/// and no file reads.
#[test]
fn test_end_entry_first_means_empty_listing() {
    let mut sim = SimulatedWatch::default();
    sim.end_entry = (0x9100_0001, 0);
    let mut watch = Watch::new(sim);

    assert!(watch.list_files().unwrap().is_empty());
    let sim = watch.into_inner();
    assert_eq!(sim.verbs(), vec![0x11, 0x12]);
    assert!(sim.closed.is_empty());
}

/// A device that never ends the listing is cut off at the configured bound.
#[test]
fn test_endless_listing_is_bounded() {
    let mut sim = SimulatedWatch::default();
    sim.faults.endless_directory = true;
    let mut channel = CommandChannel::new(sim);

    let listed = list_files(&mut channel, 25).unwrap();
    assert_eq!(listed.len(), 25);
    assert_eq!(channel.into_inner().received.len(), 1 + 25);
}

/// The default bound is the thousand round trips the original tool used.
#[test]
fn test_default_bound() {
    let mut sim = SimulatedWatch::default();
    sim.faults.endless_directory = true;
    let mut watch = Watch::new(sim);
    assert_eq!(watch.list_files().unwrap().len(), DEFAULT_MAX_ENTRIES);
}

/// Listing twice rewinds the device iterator each time.
#[test]
fn test_listing_can_be_repeated() {
    let mut watch = Watch::new(SimulatedWatch::with_files(&[(1, body(0, 3))]));
    let first = watch.list_files().unwrap();
    let second = watch.list_files().unwrap();
    assert_eq!(first, second);
}
