//! watchdump-core — protocol engine for pulling files off a TomTom GPS watch.
//!
//! Layers, bottom up: [`transport`] moves raw packets, [`channel`] frames
//! commands and matches replies, [`directory`] and [`transfer`] implement the
//! listing and file sub-protocols, and [`session`] ties them into one
//! extraction run.

pub mod channel;
pub mod config;
pub mod diag;
pub mod directory;
pub mod error;
pub mod naming;
pub mod session;
pub mod transfer;
pub mod transport;
pub mod wire;

#[cfg(test)]
mod testing;

pub use channel::CommandChannel;
pub use error::{Error, ErrorKind, Violation};
pub use session::{ExtractError, ExtractSummary, FailurePolicy, FileFilter, FileSink, Watch};
pub use transfer::{RetrievedFile, TransferFailure};
pub use transport::{Transport, TransportError};
pub use wire::FileRecord;
