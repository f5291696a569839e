//! Writes extracted files into an output directory.
//!
//! Each file is stored under its derived name (see `naming`), and a
//! `manifest.json` records what was written:
//!
//!   [{ "id": "91000003", "length": 4113, "name": "2014-03-02_08:15:42.ttbin",
//!      "blake3": "…" }]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use watchdump_core::naming::output_name;
use watchdump_core::session::{FileSink, SinkError};
use watchdump_core::FileRecord;

pub const MANIFEST_NAME: &str = "manifest.json";

#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub id: String,
    pub length: u32,
    pub name: String,
    pub blake3: String,
}

pub struct DirectorySink {
    root: PathBuf,
    entries: Vec<ManifestEntry>,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create output directory: {}", root.display()))?;
        Ok(Self { root, entries: Vec::new() })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Write `manifest.json` next to the extracted files.
    pub fn write_manifest(&self) -> Result<PathBuf> {
        let path = self.root.join(MANIFEST_NAME);
        let json = serde_json::to_vec_pretty(&self.entries)?;
        fs::write(&path, json)
            .with_context(|| format!("failed to write manifest: {}", path.display()))?;
        Ok(path)
    }
}

impl FileSink for DirectorySink {
    fn store(&mut self, record: &FileRecord, data: &[u8]) -> Result<(), SinkError> {
        let name = output_name(record, data);
        let path = self.root.join(&name);
        fs::write(&path, data)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(file = %record, name = %name, "file written");

        self.entries.push(ManifestEntry {
            id: format!("{:08X}", record.id()),
            length: record.length(),
            name,
            blake3: hex::encode(blake3::hash(data).as_bytes()),
        });
        Ok(())
    }
}
