//! JSON Lines journal: one serialized row per line, append-only.

use crate::error::StoreResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Append-only writer over a single `.jsonl` file.
pub struct Journal {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Journal {
    /// Open the journal for appending, creating the file (and parent
    /// directories) if needed.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row and flush it to the OS.
    ///
    /// Row rates here are radio-paced (a few per second at most), so
    /// flushing per append keeps the journal current without hurting
    /// throughput.
    pub fn append<T: Serialize>(&mut self, row: &T) -> StoreResult<()> {
        let line = serde_json::to_string(row)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read every row back from a journal file.
    ///
    /// Corrupt lines (e.g. a torn write from a crash) are logged and
    /// skipped rather than failing the whole replay. A missing file is
    /// an empty journal.
    pub fn replay<T: DeserializeOwned>(path: &Path) -> StoreResult<Vec<T>> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut rows = Vec::new();
        let mut skipped = 0usize;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(row) => rows.push(row),
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(path = %path.display(), skipped, "Skipped corrupt journal lines during replay");
        }
        Ok(rows)
    }
}
