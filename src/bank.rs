//!
//! coffer bank
//! -----------
//! The bank is a single-file flat data store: an in-memory map from a
//! flattened path key to a record, loaded wholesale from one backing file in
//! a line-oriented framing format and persisted wholesale by rewriting that
//! file. Two record kinds exist: `code` records hold their full text content
//! in memory as ordered lines; `link` records only mark that a binary asset
//! exists on the plain filesystem under the unnormalized path.
//!
//! Key responsibilities:
//! - Load/decode and render/save the backing file (see `format`).
//! - Synchronous `get`/`put`/`delete` on the key map.
//! - Folder browsing by key prefix and wildcard file queries (see `wildcard`).
//! - Building a bank from a directory tree for the pack tool.
//!
//! The public API centers around the `Bank` type, which the server wraps in a
//! thread-safe `SharedBank` (`Arc<Mutex<Bank>>`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::mime::MimeTable;

pub mod format;
pub mod paths;
pub mod wildcard;

/// A single entry in the bank, keyed by its flattened path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Text asset whose full content is held in memory as ordered lines.
    Code { lines: Vec<String> },
    /// Marker for a binary asset whose bytes live outside the bank.
    Link,
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Code { .. } => RecordKind::Code,
            Record::Link => RecordKind::Link,
        }
    }

    /// The record's content lines. A link record has none.
    pub fn lines(&self) -> &[String] {
        match self {
            Record::Code { lines } => lines,
            Record::Link => &[],
        }
    }

    /// Content lines joined with `\n`, the shape served over the wire.
    pub fn content(&self) -> String {
        self.lines().join("\n")
    }

    pub fn line_count(&self) -> usize {
        self.lines().len()
    }
}

/// The two storable record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Code,
    Link,
}

impl RecordKind {
    pub fn parse(kind: &str) -> AppResult<Self> {
        match kind {
            "code" => Ok(RecordKind::Code),
            "link" => Ok(RecordKind::Link),
            _ => Err(AppError::format("Not code or link.")),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Code => "code",
            RecordKind::Link => "link",
        }
    }
}

/// The in-memory store plus the identity of its backing file.
#[derive(Debug, Clone)]
pub struct Bank {
    name: String,
    path: PathBuf,
    records: BTreeMap<String, Record>,
}

impl Bank {
    /// Backing file location for a named bank under a root folder.
    pub fn file_path(root: &Path, name: &str) -> PathBuf {
        root.join("Banks").join(format!("{name}.txt"))
    }

    /// A bank with no records, ready to be filled and saved.
    pub fn empty(root: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: Self::file_path(root, name),
            records: BTreeMap::new(),
        }
    }

    /// Loads a bank by decoding its backing file fully into memory.
    ///
    /// An unreadable file is an `Io` error, propagated so the caller decides
    /// whether an absent file means an empty store. A malformed block is a
    /// `Format` error.
    pub fn load(root: &Path, name: &str) -> AppResult<Self> {
        let path = Self::file_path(root, name);
        let data = std::fs::read_to_string(&path)?;
        let records = format::parse(&data)?;
        debug!(target: "coffer::bank", "Loaded bank '{}' with {} records.", name, records.len());
        Ok(Self { name: name.to_string(), path, records })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backing_path(&self) -> &Path {
        &self.path
    }

    /// Serializes every record into the backing-file format.
    pub fn render(&self) -> String {
        format::render(&self.records)
    }

    /// Rewrites the backing file in full from the in-memory map.
    pub fn save(&self) -> AppResult<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&self.path, self.render())?;
        Ok(())
    }

    /// Looks up a record by hierarchical path or bank key.
    pub fn get(&self, name: &str) -> AppResult<&Record> {
        let key = paths::to_bank_key(name);
        self.records
            .get(&key)
            .ok_or_else(|| AppError::not_found(format!("{key} does not exist.")))
    }

    /// Stores a record, fully replacing any prior record at that key.
    ///
    /// `code` data is split into lines with trailing blanks trimmed; `link`
    /// ignores `data` entirely.
    pub fn put(&mut self, name: &str, kind: RecordKind, data: &str) {
        let key = paths::to_bank_key(name);
        let record = match kind {
            RecordKind::Code => Record::Code { lines: format::split_lines(data) },
            RecordKind::Link => Record::Link,
        };
        self.records.insert(key, record);
    }

    pub fn delete(&mut self, name: &str) -> AppResult<()> {
        let key = paths::to_bank_key(name);
        match self.records.remove(&key) {
            Some(_) => Ok(()),
            None => Err(AppError::not_found(format!("{key} was not found."))),
        }
    }

    /// All keys under a folder, by plain prefix test on the normalized form.
    ///
    /// Prefix `A->B` also matches `A->B2->C`; callers that need exact folder
    /// boundaries must append a separator themselves.
    pub fn browse_by_folder(&self, folder: &str) -> Vec<String> {
        let prefix = paths::to_bank_key(folder);
        self.records
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .cloned()
            .collect()
    }

    /// Browses a folder, then filters the keys through the wildcard engine.
    pub fn query_files(&self, folder: &str, search: &str) -> Vec<String> {
        wildcard::filter(&self.browse_by_folder(folder), search)
    }

    pub fn records(&self) -> &BTreeMap<String, Record> {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Reads a text file from disk and stores it as a `code` record named by
    /// its path.
    pub fn add_file(&mut self, file: &str) -> AppResult<()> {
        let data = std::fs::read_to_string(file)?;
        self.put(file, RecordKind::Code, &data);
        Ok(())
    }

    /// Walks a directory tree and stores every file with a known MIME
    /// extension: binary types as `link` records, text types as `code`
    /// records with the file's content. Returns the number of records added.
    pub fn create_from_directory(&mut self, dir: &Path, mime: &MimeTable) -> AppResult<usize> {
        let base = dir.parent().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
        let mut added = 0usize;
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry.map_err(|e| AppError::io(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(&base).unwrap_or(entry.path());
            let name = rel.to_string_lossy().replace('\\', "/");
            let ext = paths::file_extension(&name);
            if !mime.has(&ext) {
                continue;
            }
            if mime.resolve(&ext)?.binary {
                self.put(&name, RecordKind::Link, "");
                debug!(target: "coffer::bank", "Added link {name}.");
                added += 1;
            } else {
                match std::fs::read_to_string(entry.path()) {
                    Ok(data) => {
                        self.put(&name, RecordKind::Code, &data);
                        debug!(target: "coffer::bank", "Added code {name}.");
                        added += 1;
                    }
                    Err(e) => warn!(target: "coffer::bank", "Skipped {name}: {e}"),
                }
            }
        }
        Ok(added)
    }
}

/// Thread-safe handle to a bank shared across request handlers.
#[derive(Clone)]
pub struct SharedBank(pub Arc<Mutex<Bank>>);

impl SharedBank {
    pub fn new(bank: Bank) -> Self {
        Self(Arc::new(Mutex::new(bank)))
    }
}

#[cfg(test)]
#[path = "bank/bank_tests.rs"]
mod bank_tests;
