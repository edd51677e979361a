//! MIME resolver.
//!
//! The table is read once at startup from the `Config/Mime.txt` record of the
//! program bank, one `ext=content-type,true|false` line per type, and is
//! immutable for the process lifetime. The binary flag decides byte versus
//! text handling everywhere an asset crosses the filesystem boundary.

use std::collections::HashMap;

use crate::bank::Bank;
use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};

/// One resolved entry: the content type served over the wire and whether the
/// asset is binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeType {
    pub content_type: String,
    pub binary: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MimeTable {
    types: HashMap<String, MimeType>,
}

impl MimeTable {
    /// Loads the table from the `Config/<name>.txt` record of the given bank.
    /// Every value must split into exactly a content type and a binary flag.
    pub fn load(bank: &Bank, name: &str) -> AppResult<Self> {
        let config = ServerConfig::load(bank, name)?;
        let mut types = HashMap::new();
        for (ext, value) in config.entries() {
            let pair: Vec<&str> = value.split(',').collect();
            if pair.len() != 2 {
                return Err(AppError::format("Mime data not formatted correctly."));
            }
            types.insert(
                ext.to_string(),
                MimeType { content_type: pair[0].to_string(), binary: pair[1] == "true" },
            );
        }
        Ok(Self { types })
    }

    pub fn resolve(&self, ext: &str) -> AppResult<&MimeType> {
        self.types
            .get(ext)
            .ok_or_else(|| AppError::unknown_type(format!("MIME type {ext} is not defined.")))
    }

    pub fn has(&self, ext: &str) -> bool {
        self.types.contains_key(ext)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
