// src/core/integrity.rs

use anyhow::{Context, Result};
use log::debug;
use std::{fs, path::Path, time::SystemTime};

const HASH_TRUNCATE_LENGTH: usize = 16; // 16 bytes = 32 hex characters

/// Validation metadata for one action document on disk.
/// The layered shape allows fast checks (mtime, size) before hashing.
#[derive(Debug, PartialEq, Eq)]
pub struct FileValidationData {
    pub timestamp: SystemTime,
    pub file_size: u64,
    pub content_hash: String,
}

/// Calculates the validation metadata for an action file.
///
/// 1. Timestamp (modified time)
/// 2. File size
/// 3. Content Hash (blake3)
///
/// # Errors
/// Returns an I/O error if the file cannot be read or its metadata cannot be
/// accessed.
pub fn file_validation_data(path: &Path) -> Result<FileValidationData> {
    debug!("Calculating validation data for '{}'", path.display());

    let metadata = fs::metadata(path)
        .with_context(|| format!("Failed to read metadata for file '{}'", path.display()))?;

    let timestamp = metadata.modified()?;
    let file_size = metadata.len();

    let content = fs::read(path)
        .with_context(|| format!("Failed to read content of file '{}'", path.display()))?;

    let hash = blake3::hash(&content);
    let content_hash = hex::encode(&hash.as_bytes()[..HASH_TRUNCATE_LENGTH]);

    Ok(FileValidationData {
        timestamp,
        file_size,
        content_hash,
    })
}
