// src/core/paths.rs

use crate::models::StoreSettings;
use anyhow::{Result, anyhow};
use lazy_static::lazy_static;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

lazy_static! {
    static ref STORE_ROOT: Mutex<Option<PathBuf>> = Mutex::new(None);
}

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find system data directory.")]
    DataDirNotFound,
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    #[error("Could not create storage directory at '{path}': {source}")]
    StorageDirCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid storage directory override '{template}': {reason}")]
    InvalidOverride { template: String, reason: String },
}

/// Returns the storage root for the action store, creating it if needed.
///
/// The root is the `storage_dir` override from the settings if present
/// (after tilde/env expansion), otherwise `<data_local_dir>/webact`.
///
/// This function is memoized: the first call computes and caches the path,
/// subsequent calls return the cached value instantly.
pub fn get_store_root(settings: &StoreSettings) -> Result<PathBuf, PathError> {
    let mut cached_path_guard = STORE_ROOT.lock().unwrap();

    if let Some(path) = &*cached_path_guard {
        return Ok(path.clone());
    }

    // --- Cache miss: compute the root for the first time ---
    let root = match &settings.storage_dir {
        Some(template) => {
            expand_storage_template(template).map_err(|e| PathError::InvalidOverride {
                template: template.clone(),
                reason: e.to_string(),
            })?
        }
        None => dirs::data_local_dir()
            .ok_or(PathError::DataDirNotFound)?
            .join("webact"),
    };

    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| PathError::StorageDirCreation {
            path: root.display().to_string(),
            source: e,
        })?;
    }

    *cached_path_guard = Some(root.clone());

    Ok(root)
}

/// Returns the directory holding user settings (`~/.config/webact`).
/// Unlike the storage root, this is not created on demand: a missing
/// settings directory simply means default settings.
pub fn get_settings_dir() -> Result<PathBuf, PathError> {
    dirs::config_dir()
        .map(|dir| dir.join("webact"))
        .ok_or(PathError::ConfigDirNotFound)
}

/// Expands a storage-root template, resolving the home directory (`~`) and
/// environment variables (`$VAR` or `%VAR%`).
///
/// # Errors
/// Returns an error if an environment variable in the template is unset.
pub fn expand_storage_template(template: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(template)
        .map_err(|e| anyhow!("Failed to expand storage path template '{}': {}", template, e))?;
    Ok(PathBuf::from(expanded.into_owned()))
}
