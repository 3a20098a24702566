// src/core/backup.rs

use crate::constants::{BACKUPS_DIR, BACKUP_VERSION};
use crate::core::file_manager::{FileManager, FileManagerError};
use crate::models::{BackupEnvelope, BackupMetadata, DomainConfig, StoredAction};
use chrono::Utc;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("File Error: {0}")]
    File(#[from] FileManagerError),
    #[error("Backup '{id}' not found.")]
    NotFound { id: String },
}

type BackupResult<T> = Result<T, BackupError>;

/// Assembles a full snapshot envelope from the store's current contents.
/// The id embeds the timestamp for human-sortable listings plus a short
/// random suffix so two snapshots in the same second cannot collide.
pub fn build_backup(actions: Vec<StoredAction>, configs: Vec<DomainConfig>) -> BackupEnvelope {
    let timestamp = Utc::now();
    let suffix = Uuid::new_v4().simple().to_string();
    let backup_id = format!(
        "backup-{}-{}",
        timestamp.format("%Y%m%d-%H%M%S"),
        &suffix[..8]
    );

    let domain_configs: HashMap<String, DomainConfig> = configs
        .into_iter()
        .map(|c| (c.domain.clone(), c))
        .collect();
    let mut domains: Vec<String> = domain_configs.keys().cloned().collect();
    domains.sort();

    BackupEnvelope {
        metadata: BackupMetadata {
            backup_id,
            timestamp,
            version: BACKUP_VERSION,
            total_actions: actions.len(),
            total_domains: domains.len(),
        },
        actions,
        domain_configs,
        domains,
    }
}

/// Persists a snapshot under `backups/` and returns its logical key.
pub fn write_backup(files: &FileManager, envelope: &BackupEnvelope) -> BackupResult<String> {
    let key = FileManager::backup_path(&envelope.metadata.backup_id);
    files.write_json(&key, envelope)?;
    log::info!(
        "Wrote backup '{}' ({} actions, {} domains).",
        envelope.metadata.backup_id,
        envelope.metadata.total_actions,
        envelope.metadata.total_domains
    );
    Ok(key)
}

/// Loads a snapshot by its backup id.
pub fn load_backup(files: &FileManager, backup_id: &str) -> BackupResult<BackupEnvelope> {
    files
        .read_json(&FileManager::backup_path(backup_id))?
        .ok_or_else(|| BackupError::NotFound {
            id: backup_id.to_string(),
        })
}

/// Lists the metadata of every snapshot on disk, newest first. Unreadable
/// snapshots are skipped with a warning rather than failing the listing.
pub fn list_backups(files: &FileManager) -> BackupResult<Vec<BackupMetadata>> {
    let mut backups = Vec::new();
    for key in files.list_json_files(BACKUPS_DIR)? {
        match files.read_json::<BackupEnvelope>(&key) {
            Ok(Some(envelope)) => backups.push(envelope.metadata),
            Ok(None) => {}
            Err(e) => log::warn!("Skipping unreadable backup '{}': {}", key, e),
        }
    }
    backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(backups)
}

// MARK: --- UNIT TESTS ---
