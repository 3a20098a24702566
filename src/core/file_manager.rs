// src/core/file_manager.rs

use crate::constants::{
    ACTIONS_DIR, ACTION_INDEX_FILENAME, BACKUPS_DIR, DOMAIN_ACTIONS_DIR, DOMAIN_CONFIGS_DIR,
    GLOBAL_ACTIONS_DIR,
};
use crate::models::{ActionScope, ScopeKind};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum FileManagerError {
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse JSON document '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize JSON document '{path}': {source}")]
    JsonSerialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid storage path '{path}': paths must be relative and must not escape the storage root.")]
    InvalidPath { path: String },
}

type FmResult<T> = Result<T, FileManagerError>;

/// Aggregate size information for the storage area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    pub total_size: u64,
    pub file_count: usize,
}

/// Key-value JSON file I/O over a sandboxed storage root.
///
/// Paths are logical keys relative to the root (`actions/global/a1.json`),
/// never absolute. Reads of missing documents return `Ok(None)`; writes are
/// atomic per document (temp sibling, then rename), so a crash mid-write
/// cannot leave a half-written JSON file behind.
#[derive(Debug)]
pub struct FileManager {
    root: PathBuf,
}

impl FileManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the directory skeleton the store expects.
    pub fn initialize(&self) -> FmResult<()> {
        for dir in [
            format!("{}/{}", ACTIONS_DIR, GLOBAL_ACTIONS_DIR),
            format!("{}/{}", ACTIONS_DIR, DOMAIN_ACTIONS_DIR),
            DOMAIN_CONFIGS_DIR.to_string(),
            BACKUPS_DIR.to_string(),
        ] {
            self.create_directory(&dir)?;
        }
        Ok(())
    }

    /// Resolves a logical key against the root, rejecting anything that
    /// could escape the sandbox.
    fn resolve(&self, rel: &str) -> FmResult<PathBuf> {
        let candidate = Path::new(rel);
        let escapes = candidate.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if rel.is_empty() || escapes {
            return Err(FileManagerError::InvalidPath {
                path: rel.to_string(),
            });
        }
        Ok(self.root.join(candidate))
    }

    /// Reads and deserializes a JSON document. A missing file is `Ok(None)`,
    /// never an error; a file that exists but does not parse is an error the
    /// caller decides how to handle.
    pub fn read_json<T: DeserializeOwned>(&self, rel: &str) -> FmResult<Option<T>> {
        let path = self.resolve(rel)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value = serde_json::from_str(&raw).map_err(|e| FileManagerError::Json {
            path: rel.to_string(),
            source: e,
        })?;
        Ok(Some(value))
    }

    /// Serializes and writes a JSON document atomically.
    pub fn write_json<T: Serialize>(&self, rel: &str, value: &T) -> FmResult<()> {
        let raw =
            serde_json::to_string_pretty(value).map_err(|e| FileManagerError::JsonSerialize {
                path: rel.to_string(),
                source: e,
            })?;
        self.write_text(rel, &raw)
    }

    /// Writes raw text atomically: the content lands in a temp sibling first
    /// and is renamed over the target.
    pub fn write_text(&self, rel: &str, content: &str) -> FmResult<()> {
        let path = self.resolve(rel)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Deletes a document. Returns `false` (not an error) if it was already
    /// gone.
    pub fn delete(&self, rel: &str) -> FmResult<bool> {
        let path = self.resolve(rel)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn create_directory(&self, rel: &str) -> FmResult<()> {
        let path = self.resolve(rel)?;
        fs::create_dir_all(path)?;
        Ok(())
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.resolve(rel).map(|p| p.exists()).unwrap_or(false)
    }

    /// Turns an arbitrary name into a safe single path segment. Anything
    /// outside `[A-Za-z0-9._-]` becomes `_`; a name that sanitizes to
    /// nothing (or to dots only) becomes `_`.
    pub fn sanitize_filename(name: &str) -> String {
        let sanitized: String = name
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
            "_".to_string()
        } else {
            sanitized
        }
    }

    /// The logical key of an action document for a given id and scope.
    /// Global actions live flat; everything scoped goes under its domain.
    pub fn action_file_path(id: &str, scope: &ActionScope) -> String {
        let file = format!("{}.json", Self::sanitize_filename(id));
        match (&scope.kind, &scope.domain) {
            (ScopeKind::Global, _) | (_, None) => {
                format!("{}/{}/{}", ACTIONS_DIR, GLOBAL_ACTIONS_DIR, file)
            }
            (_, Some(domain)) => format!(
                "{}/{}/{}/{}",
                ACTIONS_DIR,
                DOMAIN_ACTIONS_DIR,
                Self::sanitize_filename(domain),
                file
            ),
        }
    }

    pub fn domain_config_path(domain: &str) -> String {
        format!(
            "{}/{}.json",
            DOMAIN_CONFIGS_DIR,
            Self::sanitize_filename(domain)
        )
    }

    pub fn index_path() -> String {
        ACTION_INDEX_FILENAME.to_string()
    }

    pub fn backup_path(backup_id: &str) -> String {
        format!(
            "{}/{}.json",
            BACKUPS_DIR,
            Self::sanitize_filename(backup_id)
        )
    }

    /// Lists the logical keys of every action document on disk, whether or
    /// not the index knows about it.
    pub fn list_action_files(&self) -> FmResult<Vec<String>> {
        self.list_json_files(ACTIONS_DIR)
    }

    /// Lists the logical keys of every `.json` document under a subtree.
    pub fn list_json_files(&self, rel_dir: &str) -> FmResult<Vec<String>> {
        let subtree = self.resolve(rel_dir)?;
        if !subtree.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in WalkDir::new(&subtree).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&self.root) {
                keys.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Walks the whole storage area and sums document sizes.
    pub fn storage_stats(&self) -> FmResult<StorageStats> {
        let mut total_size = 0u64;
        let mut file_count = 0usize;
        for entry in WalkDir::new(&self.root).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() {
                total_size += entry.metadata().map(|m| m.len()).unwrap_or(0);
                file_count += 1;
            }
        }
        Ok(StorageStats {
            total_size,
            file_count,
        })
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActionScope;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Doc {
        value: u32,
    }

    #[test]
    fn test_read_missing_is_none_not_error() {
        let dir = TempDir::new().unwrap();
        let fm = FileManager::new(dir.path());
        let result: Option<Doc> = fm.read_json("nope/missing.json").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let fm = FileManager::new(dir.path());

        fm.write_json("sub/doc.json", &Doc { value: 7 }).unwrap();
        let read: Option<Doc> = fm.read_json("sub/doc.json").unwrap();

        assert_eq!(read, Some(Doc { value: 7 }));
        // The temp sibling must not be left behind.
        assert!(!fm.exists("sub/doc.tmp"));
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let dir = TempDir::new().unwrap();
        let fm = FileManager::new(dir.path());
        assert!(!fm.delete("ghost.json").unwrap());
    }

    #[test]
    fn test_corrupt_document_is_an_error() {
        let dir = TempDir::new().unwrap();
        let fm = FileManager::new(dir.path());
        fm.write_text("bad.json", "{ not json").unwrap();

        let result: Result<Option<Doc>, _> = fm.read_json("bad.json");
        assert!(matches!(result, Err(FileManagerError::Json { .. })));
    }

    #[test]
    fn test_path_escape_rejected() {
        let dir = TempDir::new().unwrap();
        let fm = FileManager::new(dir.path());
        let result: Result<Option<Doc>, _> = fm.read_json("../outside.json");
        assert!(matches!(result, Err(FileManagerError::InvalidPath { .. })));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(FileManager::sanitize_filename("a b/c"), "a_b_c");
        assert_eq!(FileManager::sanitize_filename("shop.example.com"), "shop.example.com");
        assert_eq!(FileManager::sanitize_filename(".."), "_");
        assert_eq!(FileManager::sanitize_filename(""), "_");
    }

    #[test]
    fn test_action_file_path_by_scope() {
        let global = ActionScope::global(0);
        assert_eq!(
            FileManager::action_file_path("a1", &global),
            "actions/global/a1.json"
        );

        let scoped = ActionScope::domain("example.com", 0);
        assert_eq!(
            FileManager::action_file_path("a2", &scoped),
            "actions/domains/example.com/a2.json"
        );
    }

    #[test]
    fn test_list_action_files_finds_all_scopes() {
        let dir = TempDir::new().unwrap();
        let fm = FileManager::new(dir.path());
        fm.initialize().unwrap();
        fm.write_json("actions/global/a.json", &Doc { value: 1 }).unwrap();
        fm.write_json("actions/domains/example.com/b.json", &Doc { value: 2 })
            .unwrap();
        // Index and domain configs must not be picked up as actions.
        fm.write_json("index.json", &Doc { value: 3 }).unwrap();

        let files = fm.list_action_files().unwrap();
        assert_eq!(
            files,
            vec![
                "actions/domains/example.com/b.json".to_string(),
                "actions/global/a.json".to_string(),
            ]
        );
    }
}
