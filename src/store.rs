// src/store.rs

use crate::core::backup::{self, BackupError};
use crate::core::domain_manager::{self, DomainError};
use crate::core::file_manager::{FileManager, FileManagerError, StorageStats};
use crate::core::import_export::{self, ImportError, ImportFormat};
use crate::core::index_manager::ActionIndexManager;
use crate::core::paths::{self, PathError};
use crate::core::settings::{self, SettingsError};
use crate::core::validator;
use crate::core::{integrity, pattern_resolver};
use crate::models::{
    ActionChanges, ActionIndex, ActionIndexEntry, BackupEnvelope, BackupMetadata, DomainConfig,
    ImportOptions, ImportReport, IndexStatistics, ResolvedAction, RestoreOptions, RestoreReport,
    ScopeKind, StoreSettings, StoredAction, UrlPatternDefinition, ValidationIssue, VerifyReport,
};
use chrono::Utc;
use rayon::prelude::*;
use std::cell::RefCell;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Represents errors surfaced at the store boundary. Underlying I/O failures
/// are converted here and never escape as panics or unhandled propagation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("The action store is not initialized. Call initialize() first.")]
    NotInitialized,
    #[error("Action '{id}' not found.")]
    NotFound {
        /// The id that missed.
        id: String,
    },
    #[error("Action failed validation ({} issue(s)).", .issues.len())]
    Validation {
        /// Field-level findings, in check order.
        issues: Vec<ValidationIssue>,
    },
    #[error("The persisted action index is corrupt and strict_load is set: {0}")]
    CorruptIndex(String),
    #[error("File Error: {0}")]
    File(#[from] FileManagerError),
    #[error("Domain Error: {0}")]
    Domain(#[from] DomainError),
    #[error("Backup Error: {0}")]
    Backup(#[from] BackupError),
    #[error("Import Error: {0}")]
    Import(#[from] ImportError),
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
}

type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreState {
    Uninitialized,
    Ready,
}

/// The facade over the whole storage engine: validation, file I/O, the
/// in-memory index, domain configs, URL resolution, import/export, and
/// backups.
///
/// All mutation goes through `&mut self`, so writers are serialized by the
/// borrow checker within a process. The persisted index stays a single
/// last-writer-wins JSON blob across processes; with one writer that is the
/// accepted trade for an extension-local store.
#[derive(Debug)]
pub struct ActionsStore {
    files: FileManager,
    index: ActionIndexManager,
    settings: StoreSettings,
    state: StoreState,
}

impl ActionsStore {
    /// Builds an uninitialized store over an explicit root. Nothing touches
    /// the filesystem until `initialize()`.
    pub fn new(root: impl Into<PathBuf>, settings: StoreSettings) -> Self {
        Self {
            files: FileManager::new(root),
            index: ActionIndexManager::new(),
            settings,
            state: StoreState::Uninitialized,
        }
    }

    /// Opens and initializes the store at the user's configured (or
    /// platform-default) location. The entry point the CLI uses.
    pub fn open_default() -> StoreResult<Self> {
        let settings = settings::load_settings()?;
        let root = paths::get_store_root(&settings)?;
        let mut store = Self::new(root, settings);
        store.initialize()?;
        Ok(store)
    }

    /// Brings the store to `Ready`: creates the directory skeleton and loads
    /// the persisted index. Idempotent: a second call is a no-op.
    ///
    /// A corrupt index is loaded fail-open (log, start empty) unless the
    /// `strict_load` setting is on; an empty store is always recoverable via
    /// `verify()`, which re-adopts action files from disk. On any failure
    /// the store remains `Uninitialized`.
    pub fn initialize(&mut self) -> StoreResult<()> {
        if self.state == StoreState::Ready {
            log::debug!("Store already initialized; ignoring repeat initialize().");
            return Ok(());
        }

        self.files.initialize()?;

        let raw = match self.files.read_json::<ActionIndex>(&FileManager::index_path()) {
            Ok(raw) => raw,
            Err(e) => {
                if self.settings.strict_load {
                    return Err(StoreError::CorruptIndex(e.to_string()));
                }
                log::warn!(
                    "Persisted action index is corrupt ({}); starting empty. Run 'verify' to rebuild it from the action files.",
                    e
                );
                None
            }
        };
        self.index.load(raw);
        self.state = StoreState::Ready;
        log::debug!(
            "Action store ready at '{}' with {} indexed actions.",
            self.files.root().display(),
            self.index.len()
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state == StoreState::Ready
    }

    fn ensure_ready(&self) -> StoreResult<()> {
        match self.state {
            StoreState::Ready => Ok(()),
            StoreState::Uninitialized => Err(StoreError::NotInitialized),
        }
    }

    fn persist_index(&self) -> StoreResult<()> {
        self.files
            .write_json(&FileManager::index_path(), &self.index.snapshot())?;
        Ok(())
    }

    // --- ACTION CRUD ---

    /// Validates, sanitizes, and persists an action, then updates and
    /// persists the index. Returns the action id.
    ///
    /// The file write deliberately precedes the index update: a crash in
    /// between leaves an orphan file (harmless, re-adopted by `verify`)
    /// instead of an index entry pointing at nothing.
    pub fn save_action(&mut self, action: StoredAction) -> StoreResult<String> {
        self.ensure_ready()?;

        let report = validator::validate_action(&action);
        if !report.is_valid() {
            return Err(StoreError::Validation {
                issues: report.issues,
            });
        }
        let action = validator::sanitize_action(action);

        // Non-global actions live under their domain; make sure the domain
        // exists as a configured entity, not just a directory.
        if let Some(domain) = &action.scope.domain {
            domain_manager::initialize_domain(&self.files, domain)?;
        }

        let rel = FileManager::action_file_path(&action.id, &action.scope);

        // A re-scoped action moves files; drop the old document so it cannot
        // come back as an orphan.
        let stale = self
            .index
            .entry(&action.id)
            .map(|e| e.file_path.clone())
            .filter(|old| *old != rel);

        self.files.write_json(&rel, &action)?;
        if let Some(old) = stale {
            if let Err(e) = self.files.delete(&old) {
                log::warn!("Could not remove superseded action file '{}': {}", old, e);
            }
        }

        self.index.add_action(&action, rel);
        self.persist_index()?;
        log::debug!("Saved action '{}' ({}).", action.name, action.id);
        Ok(action.id)
    }

    /// Fetches an action by id. An index hit whose file is missing purges
    /// the entry and reports "not found" — self-healing, not an error.
    pub fn get_action(&mut self, id: &str) -> StoreResult<Option<StoredAction>> {
        self.ensure_ready()?;

        let Some(entry) = self.index.entry(id) else {
            return Ok(None);
        };
        let rel = entry.file_path.clone();
        match self.files.read_json::<StoredAction>(&rel)? {
            Some(action) => Ok(Some(action)),
            None => {
                log::warn!(
                    "Index entry '{}' references missing file '{}'; pruning.",
                    id,
                    rel
                );
                self.index.remove_action(id);
                self.persist_index()?;
                Ok(None)
            }
        }
    }

    /// Read-modify-write of an existing action. The id is immutable by
    /// construction (`ActionChanges` has no id field) and `updated_at` is
    /// always refreshed, regardless of what the caller touched.
    pub fn update_action(&mut self, id: &str, changes: ActionChanges) -> StoreResult<StoredAction> {
        self.ensure_ready()?;

        let mut action = self.get_action(id)?.ok_or_else(|| StoreError::NotFound {
            id: id.to_string(),
        })?;

        if let Some(name) = changes.name {
            action.name = name;
        }
        if let Some(description) = changes.description {
            action.description = description;
        }
        if let Some(category) = changes.category {
            action.category = category;
        }
        if let Some(scope) = changes.scope {
            action.scope = scope;
        }
        if let Some(tags) = changes.tags {
            action.tags = tags;
        }
        if let Some(steps) = changes.steps {
            action.steps = steps;
        }
        action.metadata.updated_at = Utc::now();

        self.save_action(action.clone())?;
        // save_action re-sanitizes; return what actually landed.
        self.get_action(id)?.ok_or(StoreError::NotFound {
            id: id.to_string(),
        })
    }

    /// Deletes the action file, then the index entry.
    pub fn delete_action(&mut self, id: &str) -> StoreResult<()> {
        self.ensure_ready()?;

        let entry = self.index.entry(id).ok_or_else(|| StoreError::NotFound {
            id: id.to_string(),
        })?;
        let rel = entry.file_path.clone();

        self.files.delete(&rel)?;
        self.index.remove_action(id);
        self.persist_index()?;
        log::debug!("Deleted action '{}'.", id);
        Ok(())
    }

    // --- READ AGGREGATIONS ---

    /// Loads the given (id, file path) targets in parallel, self-healing
    /// entries whose file has gone missing and skipping unreadable ones.
    fn load_many(&mut self, targets: Vec<(String, String)>) -> StoreResult<Vec<StoredAction>> {
        let files = &self.files;
        let loaded: Vec<(String, Result<Option<StoredAction>, FileManagerError>)> = targets
            .par_iter()
            .map(|(id, rel)| (id.clone(), files.read_json::<StoredAction>(rel)))
            .collect();

        let mut actions = Vec::new();
        let mut missing = Vec::new();
        for (id, result) in loaded {
            match result {
                Ok(Some(action)) => actions.push(action),
                Ok(None) => missing.push(id),
                Err(e) => log::warn!("Skipping unreadable action '{}': {}", id, e),
            }
        }

        if !missing.is_empty() {
            log::warn!(
                "Pruning {} index entr(ies) whose files are gone.",
                missing.len()
            );
            for id in &missing {
                self.index.remove_action(id);
            }
            self.persist_index()?;
        }

        actions.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(actions)
    }

    fn entry_targets(entries: Vec<&ActionIndexEntry>) -> Vec<(String, String)> {
        entries
            .into_iter()
            .map(|e| (e.id.clone(), e.file_path.clone()))
            .collect()
    }

    pub fn get_all_actions(&mut self) -> StoreResult<Vec<StoredAction>> {
        self.ensure_ready()?;
        let targets = Self::entry_targets(self.index.all_entries());
        self.load_many(targets)
    }

    pub fn get_actions_for_domain(&mut self, domain: &str) -> StoreResult<Vec<StoredAction>> {
        self.ensure_ready()?;
        let targets = Self::entry_targets(self.index.entries_for_domain(domain));
        self.load_many(targets)
    }

    pub fn get_global_actions(&mut self) -> StoreResult<Vec<StoredAction>> {
        self.ensure_ready()?;
        let targets = Self::entry_targets(self.index.entries_for_scope(ScopeKind::Global));
        self.load_many(targets)
    }

    /// Resolves the ordered set of actions applicable to a URL, delegating
    /// to the pattern resolver over the live index.
    pub fn get_actions_for_url(&mut self, url: &str) -> StoreResult<Vec<ResolvedAction>> {
        self.ensure_ready()?;

        let missing: RefCell<Vec<String>> = RefCell::new(Vec::new());
        let resolved = pattern_resolver::resolve_actions_for_url(
            url,
            &self.index,
            |id| {
                let entry = self.index.entry(id)?;
                match self.files.read_json::<StoredAction>(&entry.file_path) {
                    Ok(Some(action)) => Some(action),
                    Ok(None) => {
                        missing.borrow_mut().push(id.to_string());
                        None
                    }
                    Err(e) => {
                        log::warn!("Skipping unreadable action '{}': {}", id, e);
                        None
                    }
                }
            },
            |domain| {
                domain_manager::get_config(&self.files, domain)
                    .map_err(|e| log::warn!("Could not read config for '{}': {}", domain, e))
                    .ok()
                    .flatten()
            },
        );

        let missing = missing.into_inner();
        if !missing.is_empty() {
            for id in &missing {
                self.index.remove_action(id);
            }
            self.persist_index()?;
        }
        Ok(resolved)
    }

    /// Case-insensitive substring search over names, descriptions, and tags.
    pub fn search_actions(&mut self, query: &str) -> StoreResult<Vec<StoredAction>> {
        let needle = query.trim().to_lowercase();
        let mut actions = self.get_all_actions()?;
        if needle.is_empty() {
            return Ok(actions);
        }
        actions.retain(|a| {
            a.name.to_lowercase().contains(&needle)
                || a.description.to_lowercase().contains(&needle)
                || a.tags.iter().any(|t| t.contains(&needle))
        });
        Ok(actions)
    }

    /// Usage and composition aggregates, derived entirely from the index.
    pub fn statistics(&self) -> StoreResult<IndexStatistics> {
        self.ensure_ready()?;
        Ok(self.index.statistics(self.settings.top_actions_limit))
    }

    pub fn storage_stats(&self) -> StoreResult<StorageStats> {
        self.ensure_ready()?;
        Ok(self.files.storage_stats()?)
    }

    // --- USAGE TRACKING ---

    /// Records one use of an action: the authoritative counter in the file
    /// is bumped first, then mirrored into the index entry. Usage tracking
    /// is best-effort — I/O failures are logged and swallowed, so a flaky
    /// disk can't break the automation that just ran.
    pub fn record_usage(&mut self, id: &str) -> StoreResult<()> {
        self.ensure_ready()?;

        let Some(entry) = self.index.entry(id) else {
            return Err(StoreError::NotFound { id: id.to_string() });
        };
        let rel = entry.file_path.clone();

        match self.files.read_json::<StoredAction>(&rel) {
            Ok(Some(mut action)) => {
                action.metadata.usage_count += 1;
                action.metadata.last_used = Some(Utc::now());
                match self.files.write_json(&rel, &action) {
                    Ok(()) => {
                        self.index.sync_usage(id, action.metadata.usage_count);
                        if let Err(e) = self.persist_index() {
                            log::warn!("Could not persist index after usage bump: {}", e);
                        }
                    }
                    Err(e) => {
                        log::warn!("Could not record usage for '{}': {}", id, e);
                    }
                }
                Ok(())
            }
            Ok(None) => {
                log::warn!(
                    "Usage recorded against '{}' but its file is gone; pruning.",
                    id
                );
                self.index.remove_action(id);
                if let Err(e) = self.persist_index() {
                    log::warn!("Could not persist index after pruning '{}': {}", id, e);
                }
                Err(StoreError::NotFound { id: id.to_string() })
            }
            Err(e) => {
                log::warn!("Could not read '{}' to record usage: {}", id, e);
                Ok(())
            }
        }
    }

    // --- DOMAIN CONFIGURATION PASS-THROUGHS ---

    pub fn initialize_domain(&mut self, domain: &str) -> StoreResult<DomainConfig> {
        self.ensure_ready()?;
        Ok(domain_manager::initialize_domain(&self.files, domain)?)
    }

    pub fn get_domain_config(&self, domain: &str) -> StoreResult<Option<DomainConfig>> {
        self.ensure_ready()?;
        Ok(domain_manager::get_config(&self.files, domain)?)
    }

    pub fn list_domains(&self) -> StoreResult<Vec<String>> {
        self.ensure_ready()?;
        Ok(domain_manager::list_domains(&self.files)?)
    }

    pub fn add_url_pattern(
        &mut self,
        domain: &str,
        definition: UrlPatternDefinition,
    ) -> StoreResult<DomainConfig> {
        self.ensure_ready()?;
        Ok(domain_manager::add_url_pattern(
            &self.files,
            domain,
            definition,
        )?)
    }

    pub fn remove_url_pattern(&mut self, domain: &str, name: &str) -> StoreResult<bool> {
        self.ensure_ready()?;
        Ok(domain_manager::remove_url_pattern(
            &self.files,
            domain,
            name,
        )?)
    }

    pub fn delete_domain(&mut self, domain: &str) -> StoreResult<bool> {
        self.ensure_ready()?;
        Ok(domain_manager::delete_domain(&self.files, domain)?)
    }

    // --- IMPORT / EXPORT ---

    pub fn export_json(&mut self) -> StoreResult<String> {
        let actions = self.get_all_actions()?;
        Ok(import_export::export_json(actions)?)
    }

    pub fn export_csv(&mut self) -> StoreResult<String> {
        let actions = self.get_all_actions()?;
        Ok(import_export::export_csv(&actions))
    }

    /// Imports a JSON or CSV payload. Each record is validated on its own;
    /// with `skip_invalid` the run continues past bad records, otherwise the
    /// first invalid record aborts with its validation issues. The run is
    /// considered successful if at least one record landed.
    pub fn import(
        &mut self,
        content: &str,
        format: Option<ImportFormat>,
        options: ImportOptions,
    ) -> StoreResult<ImportReport> {
        self.ensure_ready()?;

        let candidates = import_export::parse_import(content, format)?;
        let total = candidates.len();
        let mut report = ImportReport::default();

        for mut action in candidates {
            if options.generate_new_ids {
                action.id = Uuid::new_v4().to_string();
            } else if self.index.contains(&action.id) && !options.overwrite_existing {
                log::debug!("Skipping '{}': id already exists.", action.id);
                report.skipped += 1;
                continue;
            }

            let validation = validator::validate_action(&action);
            if !validation.is_valid() {
                if options.skip_invalid {
                    report.skipped += 1;
                    continue;
                }
                return Err(StoreError::Validation {
                    issues: validation.issues,
                });
            }

            match self.save_action(action) {
                Ok(_) => report.imported += 1,
                Err(e) => {
                    report.failed += 1;
                    report.errors.push(e.to_string());
                }
            }
        }

        log::info!(
            "Import finished: {}/{} imported, {} skipped, {} failed.",
            report.imported,
            total,
            report.skipped,
            report.failed
        );
        Ok(report)
    }

    // --- BACKUP / RESTORE ---

    /// Snapshots every action and every domain config into one timestamped
    /// JSON document under `backups/`.
    pub fn create_backup(&mut self) -> StoreResult<BackupMetadata> {
        let actions = self.get_all_actions()?;
        let configs = domain_manager::all_configs(&self.files)?;
        let envelope = backup::build_backup(actions, configs);
        backup::write_backup(&self.files, &envelope)?;
        Ok(envelope.metadata)
    }

    pub fn list_backups(&self) -> StoreResult<Vec<BackupMetadata>> {
        self.ensure_ready()?;
        Ok(backup::list_backups(&self.files)?)
    }

    pub fn restore_backup_id(
        &mut self,
        backup_id: &str,
        options: RestoreOptions,
    ) -> StoreResult<RestoreReport> {
        self.ensure_ready()?;
        let envelope = backup::load_backup(&self.files, backup_id)?;
        self.restore(envelope, options)
    }

    /// Restores a snapshot. Additive by default: existing data stays unless
    /// `clear_existing` is set. Per-item failures are collected into the
    /// report instead of aborting the run.
    pub fn restore(
        &mut self,
        envelope: BackupEnvelope,
        options: RestoreOptions,
    ) -> StoreResult<RestoreReport> {
        self.ensure_ready()?;
        let mut report = RestoreReport::default();

        if options.clear_existing {
            self.clear_all()?;
        }

        for action in envelope.actions {
            if !options.clear_existing
                && self.index.contains(&action.id)
                && !options.overwrite_existing
            {
                report.actions_skipped += 1;
                continue;
            }
            match self.save_action(action) {
                Ok(_) => report.actions_restored += 1,
                Err(e) => {
                    report.actions_failed += 1;
                    report.errors.push(e.to_string());
                }
            }
        }

        for (domain, config) in envelope.domain_configs {
            match domain_manager::save_config(&self.files, &config) {
                Ok(()) => report.domains_restored += 1,
                Err(e) => {
                    report.domains_failed += 1;
                    report.errors.push(format!("domain '{}': {}", domain, e));
                }
            }
        }

        log::info!(
            "Restore finished: {} actions restored, {} skipped, {} failed; {} domains restored.",
            report.actions_restored,
            report.actions_skipped,
            report.actions_failed,
            report.domains_restored
        );
        Ok(report)
    }

    /// Removes every action file, every domain config, and the index.
    fn clear_all(&mut self) -> StoreResult<()> {
        log::warn!("Clearing all store contents before restore.");
        for rel in self.files.list_action_files()? {
            if let Err(e) = self.files.delete(&rel) {
                log::warn!("Could not delete '{}': {}", rel, e);
            }
        }
        for domain in domain_manager::list_domains(&self.files)? {
            domain_manager::delete_domain(&self.files, &domain)?;
        }
        self.index.load(None);
        self.persist_index()?;
        Ok(())
    }

    // --- RECONCILIATION ---

    /// The eager consistency pass: prunes index entries whose file is gone,
    /// refreshes projections (including advisory usage counters) from the
    /// authoritative files, adopts orphan action files, and reports files
    /// that no longer parse. The same repairs the read paths perform lazily,
    /// in one sweep.
    pub fn verify(&mut self) -> StoreResult<VerifyReport> {
        self.ensure_ready()?;
        let mut report = VerifyReport {
            entries_checked: self.index.len(),
            ..VerifyReport::default()
        };
        let mut changed = false;

        // --- 1. Index entries vs files ---
        let targets = Self::entry_targets(self.index.all_entries());
        for (id, rel) in targets {
            match self.files.read_json::<StoredAction>(&rel) {
                Ok(Some(action)) => {
                    let fresh = ActionIndexEntry::project(&action, rel);
                    let stale = self.index.entry(&id).is_some_and(|e| *e != fresh);
                    if stale {
                        if self
                            .index
                            .entry(&id)
                            .is_some_and(|e| e.usage_count != fresh.usage_count)
                        {
                            report.usage_resynced += 1;
                        }
                        self.index.add_entry(fresh);
                        changed = true;
                    }
                }
                Ok(None) => {
                    self.index.remove_action(&id);
                    report.dangling_removed.push(id);
                    changed = true;
                }
                Err(e) => {
                    if let Ok(data) =
                        integrity::file_validation_data(&self.files.root().join(&rel))
                    {
                        log::error!(
                            "Action file '{}' is unreadable ({}); size={}, hash={}.",
                            rel,
                            e,
                            data.file_size,
                            data.content_hash
                        );
                    } else {
                        log::error!("Action file '{}' is unreadable: {}", rel, e);
                    }
                    report.unreadable.push(rel);
                }
            }
        }

        // --- 2. Orphan files on disk ---
        let known: HashSet<String> = self
            .index
            .all_entries()
            .into_iter()
            .map(|e| e.file_path.clone())
            .collect();
        for rel in self.files.list_action_files()? {
            if known.contains(&rel) || report.unreadable.contains(&rel) {
                continue;
            }
            match self.files.read_json::<StoredAction>(&rel) {
                Ok(Some(action)) => {
                    if self.index.contains(&action.id) {
                        log::warn!(
                            "Stray file '{}' duplicates indexed action '{}'; leaving it alone.",
                            rel,
                            action.id
                        );
                        continue;
                    }
                    log::info!("Adopting orphan action file '{}'.", rel);
                    report.orphans_adopted.push(action.id.clone());
                    self.index.add_action(&action, rel);
                    changed = true;
                }
                Ok(None) => {}
                Err(e) => {
                    log::error!("Orphan file '{}' is unreadable: {}", rel, e);
                    report.unreadable.push(rel);
                }
            }
        }

        if changed {
            self.persist_index()?;
        }
        Ok(report)
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validator::{create_default_action, sanitize_action};
    use crate::models::{ActionOverrides, ActionScope};
    use tempfile::TempDir;

    fn ready_store() -> (TempDir, ActionsStore) {
        let dir = TempDir::new().unwrap();
        let mut store = ActionsStore::new(dir.path(), StoreSettings::default());
        store.initialize().unwrap();
        (dir, store)
    }

    fn action(name: &str, scope: ActionScope) -> StoredAction {
        create_default_action(ActionOverrides {
            name: Some(name.to_string()),
            scope: Some(scope),
            ..Default::default()
        })
    }

    #[test]
    fn test_operations_require_initialize() {
        let dir = TempDir::new().unwrap();
        let mut store = ActionsStore::new(dir.path(), StoreSettings::default());

        let result = store.save_action(action("x", ActionScope::global(0)));
        assert!(matches!(result, Err(StoreError::NotInitialized)));
        assert!(!store.is_initialized());
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (_dir, mut store) = ready_store();
        store
            .save_action(action("x", ActionScope::global(0)))
            .unwrap();

        store.initialize().unwrap();
        assert_eq!(store.get_all_actions().unwrap().len(), 1);
    }

    #[test]
    fn test_save_then_get_round_trip() {
        let (_dir, mut store) = ready_store();
        let input = action("Click button", ActionScope::domain("Example.com", 5));
        let sanitized = sanitize_action(input.clone());

        let id = store.save_action(input).unwrap();
        let fetched = store.get_action(&id).unwrap().unwrap();

        assert_eq!(fetched, sanitized);
    }

    #[test]
    fn test_save_rejects_invalid_action() {
        let (_dir, mut store) = ready_store();
        let mut bad = action("", ActionScope::global(0));
        bad.name = String::new();

        let result = store.save_action(bad);
        assert!(matches!(result, Err(StoreError::Validation { .. })));
        assert!(store.get_all_actions().unwrap().is_empty());
    }

    #[test]
    fn test_update_keeps_id_and_refreshes_updated_at() {
        let (_dir, mut store) = ready_store();
        let id = store
            .save_action(action("Old name", ActionScope::global(0)))
            .unwrap();
        let before = store.get_action(&id).unwrap().unwrap();

        let updated = store
            .update_action(
                &id,
                ActionChanges {
                    name: Some("New name".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.id, id);
        assert_eq!(updated.name, "New name");
        assert_eq!(updated.metadata.created_at, before.metadata.created_at);
        assert!(updated.metadata.updated_at >= before.metadata.updated_at);
    }

    #[test]
    fn test_delete_then_not_found() {
        let (_dir, mut store) = ready_store();
        let id = store
            .save_action(action("Click button", ActionScope::global(5)))
            .unwrap();

        // Example scenario: a global action resolves for any URL...
        let resolved = store.get_actions_for_url("https://any.site/page").unwrap();
        assert!(resolved.iter().any(|r| r.action.id == id));

        // ...and stops resolving once deleted.
        store.delete_action(&id).unwrap();
        assert!(store.get_action(&id).unwrap().is_none());
        assert!(store.get_actions_for_url("https://any.site/page").unwrap().is_empty());
        assert!(matches!(
            store.delete_action(&id),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_missing_file_self_heals_on_read() {
        let (dir, mut store) = ready_store();
        let id = store
            .save_action(action("a", ActionScope::global(0)))
            .unwrap();

        // Remove the file behind the store's back.
        let rel = format!("actions/global/{}.json", id);
        std::fs::remove_file(dir.path().join(&rel)).unwrap();

        assert!(store.get_action(&id).unwrap().is_none());
        // The entry is gone for good, not resurrected on the next pass.
        assert!(store.get_all_actions().unwrap().is_empty());
        assert_eq!(store.statistics().unwrap().total_actions, 0);
    }

    #[test]
    fn test_get_all_converges_after_manual_deletes() {
        let (dir, mut store) = ready_store();
        store.save_action(action("a", ActionScope::global(0))).unwrap();
        let b = store.save_action(action("b", ActionScope::global(0))).unwrap();

        std::fs::remove_file(dir.path().join(format!("actions/global/{}.json", b))).unwrap();

        assert_eq!(store.get_all_actions().unwrap().len(), 1);
        // After one pass the index matches the surviving files exactly.
        assert_eq!(store.statistics().unwrap().total_actions, 1);
    }

    #[test]
    fn test_record_usage_updates_file_and_index() {
        let (_dir, mut store) = ready_store();
        let id = store
            .save_action(action("a", ActionScope::global(0)))
            .unwrap();

        store.record_usage(&id).unwrap();
        store.record_usage(&id).unwrap();

        let fetched = store.get_action(&id).unwrap().unwrap();
        assert_eq!(fetched.metadata.usage_count, 2);
        assert!(fetched.metadata.last_used.is_some());
        assert_eq!(store.statistics().unwrap().total_usage, 2);
    }

    #[test]
    fn test_record_usage_unknown_id() {
        let (_dir, mut store) = ready_store();
        assert!(matches!(
            store.record_usage("ghost"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_resolver_integration_ordering() {
        let (_dir, mut store) = ready_store();
        let global = store.save_action(action("g", ActionScope::global(10))).unwrap();
        let domain = store
            .save_action(action("d", ActionScope::domain("example.com", 20)))
            .unwrap();
        let pattern = store
            .save_action(action(
                "p",
                ActionScope::pattern("example.com", "*/blog/*", 30),
            ))
            .unwrap();

        let resolved = store
            .get_actions_for_url("https://example.com/blog/post1")
            .unwrap();
        let ids: Vec<&str> = resolved.iter().map(|r| r.action.id.as_str()).collect();
        assert_eq!(ids, vec![pattern.as_str(), domain.as_str(), global.as_str()]);
    }

    #[test]
    fn test_import_skips_invalid_records() {
        let (_dir, mut store) = ready_store();
        let valid = sanitize_action(action("ok", ActionScope::global(0)));
        let mut invalid = sanitize_action(action("bad", ActionScope::global(0)));
        invalid.name = String::new();
        let payload = serde_json::to_string(&vec![valid, invalid]).unwrap();

        let report = store
            .import(&payload, None, ImportOptions::default())
            .unwrap();

        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_import_fail_on_invalid_aborts() {
        let (_dir, mut store) = ready_store();
        let mut invalid = sanitize_action(action("bad", ActionScope::global(0)));
        invalid.name = String::new();
        let payload = serde_json::to_string(&vec![invalid]).unwrap();

        let result = store.import(
            &payload,
            None,
            ImportOptions {
                skip_invalid: false,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(StoreError::Validation { .. })));
    }

    #[test]
    fn test_import_duplicate_policy() {
        let (_dir, mut store) = ready_store();
        let id = store
            .save_action(action("original", ActionScope::global(0)))
            .unwrap();
        let mut replacement = sanitize_action(action("replacement", ActionScope::global(0)));
        replacement.id = id.clone();
        let payload = serde_json::to_string(&vec![replacement]).unwrap();

        // Default: duplicates skipped.
        let report = store.import(&payload, None, ImportOptions::default()).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(store.get_action(&id).unwrap().unwrap().name, "original");

        // With overwrite: replaced.
        let report = store
            .import(
                &payload,
                None,
                ImportOptions {
                    overwrite_existing: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(store.get_action(&id).unwrap().unwrap().name, "replacement");

        // With generated ids: a second copy appears under a fresh id.
        let report = store
            .import(
                &payload,
                None,
                ImportOptions {
                    generate_new_ids: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(store.get_all_actions().unwrap().len(), 3);
    }

    #[test]
    fn test_csv_store_round_trip() {
        let (_dir, mut store) = ready_store();
        let mut a = action("Add to cart", ActionScope::global(0));
        a.tags = vec!["Shopping".to_string(), "cart, deals".to_string()];
        store.save_action(a).unwrap();
        store.save_action(action("Scroll", ActionScope::global(0))).unwrap();
        let csv = store.export_csv().unwrap();

        let (_dir2, mut other) = ready_store();
        let report = other.import(&csv, None, ImportOptions::default()).unwrap();

        assert_eq!(report.imported, 2);
        let original = store.get_all_actions().unwrap();
        let imported = other.get_all_actions().unwrap();
        for (a, b) in original.iter().zip(&imported) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.category, b.category);
            assert_eq!(a.tags, b.tags);
            assert_eq!(a.metadata.usage_count, b.metadata.usage_count);
        }
    }

    #[test]
    fn test_backup_restore_additive_and_clearing() {
        let (_dir, mut store) = ready_store();
        store
            .save_action(action("kept", ActionScope::domain("example.com", 0)))
            .unwrap();
        let meta = store.create_backup().unwrap();
        assert_eq!(meta.total_actions, 1);
        assert_eq!(meta.total_domains, 1);

        // Additive restore into a store that already has other data.
        store.save_action(action("extra", ActionScope::global(0))).unwrap();
        let report = store
            .restore_backup_id(&meta.backup_id, RestoreOptions::default())
            .unwrap();
        assert_eq!(report.actions_skipped, 1); // "kept" already present
        assert_eq!(store.get_all_actions().unwrap().len(), 2);

        // Clearing restore drops everything not in the snapshot.
        let report = store
            .restore_backup_id(
                &meta.backup_id,
                RestoreOptions {
                    clear_existing: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(report.actions_restored, 1);
        let remaining = store.get_all_actions().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "kept");
        assert_eq!(store.list_domains().unwrap(), vec!["example.com".to_string()]);
    }

    #[test]
    fn test_verify_adopts_orphans_and_prunes_dangling() {
        let (dir, mut store) = ready_store();
        let kept = store.save_action(action("kept", ActionScope::global(0))).unwrap();
        let doomed = store.save_action(action("doomed", ActionScope::global(0))).unwrap();

        // Create an orphan by hand and a dangling entry by deleting a file.
        let orphan = sanitize_action(action("orphan", ActionScope::global(0)));
        let orphan_id = orphan.id.clone();
        std::fs::write(
            dir.path().join(format!("actions/global/{}.json", orphan_id)),
            serde_json::to_string(&orphan).unwrap(),
        )
        .unwrap();
        std::fs::remove_file(dir.path().join(format!("actions/global/{}.json", doomed))).unwrap();

        let report = store.verify().unwrap();

        assert_eq!(report.dangling_removed, vec![doomed]);
        assert_eq!(report.orphans_adopted, vec![orphan_id.clone()]);
        assert!(report.unreadable.is_empty());

        let ids: Vec<String> = store
            .get_all_actions()
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert!(ids.contains(&kept));
        assert!(ids.contains(&orphan_id));

        // A second pass finds nothing to do.
        assert!(store.verify().unwrap().is_clean());
    }

    #[test]
    fn test_corrupt_index_fail_open_by_default() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.json"), "{ definitely not json").unwrap();

        let mut store = ActionsStore::new(dir.path(), StoreSettings::default());
        store.initialize().unwrap();
        assert!(store.get_all_actions().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_index_strict_load_errors() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.json"), "{ definitely not json").unwrap();

        let mut store = ActionsStore::new(
            dir.path(),
            StoreSettings {
                strict_load: true,
                ..Default::default()
            },
        );
        let result = store.initialize();
        assert!(matches!(result, Err(StoreError::CorruptIndex(_))));
        assert!(!store.is_initialized());
    }

    #[test]
    fn test_rescoping_moves_the_file() {
        let (dir, mut store) = ready_store();
        let id = store
            .save_action(action("movable", ActionScope::global(0)))
            .unwrap();
        assert!(dir.path().join(format!("actions/global/{}.json", id)).exists());

        store
            .update_action(
                &id,
                ActionChanges {
                    scope: Some(ActionScope::domain("example.com", 1)),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(!dir.path().join(format!("actions/global/{}.json", id)).exists());
        assert!(
            dir.path()
                .join(format!("actions/domains/example.com/{}.json", id))
                .exists()
        );
        // No leftovers for verify to complain about.
        assert!(store.verify().unwrap().is_clean());
    }
}
