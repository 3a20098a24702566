// src/core/index_manager.rs

use crate::models::{
    ActionCategory, ActionIndex, ActionIndexEntry, IndexStatistics, ScopeKind, StoredAction,
    UsageStat,
};
use std::collections::{HashMap, HashSet};

/// In-memory index over all stored actions: a primary map keyed by action id
/// plus derived secondary indexes (by domain, by scope kind, by category)
/// that are kept consistent with the primary map on every mutation.
///
/// The manager is the exclusive owner of the index. It is injected into the
/// store rather than living behind a global, and none of its operations
/// fail: policy decisions about corrupt persisted data belong to the loader,
/// not here.
#[derive(Debug, Default)]
pub struct ActionIndexManager {
    actions: HashMap<String, ActionIndexEntry>,
    by_domain: HashMap<String, HashSet<String>>,
    by_scope: HashMap<ScopeKind, HashSet<String>>,
    by_category: HashMap<ActionCategory, HashSet<String>>,
}

impl ActionIndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole in-memory state from a persisted index. `None`
    /// initializes an empty index (a fresh store, or a fail-open recovery).
    /// Secondary indexes are always rebuilt from the primary map, never
    /// trusted from disk.
    pub fn load(&mut self, raw: Option<ActionIndex>) {
        self.actions.clear();
        self.by_domain.clear();
        self.by_scope.clear();
        self.by_category.clear();

        let Some(index) = raw else {
            log::debug!("Initializing empty action index.");
            return;
        };

        log::debug!(
            "Loading action index v{} with {} entries.",
            index.version,
            index.actions.len()
        );
        for (_, entry) in index.actions {
            self.add_entry(entry);
        }
    }

    /// Serializes the current state into the persisted form.
    pub fn snapshot(&self) -> ActionIndex {
        ActionIndex {
            actions: self.actions.clone(),
            ..ActionIndex::default()
        }
    }

    /// Upserts the index projection of an action. If an entry for the id
    /// already existed, its stale secondary-index memberships are removed
    /// first, so a re-scoped action never leaves ghosts behind.
    pub fn add_action(&mut self, action: &StoredAction, file_path: String) {
        self.add_entry(ActionIndexEntry::project(action, file_path));
    }

    /// Upserts a pre-built entry (used by `load` and reconciliation).
    pub fn add_entry(&mut self, entry: ActionIndexEntry) {
        self.unlink_secondary(&entry.id);

        if let Some(domain) = &entry.domain {
            self.by_domain
                .entry(domain.clone())
                .or_default()
                .insert(entry.id.clone());
        }
        self.by_scope
            .entry(entry.scope_kind)
            .or_default()
            .insert(entry.id.clone());
        self.by_category
            .entry(entry.category)
            .or_default()
            .insert(entry.id.clone());

        self.actions.insert(entry.id.clone(), entry);
    }

    /// Removes an action from the primary map and every secondary index.
    /// Returns `false` (a no-op, not an error) if the id was absent.
    pub fn remove_action(&mut self, id: &str) -> bool {
        self.unlink_secondary(id);
        self.actions.remove(id).is_some()
    }

    /// Drops `id` from all secondary indexes, pruning emptied buckets.
    fn unlink_secondary(&mut self, id: &str) {
        let Some(existing) = self.actions.get(id) else {
            return;
        };
        if let Some(domain) = &existing.domain {
            if let Some(bucket) = self.by_domain.get_mut(domain) {
                bucket.remove(id);
                if bucket.is_empty() {
                    self.by_domain.remove(domain);
                }
            }
        }
        if let Some(bucket) = self.by_scope.get_mut(&existing.scope_kind) {
            bucket.remove(id);
        }
        if let Some(bucket) = self.by_category.get_mut(&existing.category) {
            bucket.remove(id);
        }
    }

    pub fn entry(&self, id: &str) -> Option<&ActionIndexEntry> {
        self.actions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.actions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// All entries, sorted by name for deterministic listings.
    pub fn all_entries(&self) -> Vec<&ActionIndexEntry> {
        let mut entries: Vec<_> = self.actions.values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        entries
    }

    pub fn entries_for_domain(&self, domain: &str) -> Vec<&ActionIndexEntry> {
        self.collect_bucket(self.by_domain.get(domain))
    }

    pub fn entries_for_scope(&self, kind: ScopeKind) -> Vec<&ActionIndexEntry> {
        self.collect_bucket(self.by_scope.get(&kind))
    }

    pub fn entries_for_category(&self, category: ActionCategory) -> Vec<&ActionIndexEntry> {
        self.collect_bucket(self.by_category.get(&category))
    }

    fn collect_bucket(&self, bucket: Option<&HashSet<String>>) -> Vec<&ActionIndexEntry> {
        let mut entries: Vec<_> = bucket
            .map(|ids| ids.iter().filter_map(|id| self.actions.get(id)).collect())
            .unwrap_or_default();
        entries.sort_by(|a: &&ActionIndexEntry, b: &&ActionIndexEntry| {
            a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id))
        });
        entries
    }

    /// Bumps the advisory usage counter on an entry. Silently a no-op for an
    /// unknown id: the authoritative counter lives in the action file, and
    /// this copy only exists so listings don't have to open every file.
    pub fn increment_usage(&mut self, id: &str) {
        if let Some(entry) = self.actions.get_mut(id) {
            entry.usage_count += 1;
        }
    }

    /// Overwrites the advisory usage counter, used when reconciling the
    /// index against the authoritative files. Returns `true` if the stored
    /// value actually changed.
    pub fn sync_usage(&mut self, id: &str, authoritative: u64) -> bool {
        match self.actions.get_mut(id) {
            Some(entry) if entry.usage_count != authoritative => {
                entry.usage_count = authoritative;
                true
            }
            _ => false,
        }
    }

    /// Aggregates counts by scope/category/author plus usage totals and the
    /// top-`top_n` most-used actions.
    pub fn statistics(&self, top_n: usize) -> IndexStatistics {
        let mut stats = IndexStatistics {
            total_actions: self.actions.len(),
            ..IndexStatistics::default()
        };

        for entry in self.actions.values() {
            *stats
                .actions_by_scope
                .entry(entry.scope_kind.as_str().to_string())
                .or_default() += 1;
            *stats
                .actions_by_category
                .entry(entry.category.as_str().to_string())
                .or_default() += 1;
            *stats
                .actions_by_author
                .entry(entry.author.as_str().to_string())
                .or_default() += 1;
            stats.total_usage += entry.usage_count;
        }

        if !self.actions.is_empty() {
            stats.average_usage = stats.total_usage as f64 / self.actions.len() as f64;
        }

        let mut ranked: Vec<_> = self.actions.values().collect();
        ranked.sort_by(|a, b| {
            b.usage_count
                .cmp(&a.usage_count)
                .then_with(|| a.name.cmp(&b.name))
        });
        stats.most_used = ranked
            .into_iter()
            .take(top_n)
            .map(|e| UsageStat {
                id: e.id.clone(),
                name: e.name.clone(),
                usage_count: e.usage_count,
            })
            .collect();

        stats
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validator::{create_default_action, sanitize_action};
    use crate::models::{ActionOverrides, ActionScope};

    fn scoped_action(name: &str, scope: ActionScope) -> StoredAction {
        sanitize_action(create_default_action(ActionOverrides {
            name: Some(name.to_string()),
            scope: Some(scope),
            ..Default::default()
        }))
    }

    #[test]
    fn test_upsert_removes_stale_secondary_memberships() {
        let mut index = ActionIndexManager::new();
        let mut action = scoped_action("fill login", ActionScope::domain("a.example.com", 0));
        index.add_action(&action, "actions/domains/a.example.com/x.json".to_string());
        assert_eq!(index.entries_for_domain("a.example.com").len(), 1);

        // Re-scope the same id to another domain: the old bucket must empty.
        action.scope = ActionScope::domain("b.example.com", 0);
        index.add_action(&action, "actions/domains/b.example.com/x.json".to_string());

        assert_eq!(index.len(), 1);
        assert!(index.entries_for_domain("a.example.com").is_empty());
        assert_eq!(index.entries_for_domain("b.example.com").len(), 1);
    }

    #[test]
    fn test_remove_is_noop_when_absent() {
        let mut index = ActionIndexManager::new();
        assert!(!index.remove_action("ghost"));
    }

    #[test]
    fn test_remove_cleans_all_secondaries() {
        let mut index = ActionIndexManager::new();
        let action = scoped_action("go home", ActionScope::domain("example.com", 0));
        index.add_action(&action, "p".to_string());

        assert!(index.remove_action(&action.id));
        assert!(index.entries_for_domain("example.com").is_empty());
        assert!(index.entries_for_scope(ScopeKind::Domain).is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_load_none_initializes_empty() {
        let mut index = ActionIndexManager::new();
        index.add_action(&scoped_action("x", ActionScope::global(0)), "p".to_string());
        index.load(None);
        assert!(index.is_empty());
    }

    #[test]
    fn test_snapshot_load_round_trip() {
        let mut index = ActionIndexManager::new();
        index.add_action(
            &scoped_action("a", ActionScope::domain("example.com", 1)),
            "p1".to_string(),
        );
        index.add_action(&scoped_action("b", ActionScope::global(2)), "p2".to_string());

        let snapshot = index.snapshot();
        let mut reloaded = ActionIndexManager::new();
        reloaded.load(Some(snapshot));

        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.entries_for_domain("example.com").len(), 1);
        assert_eq!(reloaded.entries_for_scope(ScopeKind::Global).len(), 1);
    }

    #[test]
    fn test_increment_usage_unknown_id_is_noop() {
        let mut index = ActionIndexManager::new();
        index.increment_usage("ghost");
        assert!(index.is_empty());
    }

    #[test]
    fn test_statistics_aggregation() {
        let mut index = ActionIndexManager::new();
        let a = scoped_action("a", ActionScope::global(0));
        let b = scoped_action("b", ActionScope::domain("example.com", 0));
        index.add_action(&a, "p1".to_string());
        index.add_action(&b, "p2".to_string());
        index.increment_usage(&a.id);
        index.increment_usage(&a.id);
        index.increment_usage(&b.id);

        let stats = index.statistics(1);
        assert_eq!(stats.total_actions, 2);
        assert_eq!(stats.actions_by_scope.get("global"), Some(&1));
        assert_eq!(stats.actions_by_scope.get("domain"), Some(&1));
        assert_eq!(stats.total_usage, 3);
        assert!((stats.average_usage - 1.5).abs() < f64::EPSILON);
        assert_eq!(stats.most_used.len(), 1);
        assert_eq!(stats.most_used[0].usage_count, 2);
    }
}
