// src/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants::{DOMAIN_CONFIG_VERSION, INDEX_SCHEMA_VERSION};

// --- ACTION MODELS (What is persisted, one JSON document per action) ---

/// The scope an action applies to. Ordering of relevance during URL
/// resolution is `Page > Pattern > Domain > Global`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Global,
    Domain,
    Pattern,
    Page,
}

impl ScopeKind {
    /// Relative specificity used as the resolver's second-level tie-break.
    pub fn specificity(self) -> u8 {
        match self {
            Self::Page => 3,
            Self::Pattern => 2,
            Self::Domain => 1,
            Self::Global => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Domain => "domain",
            Self::Pattern => "pattern",
            Self::Page => "page",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "global" => Some(Self::Global),
            "domain" => Some(Self::Domain),
            "pattern" => Some(Self::Pattern),
            "page" => Some(Self::Page),
            _ => None,
        }
    }
}

/// Category tag for an action.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActionCategory {
    Navigation,
    Form,
    Extraction,
    #[default]
    Custom,
}

impl ActionCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Form => "form",
            Self::Extraction => "extraction",
            Self::Custom => "custom",
        }
    }

    /// Lenient parser for import paths. Unknown categories fold into `Custom`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "navigation" => Self::Navigation,
            "form" => Self::Form,
            "extraction" => Self::Extraction,
            _ => Self::Custom,
        }
    }
}

/// Who authored an action: a person recording it, or the discovery pipeline.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActionAuthor {
    #[default]
    User,
    Discovered,
}

impl ActionAuthor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Discovered => "discovered",
        }
    }

    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "discovered" => Self::Discovered,
            _ => Self::User,
        }
    }
}

/// Where and with what precedence an action applies.
///
/// Invariants (enforced by the validator, not the type):
/// - `domain` is present iff `kind != Global`.
/// - `url_pattern` is present iff `kind == Pattern`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionScope {
    pub kind: ScopeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
    #[serde(default)]
    pub priority: i32,
}

impl ActionScope {
    pub fn global(priority: i32) -> Self {
        Self {
            kind: ScopeKind::Global,
            domain: None,
            url_pattern: None,
            priority,
        }
    }

    pub fn domain(domain: impl Into<String>, priority: i32) -> Self {
        Self {
            kind: ScopeKind::Domain,
            domain: Some(domain.into()),
            url_pattern: None,
            priority,
        }
    }

    pub fn pattern(domain: impl Into<String>, pattern: impl Into<String>, priority: i32) -> Self {
        Self {
            kind: ScopeKind::Pattern,
            domain: Some(domain.into()),
            url_pattern: Some(pattern.into()),
            priority,
        }
    }
}

/// Book-keeping stamped on every action. `usage_count` here is the
/// authoritative counter; the copy in the index entry is advisory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionMetadata {
    pub usage_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

impl ActionMetadata {
    pub fn now() -> Self {
        let ts = Utc::now();
        Self {
            usage_count: 0,
            created_at: ts,
            updated_at: ts,
            last_used: None,
        }
    }
}

/// A single step of a recorded automation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ActionStep {
    Click {
        selector: String,
    },
    Input {
        selector: String,
        value: String,
    },
    Navigate {
        url: String,
    },
    Wait {
        millis: u64,
    },
    /// Escape hatch for step kinds this version does not model.
    Custom {
        payload: serde_json::Value,
    },
}

/// A user-facing automation definition. The unit the whole store revolves
/// around: validated on the way in, persisted as one JSON document, and
/// projected into the index.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredAction {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: ActionCategory,
    #[serde(default)]
    pub author: ActionAuthor,
    pub scope: ActionScope,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub steps: Vec<ActionStep>,
    pub metadata: ActionMetadata,
}

/// Optional field overrides for `create_default_action`. Applied last, so
/// anything left as `None` keeps its generated default.
#[derive(Debug, Clone, Default)]
pub struct ActionOverrides {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ActionCategory>,
    pub author: Option<ActionAuthor>,
    pub scope: Option<ActionScope>,
    pub tags: Option<Vec<String>>,
    pub steps: Option<Vec<ActionStep>>,
}

/// Caller-supplied partial update for `update_action`. The id is absent on
/// purpose: it is immutable after creation.
#[derive(Debug, Clone, Default)]
pub struct ActionChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ActionCategory>,
    pub scope: Option<ActionScope>,
    pub tags: Option<Vec<String>>,
    pub steps: Option<Vec<ActionStep>>,
}

// --- INDEX MODELS (The single persisted index blob) ---

/// Index-only projection of an action: enough to answer domain/scope/category
/// lookups and render listings without touching the action file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionIndexEntry {
    pub id: String,
    pub name: String,
    pub file_path: String,
    pub scope_kind: ScopeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
    pub category: ActionCategory,
    pub author: ActionAuthor,
    pub priority: i32,
    pub usage_count: u64,
    pub updated_at: DateTime<Utc>,
}

impl ActionIndexEntry {
    /// Rebuilds the projection from the authoritative action document.
    pub fn project(action: &StoredAction, file_path: String) -> Self {
        Self {
            id: action.id.clone(),
            name: action.name.clone(),
            file_path,
            scope_kind: action.scope.kind,
            domain: action.scope.domain.clone(),
            url_pattern: action.scope.url_pattern.clone(),
            category: action.category,
            author: action.author,
            priority: action.scope.priority,
            usage_count: action.metadata.usage_count,
            updated_at: action.metadata.updated_at,
        }
    }
}

fn default_index_version() -> u32 {
    INDEX_SCHEMA_VERSION
}

/// The persisted form of the whole index: a single JSON document,
/// last-writer-wins, rebuilt entry-by-entry on every save.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ActionIndex {
    #[serde(default = "default_index_version")]
    pub version: u32,
    #[serde(default)]
    pub actions: HashMap<String, ActionIndexEntry>,
}

impl Default for ActionIndex {
    fn default() -> Self {
        Self {
            version: INDEX_SCHEMA_VERSION,
            actions: HashMap::new(),
        }
    }
}

// --- DOMAIN CONFIGURATION MODELS ---

/// How a stored pattern string is interpreted by the resolver.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    /// `*` matches any run of characters (the common case).
    #[default]
    Glob,
    /// Literal prefix of `host + path`.
    Prefix,
    /// A full regular expression, anchored by the author.
    Regex,
}

/// A named, reusable URL pattern registered on a domain. Uniquely named per
/// domain; removal is keyed by name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UrlPatternDefinition {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub kind: PatternKind,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_domain_config_version() -> u32 {
    DOMAIN_CONFIG_VERSION
}

/// Per-domain configuration. Lives independently of actions: a domain config
/// with zero associated actions is valid.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DomainConfig {
    #[serde(default = "default_domain_config_version")]
    pub version: u32,
    pub domain: String,
    #[serde(default)]
    pub url_patterns: Vec<UrlPatternDefinition>,
}

impl DomainConfig {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            version: DOMAIN_CONFIG_VERSION,
            domain: domain.into(),
            url_patterns: Vec::new(),
        }
    }
}

// --- RESOLUTION MODELS ---

/// A stored action paired with the scope path it was reached through, so
/// callers can see *why* an action applies to a URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAction {
    pub action: StoredAction,
    pub matched: ScopeKind,
}

// --- VALIDATION MODELS ---

/// A single field-level validation failure.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The structured result of validating an action. Validation never fails as
/// an operation; it reports.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

// --- STATISTICS MODELS ---

/// One row of the "most used" leaderboard.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UsageStat {
    pub id: String,
    pub name: String,
    pub usage_count: u64,
}

/// Aggregates derived entirely from the in-memory index.
#[derive(Serialize, Debug, Clone, Default)]
pub struct IndexStatistics {
    pub total_actions: usize,
    pub actions_by_scope: HashMap<String, usize>,
    pub actions_by_category: HashMap<String, usize>,
    pub actions_by_author: HashMap<String, usize>,
    pub total_usage: u64,
    pub average_usage: f64,
    pub most_used: Vec<UsageStat>,
}

// --- EXPORT / IMPORT MODELS ---

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub export_version: u32,
    pub export_timestamp: DateTime<Utc>,
    pub total_actions: usize,
    pub exported_by: String,
}

/// The JSON export wire format.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    pub metadata: ExportMetadata,
    pub actions: Vec<StoredAction>,
}

/// Conflict and validation policy for an import run.
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    /// Skip records that fail validation instead of aborting the run.
    pub skip_invalid: bool,
    /// Replace actions whose id already exists in the store.
    pub overwrite_existing: bool,
    /// Assign fresh ids to every imported record (wins over overwrite).
    pub generate_new_ids: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            skip_invalid: true,
            overwrite_existing: false,
            generate_new_ids: false,
        }
    }
}

/// Per-record accounting for a bulk import. The run counts as successful if
/// at least one record landed, even amid partial failure.
#[derive(Serialize, Debug, Clone, Default)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

// --- BACKUP MODELS ---

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    pub backup_id: String,
    pub timestamp: DateTime<Utc>,
    pub version: u32,
    pub total_actions: usize,
    pub total_domains: usize,
}

/// A full snapshot of the store: every action plus every domain config.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BackupEnvelope {
    pub metadata: BackupMetadata,
    pub actions: Vec<StoredAction>,
    pub domain_configs: HashMap<String, DomainConfig>,
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreOptions {
    /// Wipe all current actions and domain configs before restoring.
    /// Restore is additive unless this is set.
    pub clear_existing: bool,
    /// Replace actions whose id already exists.
    pub overwrite_existing: bool,
}

/// Per-item accounting for a restore. Never all-or-nothing.
#[derive(Serialize, Debug, Clone, Default)]
pub struct RestoreReport {
    pub actions_restored: usize,
    pub actions_skipped: usize,
    pub actions_failed: usize,
    pub domains_restored: usize,
    pub domains_failed: usize,
    pub errors: Vec<String>,
}

// --- RECONCILIATION MODELS ---

/// What a `verify` pass found and repaired.
#[derive(Serialize, Debug, Clone, Default)]
pub struct VerifyReport {
    pub entries_checked: usize,
    /// Index entries whose file no longer exists; removed.
    pub dangling_removed: Vec<String>,
    /// Action files found on disk with no index entry; re-indexed.
    pub orphans_adopted: Vec<String>,
    /// Files that exist but no longer parse as actions.
    pub unreadable: Vec<String>,
    /// Entries whose advisory usage count drifted from the file and were resynced.
    pub usage_resynced: usize,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.dangling_removed.is_empty()
            && self.orphans_adopted.is_empty()
            && self.unreadable.is_empty()
            && self.usage_resynced == 0
    }
}

// --- SETTINGS MODELS (`~/.config/webact/webact.toml`) ---

fn default_top_actions_limit() -> usize {
    10
}

/// User-tunable store settings. Missing file means defaults; a malformed
/// file is a hard error, unlike the fail-open index.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct StoreSettings {
    /// Overrides the platform-default storage root. Supports `~` and
    /// environment variables.
    #[serde(default)]
    pub storage_dir: Option<String>,
    /// Treat a corrupt persisted index as a hard error instead of starting
    /// empty.
    #[serde(default)]
    pub strict_load: bool,
    /// How many rows the statistics leaderboard keeps.
    #[serde(default = "default_top_actions_limit")]
    pub top_actions_limit: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            storage_dir: None,
            strict_load: false,
            top_actions_limit: 10,
        }
    }
}
