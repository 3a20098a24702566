// src/constants.rs

/// The name of the directory containing per-action JSON documents.
pub const ACTIONS_DIR: &str = "actions";

/// Subdirectory of `actions/` holding global-scope actions.
pub const GLOBAL_ACTIONS_DIR: &str = "global";

/// Subdirectory of `actions/` grouping domain-scoped actions by domain.
pub const DOMAIN_ACTIONS_DIR: &str = "domains";

/// The name of the directory containing per-domain configuration documents.
pub const DOMAIN_CONFIGS_DIR: &str = "domains";

/// The name of the persisted action index (in the storage root).
pub const ACTION_INDEX_FILENAME: &str = "index.json";

/// The name of the directory containing backup snapshots.
pub const BACKUPS_DIR: &str = "backups";

/// The name of the user settings file (in `~/.config/webact/`).
pub const SETTINGS_FILENAME: &str = "webact.toml";

/// Schema version stamped into the persisted index.
pub const INDEX_SCHEMA_VERSION: u32 = 1;

/// Schema version stamped into persisted domain configurations.
pub const DOMAIN_CONFIG_VERSION: u32 = 1;

/// Version stamped into export envelopes.
pub const EXPORT_VERSION: u32 = 1;

/// Version stamped into backup snapshots.
pub const BACKUP_VERSION: u32 = 1;
