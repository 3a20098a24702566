// src/core/settings.rs

use crate::constants::SETTINGS_FILENAME;
use crate::core::paths;
use crate::models::StoreSettings;
use std::fs;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Path error: {0}")]
    Path(#[from] paths::PathError),
    #[error("Failed to parse '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Loads the user settings from `~/.config/webact/webact.toml`.
///
/// A missing file yields the defaults. A file that exists but does not parse
/// is a hard error: settings are authored by hand, and silently falling back
/// to defaults would mask a typo (this is deliberately the opposite policy
/// from the fail-open index load).
pub fn load_settings() -> Result<StoreSettings, SettingsError> {
    let path = paths::get_settings_dir()?.join(SETTINGS_FILENAME);
    if !path.exists() {
        log::debug!("No settings file at '{}', using defaults.", path.display());
        return Ok(StoreSettings::default());
    }

    let raw = fs::read_to_string(&path)?;
    let settings: StoreSettings = toml::from_str(&raw).map_err(|e| SettingsError::Parse {
        path: path.display().to_string(),
        source: e,
    })?;

    log::debug!(
        "Loaded settings from '{}': strict_load={}, storage_dir={:?}",
        path.display(),
        settings.strict_load,
        settings.storage_dir
    );
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use crate::models::StoreSettings;

    #[test]
    fn test_settings_defaults() {
        let settings: StoreSettings = toml::from_str("").unwrap();
        assert!(!settings.strict_load);
        assert!(settings.storage_dir.is_none());
        assert_eq!(settings.top_actions_limit, 10);
    }

    #[test]
    fn test_settings_full_file() {
        let raw = r#"
            storage_dir = "~/actions"
            strict_load = true
            top_actions_limit = 25
        "#;
        let settings: StoreSettings = toml::from_str(raw).unwrap();
        assert!(settings.strict_load);
        assert_eq!(settings.storage_dir.as_deref(), Some("~/actions"));
        assert_eq!(settings.top_actions_limit, 25);
    }

    #[test]
    fn test_settings_reject_unknown_garbage() {
        let result = toml::from_str::<StoreSettings>("strict_load = \"yes\"");
        assert!(result.is_err());
    }
}
