// src/core/domain_manager.rs

use crate::constants::DOMAIN_CONFIGS_DIR;
use crate::core::file_manager::{FileManager, FileManagerError};
use crate::models::{DomainConfig, UrlPatternDefinition};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("File Error: {0}")]
    File(#[from] FileManagerError),
}

type DomainResult<T> = Result<T, DomainError>;

/// CRUD over per-domain configurations.
///
/// Each domain owns exactly one JSON document under `domains/`, so a failed
/// write to one domain can never corrupt a sibling's config. Domains are
/// normalized to lowercase on every entry point, matching the sanitizer.

/// Returns the existing config for `domain`, or creates, persists, and
/// returns a default empty one. Never fails for a fresh domain.
pub fn initialize_domain(files: &FileManager, domain: &str) -> DomainResult<DomainConfig> {
    let domain = normalize(domain);
    if let Some(config) = get_config(files, &domain)? {
        return Ok(config);
    }
    log::debug!("Creating default configuration for domain '{}'.", domain);
    let config = DomainConfig::new(domain.clone());
    save_config(files, &config)?;
    Ok(config)
}

/// Pure read. `Ok(None)` for an unconfigured domain.
pub fn get_config(files: &FileManager, domain: &str) -> DomainResult<Option<DomainConfig>> {
    let domain = normalize(domain);
    Ok(files.read_json(&FileManager::domain_config_path(&domain))?)
}

pub fn save_config(files: &FileManager, config: &DomainConfig) -> DomainResult<()> {
    files.write_json(&FileManager::domain_config_path(&config.domain), config)?;
    Ok(())
}

/// Removes a domain's configuration document. Returns `false` if there was
/// nothing to remove.
pub fn delete_domain(files: &FileManager, domain: &str) -> DomainResult<bool> {
    let domain = normalize(domain);
    Ok(files.delete(&FileManager::domain_config_path(&domain))?)
}

/// Lists every configured domain, sorted. The names come from the documents
/// themselves, not the (sanitized) file names.
pub fn list_domains(files: &FileManager) -> DomainResult<Vec<String>> {
    let mut domains = Vec::new();
    for key in files.list_json_files(DOMAIN_CONFIGS_DIR)? {
        match files.read_json::<DomainConfig>(&key) {
            Ok(Some(config)) => domains.push(config.domain),
            Ok(None) => {}
            Err(e) => {
                log::warn!("Skipping unreadable domain config '{}': {}", key, e);
            }
        }
    }
    domains.sort();
    Ok(domains)
}

/// Lists every domain configuration document.
pub fn all_configs(files: &FileManager) -> DomainResult<Vec<DomainConfig>> {
    let mut configs = Vec::new();
    for key in files.list_json_files(DOMAIN_CONFIGS_DIR)? {
        match files.read_json::<DomainConfig>(&key) {
            Ok(Some(config)) => configs.push(config),
            Ok(None) => {}
            Err(e) => {
                log::warn!("Skipping unreadable domain config '{}': {}", key, e);
            }
        }
    }
    configs.sort_by(|a, b| a.domain.cmp(&b.domain));
    Ok(configs)
}

/// Upserts a named pattern on a domain, creating the domain config if it
/// does not exist yet. Patterns are keyed by name within their domain.
pub fn add_url_pattern(
    files: &FileManager,
    domain: &str,
    definition: UrlPatternDefinition,
) -> DomainResult<DomainConfig> {
    let mut config = initialize_domain(files, domain)?;
    if let Some(existing) = config
        .url_patterns
        .iter_mut()
        .find(|p| p.name == definition.name)
    {
        *existing = definition;
    } else {
        config.url_patterns.push(definition);
    }
    save_config(files, &config)?;
    Ok(config)
}

/// Removes a pattern by name. Removing a name that does not exist (or a
/// pattern from an unconfigured domain) is a no-op success, not an error.
pub fn remove_url_pattern(
    files: &FileManager,
    domain: &str,
    pattern_name: &str,
) -> DomainResult<bool> {
    let Some(mut config) = get_config(files, domain)? else {
        return Ok(false);
    };
    let before = config.url_patterns.len();
    config.url_patterns.retain(|p| p.name != pattern_name);
    if config.url_patterns.len() == before {
        return Ok(false);
    }
    save_config(files, &config)?;
    Ok(true)
}

fn normalize(domain: &str) -> String {
    domain.trim().to_ascii_lowercase()
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatternKind;
    use tempfile::TempDir;

    fn pattern(name: &str, pattern: &str) -> UrlPatternDefinition {
        UrlPatternDefinition {
            name: name.to_string(),
            pattern: pattern.to_string(),
            kind: PatternKind::Glob,
            priority: 0,
            description: None,
        }
    }

    #[test]
    fn test_initialize_domain_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let fm = FileManager::new(dir.path());

        let first = initialize_domain(&fm, "Example.COM").unwrap();
        assert_eq!(first.domain, "example.com");
        assert!(first.url_patterns.is_empty());

        // A second initialize returns the persisted config untouched.
        let _ = add_url_pattern(&fm, "example.com", pattern("blog", "example.com/blog/*")).unwrap();
        let second = initialize_domain(&fm, "example.com").unwrap();
        assert_eq!(second.url_patterns.len(), 1);
    }

    #[test]
    fn test_add_pattern_upserts_by_name() {
        let dir = TempDir::new().unwrap();
        let fm = FileManager::new(dir.path());

        add_url_pattern(&fm, "example.com", pattern("blog", "example.com/blog/*")).unwrap();
        let config =
            add_url_pattern(&fm, "example.com", pattern("blog", "example.com/news/*")).unwrap();

        assert_eq!(config.url_patterns.len(), 1);
        assert_eq!(config.url_patterns[0].pattern, "example.com/news/*");
    }

    #[test]
    fn test_remove_missing_pattern_is_noop_success() {
        let dir = TempDir::new().unwrap();
        let fm = FileManager::new(dir.path());

        assert!(!remove_url_pattern(&fm, "nowhere.com", "ghost").unwrap());

        initialize_domain(&fm, "example.com").unwrap();
        assert!(!remove_url_pattern(&fm, "example.com", "ghost").unwrap());
    }

    #[test]
    fn test_remove_existing_pattern() {
        let dir = TempDir::new().unwrap();
        let fm = FileManager::new(dir.path());
        add_url_pattern(&fm, "example.com", pattern("blog", "example.com/blog/*")).unwrap();

        assert!(remove_url_pattern(&fm, "example.com", "blog").unwrap());
        let config = get_config(&fm, "example.com").unwrap().unwrap();
        assert!(config.url_patterns.is_empty());
    }

    #[test]
    fn test_list_domains_sorted() {
        let dir = TempDir::new().unwrap();
        let fm = FileManager::new(dir.path());
        initialize_domain(&fm, "zeta.org").unwrap();
        initialize_domain(&fm, "alpha.net").unwrap();

        assert_eq!(
            list_domains(&fm).unwrap(),
            vec!["alpha.net".to_string(), "zeta.org".to_string()]
        );
    }
}
