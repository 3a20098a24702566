// src/core/pattern_resolver.rs

use crate::core::index_manager::ActionIndexManager;
use crate::models::{
    DomainConfig, PatternKind, ResolvedAction, ScopeKind, StoredAction, UrlPatternDefinition,
};
use regex::Regex;
use std::collections::HashMap;
use url::Url;

/// Compiles a stored pattern string into a matcher. `None` means the pattern
/// does not compile; callers log and treat it as a non-match rather than
/// failing resolution.
pub fn compile_pattern(pattern: &str, kind: PatternKind) -> Option<Regex> {
    let source = match kind {
        PatternKind::Glob => regex::escape(pattern).replace("\\*", ".*"),
        PatternKind::Prefix => format!("^{}", regex::escape(pattern)),
        PatternKind::Regex => pattern.to_string(),
    };
    match Regex::new(&source) {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("Pattern '{}' does not compile: {}", pattern, e);
            None
        }
    }
}

/// Tests one pattern definition against a URL's `host + path` string (and,
/// for prefixes, the bare path, so `/blog/` style patterns keep working).
fn definition_matches(definition: &UrlPatternDefinition, host_path: &str, path: &str) -> bool {
    let Some(re) = compile_pattern(&definition.pattern, definition.kind) else {
        return false;
    };
    match definition.kind {
        PatternKind::Prefix => re.is_match(host_path) || re.is_match(path),
        PatternKind::Glob | PatternKind::Regex => re.is_match(host_path),
    }
}

/// A glob carried directly on a pattern-scoped action.
fn inline_pattern_matches(pattern: &str, host_path: &str) -> bool {
    compile_pattern(pattern, PatternKind::Glob)
        .map(|re| re.is_match(host_path))
        .unwrap_or(false)
}

/// Resolves the ordered set of actions applicable to a URL.
///
/// Candidates are collected from three sources, in the spirit of a layered
/// precedence lookup:
/// 1. Global-scope actions — always applicable.
/// 2. Domain- and page-scope actions whose domain equals the URL's hostname.
/// 3. Pattern-scope actions whose associated pattern matches: the action's
///    own inline pattern if it carries one, otherwise any of the named
///    patterns registered on the action's domain.
///
/// An action reachable through more than one source appears exactly once,
/// credited to its most specific match. Results are ordered by scope
/// priority descending, then match specificity (`page > pattern > domain >
/// global`), then `updated_at` descending for determinism.
///
/// A malformed URL is not an error: it simply has no hostname, so only
/// global actions apply.
pub fn resolve_actions_for_url(
    raw_url: &str,
    index: &ActionIndexManager,
    load_action: impl Fn(&str) -> Option<StoredAction>,
    load_domain_config: impl Fn(&str) -> Option<DomainConfig>,
) -> Vec<ResolvedAction> {
    // --- 1. Parse the URL and derive the match targets ---
    let parsed = Url::parse(raw_url.trim()).ok();
    let host = parsed
        .as_ref()
        .and_then(|u| u.host_str())
        .map(|h| h.to_ascii_lowercase());
    let path = parsed
        .as_ref()
        .map(|u| u.path().to_string())
        .unwrap_or_default();
    let host_path = host
        .as_ref()
        .map(|h| format!("{}{}", h, path))
        .unwrap_or_default();

    if parsed.is_none() {
        log::debug!(
            "URL '{}' did not parse; resolving global actions only.",
            raw_url
        );
    }

    // Candidate ids, each credited to its most specific match source.
    let mut candidates: HashMap<String, ScopeKind> = HashMap::new();
    let credit = |id: &str, matched: ScopeKind, candidates: &mut HashMap<String, ScopeKind>| {
        candidates
            .entry(id.to_string())
            .and_modify(|existing| {
                if matched.specificity() > existing.specificity() {
                    *existing = matched;
                }
            })
            .or_insert(matched);
    };

    // --- 2a. Global scope: always in play ---
    for entry in index.entries_for_scope(ScopeKind::Global) {
        credit(&entry.id, ScopeKind::Global, &mut candidates);
    }

    if let Some(host) = &host {
        // --- 2b. Domain and page scope for the URL's hostname ---
        for entry in index.entries_for_domain(host) {
            match entry.scope_kind {
                ScopeKind::Domain | ScopeKind::Page => {
                    credit(&entry.id, entry.scope_kind, &mut candidates);
                }
                // Pattern-scoped entries of this domain are judged by their
                // patterns below, not by domain equality.
                _ => {}
            }
        }

        // --- 2c. Pattern scope, judged against host + path ---
        let mut config_cache: HashMap<String, Option<DomainConfig>> = HashMap::new();
        for entry in index.entries_for_scope(ScopeKind::Pattern) {
            let matched = if let Some(pattern) = &entry.url_pattern {
                inline_pattern_matches(pattern, &host_path)
            } else if let Some(domain) = &entry.domain {
                let config = config_cache
                    .entry(domain.clone())
                    .or_insert_with(|| load_domain_config(domain));
                config
                    .as_ref()
                    .map(|c| {
                        c.url_patterns
                            .iter()
                            .any(|def| definition_matches(def, &host_path, &path))
                    })
                    .unwrap_or(false)
            } else {
                false
            };
            if matched {
                credit(&entry.id, ScopeKind::Pattern, &mut candidates);
            }
        }
    }

    // --- 3. Materialize and order ---
    let mut resolved: Vec<ResolvedAction> = candidates
        .into_iter()
        .filter_map(|(id, matched)| load_action(&id).map(|action| ResolvedAction { action, matched }))
        .collect();

    resolved.sort_by(|a, b| {
        b.action
            .scope
            .priority
            .cmp(&a.action.scope.priority)
            .then_with(|| b.matched.specificity().cmp(&a.matched.specificity()))
            .then_with(|| {
                b.action
                    .metadata
                    .updated_at
                    .cmp(&a.action.metadata.updated_at)
            })
            .then_with(|| a.action.id.cmp(&b.action.id))
    });

    resolved
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validator::{create_default_action, sanitize_action};
    use crate::models::{ActionOverrides, ActionScope};
    use std::collections::HashMap;

    struct Fixture {
        index: ActionIndexManager,
        actions: HashMap<String, StoredAction>,
        configs: HashMap<String, DomainConfig>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                index: ActionIndexManager::new(),
                actions: HashMap::new(),
                configs: HashMap::new(),
            }
        }

        fn add(&mut self, name: &str, scope: ActionScope) -> String {
            let action = sanitize_action(create_default_action(ActionOverrides {
                name: Some(name.to_string()),
                scope: Some(scope),
                ..Default::default()
            }));
            self.index.add_action(&action, format!("actions/{}.json", name));
            let id = action.id.clone();
            self.actions.insert(id.clone(), action);
            id
        }

        fn resolve(&self, url: &str) -> Vec<ResolvedAction> {
            resolve_actions_for_url(
                url,
                &self.index,
                |id| self.actions.get(id).cloned(),
                |domain| self.configs.get(domain).cloned(),
            )
        }
    }

    #[test]
    fn test_ordering_priority_then_specificity() {
        let mut fx = Fixture::new();
        let global = fx.add("global", ActionScope::global(10));
        let domain = fx.add("domain", ActionScope::domain("example.com", 20));
        let pattern = fx.add(
            "pattern",
            ActionScope::pattern("example.com", "*/blog/*", 30),
        );

        let resolved = fx.resolve("https://example.com/blog/post1");
        let ids: Vec<&str> = resolved.iter().map(|r| r.action.id.as_str()).collect();
        assert_eq!(ids, vec![pattern.as_str(), domain.as_str(), global.as_str()]);
    }

    #[test]
    fn test_priority_beats_specificity() {
        let mut fx = Fixture::new();
        let global = fx.add("global", ActionScope::global(50));
        let domain = fx.add("domain", ActionScope::domain("example.com", 20));

        let resolved = fx.resolve("https://example.com/");
        let ids: Vec<&str> = resolved.iter().map(|r| r.action.id.as_str()).collect();
        assert_eq!(ids, vec![global.as_str(), domain.as_str()]);
    }

    #[test]
    fn test_dedup_keeps_most_specific_match() {
        let mut fx = Fixture::new();
        // A pattern action on the URL's own domain is reachable through the
        // domain lookup and through its pattern; it must appear once,
        // credited as a pattern match.
        let id = fx.add(
            "checkout",
            ActionScope::pattern("shop.example.com", "shop.example.com/cart*", 5),
        );

        let resolved = fx.resolve("https://shop.example.com/cart/items");
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].action.id, id);
        assert_eq!(resolved[0].matched, ScopeKind::Pattern);
    }

    #[test]
    fn test_named_domain_patterns_pull_in_patternless_actions() {
        let mut fx = Fixture::new();
        let mut action = sanitize_action(create_default_action(ActionOverrides {
            name: Some("news".to_string()),
            scope: Some(ActionScope {
                kind: ScopeKind::Pattern,
                domain: Some("example.com".to_string()),
                url_pattern: None,
                priority: 0,
            }),
            ..Default::default()
        }));
        action.scope.url_pattern = None;
        fx.index.add_action(&action, "p".to_string());
        let id = action.id.clone();
        fx.actions.insert(id.clone(), action);

        let mut config = DomainConfig::new("example.com");
        config.url_patterns.push(UrlPatternDefinition {
            name: "news".to_string(),
            pattern: "/news/".to_string(),
            kind: PatternKind::Prefix,
            priority: 0,
            description: None,
        });
        fx.configs.insert("example.com".to_string(), config);

        let hit = fx.resolve("https://example.com/news/today");
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].action.id, id);

        let miss = fx.resolve("https://example.com/about");
        assert!(miss.is_empty());
    }

    #[test]
    fn test_malformed_url_returns_only_globals() {
        let mut fx = Fixture::new();
        let global = fx.add("global", ActionScope::global(0));
        fx.add("domain", ActionScope::domain("example.com", 99));

        let resolved = fx.resolve("not a url at all");
        let ids: Vec<&str> = resolved.iter().map(|r| r.action.id.as_str()).collect();
        assert_eq!(ids, vec![global.as_str()]);
    }

    #[test]
    fn test_other_domains_do_not_leak() {
        let mut fx = Fixture::new();
        fx.add("other", ActionScope::domain("other.com", 10));

        assert!(fx.resolve("https://example.com/").is_empty());
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        let mut fx = Fixture::new();
        fx.add("a", ActionScope::global(0));
        fx.add("b", ActionScope::global(0));

        let first = fx.resolve("https://example.com/");
        let second = fx.resolve("https://example.com/");
        let ids = |rs: &[ResolvedAction]| {
            rs.iter().map(|r| r.action.id.clone()).collect::<Vec<_>>()
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_invalid_stored_regex_is_a_non_match() {
        let mut fx = Fixture::new();
        let mut config = DomainConfig::new("example.com");
        config.url_patterns.push(UrlPatternDefinition {
            name: "broken".to_string(),
            pattern: "([unclosed".to_string(),
            kind: PatternKind::Regex,
            priority: 0,
            description: None,
        });
        fx.configs.insert("example.com".to_string(), config);

        let mut action = sanitize_action(create_default_action(ActionOverrides {
            name: Some("x".to_string()),
            scope: Some(ActionScope {
                kind: ScopeKind::Pattern,
                domain: Some("example.com".to_string()),
                url_pattern: None,
                priority: 0,
            }),
            ..Default::default()
        }));
        action.scope.url_pattern = None;
        fx.index.add_action(&action, "p".to_string());
        fx.actions.insert(action.id.clone(), action);

        assert!(fx.resolve("https://example.com/anything").is_empty());
    }
}
