// src/core/validator.rs

use crate::core::pattern_resolver;
use crate::models::{
    ActionMetadata, ActionOverrides, ActionScope, PatternKind, ScopeKind, StoredAction,
    ValidationIssue, ValidationReport,
};
use uuid::Uuid;

/// Priority values are clamped into this band by sanitization; anything the
/// caller hands in outside of it is flagged by validation.
pub const PRIORITY_MIN: i32 = -1000;
pub const PRIORITY_MAX: i32 = 1000;

/// Schema-checks an action without mutating it. Never fails as an operation:
/// the result always comes back, carrying zero or more field-level issues.
///
/// Validation runs on raw caller input, *before* sanitization, so it only
/// flags problems sanitization cannot repair (a missing name is fatal; an
/// untrimmed one is not).
pub fn validate_action(action: &StoredAction) -> ValidationReport {
    let mut issues = Vec::new();

    if action.id.trim().is_empty() {
        issues.push(ValidationIssue::new("id", "id must not be empty"));
    }
    if action.name.trim().is_empty() {
        issues.push(ValidationIssue::new("name", "name must not be empty"));
    }

    // Scope invariant: domain present iff the scope is narrower than global.
    match action.scope.kind {
        ScopeKind::Global => {}
        _ => {
            let missing = action
                .scope
                .domain
                .as_deref()
                .map(|d| d.trim().is_empty())
                .unwrap_or(true);
            if missing {
                issues.push(ValidationIssue::new(
                    "scope.domain",
                    format!(
                        "a '{}'-scoped action requires a domain",
                        action.scope.kind.as_str()
                    ),
                ));
            }
        }
    }

    // Pattern invariant: a pattern-scoped action carries the pattern it is
    // associated with, and that pattern must compile.
    if action.scope.kind == ScopeKind::Pattern {
        match action.scope.url_pattern.as_deref() {
            None => issues.push(ValidationIssue::new(
                "scope.urlPattern",
                "a 'pattern'-scoped action requires a url pattern",
            )),
            Some(p) if p.trim().is_empty() => issues.push(ValidationIssue::new(
                "scope.urlPattern",
                "url pattern must not be empty",
            )),
            Some(p) => {
                if pattern_resolver::compile_pattern(p, PatternKind::Glob).is_none() {
                    issues.push(ValidationIssue::new(
                        "scope.urlPattern",
                        format!("url pattern '{}' does not compile", p),
                    ));
                }
            }
        }
    } else if action.scope.url_pattern.is_some() {
        // Sanitization drops it, but an explicit pattern on the wrong scope
        // kind usually means the caller built the scope by hand and got the
        // kind wrong. Surface it.
        issues.push(ValidationIssue::new(
            "scope.urlPattern",
            format!(
                "url pattern is only meaningful on 'pattern' scope, not '{}'",
                action.scope.kind.as_str()
            ),
        ));
    }

    if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&action.scope.priority) {
        issues.push(ValidationIssue::new(
            "scope.priority",
            format!(
                "priority {} is outside [{}, {}]",
                action.scope.priority, PRIORITY_MIN, PRIORITY_MAX
            ),
        ));
    }

    ValidationReport { issues }
}

/// Normalizes an action in place: trims free text, lowercases and dedups
/// tags, clamps the priority, and drops scope fields that are meaningless
/// for the scope kind. Pure and total: malformed input beyond these repairs
/// is validation's problem, not sanitization's.
pub fn sanitize_action(mut action: StoredAction) -> StoredAction {
    action.id = action.id.trim().to_string();
    action.name = action.name.trim().to_string();
    action.description = action.description.trim().to_string();

    action.scope.priority = action.scope.priority.clamp(PRIORITY_MIN, PRIORITY_MAX);
    action.scope.domain = action
        .scope
        .domain
        .take()
        .map(|d| d.trim().to_ascii_lowercase())
        .filter(|d| !d.is_empty());
    if action.scope.kind == ScopeKind::Global {
        action.scope.domain = None;
    }
    if action.scope.kind != ScopeKind::Pattern {
        action.scope.url_pattern = None;
    } else {
        action.scope.url_pattern = action
            .scope
            .url_pattern
            .take()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
    }

    // Tags compare case-insensitively; normalize to lowercase, drop empties,
    // keep first occurrence order.
    let mut seen = std::collections::HashSet::new();
    action.tags = action
        .tags
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect();

    action
}

/// Builds a fresh action: generated id, required fields defaulted, current
/// timestamps, caller overrides applied last.
pub fn create_default_action(overrides: ActionOverrides) -> StoredAction {
    StoredAction {
        id: Uuid::new_v4().to_string(),
        name: overrides.name.unwrap_or_else(|| "New action".to_string()),
        description: overrides.description.unwrap_or_default(),
        category: overrides.category.unwrap_or_default(),
        author: overrides.author.unwrap_or_default(),
        scope: overrides.scope.unwrap_or_else(|| ActionScope::global(0)),
        tags: overrides.tags.unwrap_or_default(),
        steps: overrides.steps.unwrap_or_default(),
        metadata: ActionMetadata::now(),
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_action_is_valid() {
        let action = create_default_action(ActionOverrides::default());
        let report = validate_action(&action);
        assert!(report.is_valid(), "issues: {:?}", report.issues);
        assert_eq!(action.scope.kind, ScopeKind::Global);
        assert_eq!(action.metadata.usage_count, 0);
    }

    #[test]
    fn test_overrides_applied_last() {
        let action = create_default_action(ActionOverrides {
            name: Some("Click buy".to_string()),
            scope: Some(ActionScope::domain("shop.example.com", 5)),
            tags: Some(vec!["Checkout".to_string()]),
            ..Default::default()
        });
        assert_eq!(action.name, "Click buy");
        assert_eq!(action.scope.domain.as_deref(), Some("shop.example.com"));
        assert_eq!(action.scope.priority, 5);
    }

    #[test]
    fn test_missing_name_reported_per_field() {
        let mut action = create_default_action(ActionOverrides::default());
        action.name = "   ".to_string();
        let report = validate_action(&action);
        assert!(!report.is_valid());
        assert!(report.issues.iter().any(|i| i.field == "name"));
    }

    #[test]
    fn test_domain_scope_requires_domain() {
        let mut action = create_default_action(ActionOverrides::default());
        action.scope.kind = ScopeKind::Domain;
        action.scope.domain = None;
        let report = validate_action(&action);
        assert!(report.issues.iter().any(|i| i.field == "scope.domain"));
    }

    #[test]
    fn test_pattern_scope_requires_pattern() {
        let mut action = create_default_action(ActionOverrides::default());
        action.scope = ActionScope {
            kind: ScopeKind::Pattern,
            domain: Some("example.com".to_string()),
            url_pattern: None,
            priority: 0,
        };
        let report = validate_action(&action);
        assert!(report.issues.iter().any(|i| i.field == "scope.urlPattern"));
    }

    #[test]
    fn test_sanitize_normalizes_tags_and_priority() {
        let mut action = create_default_action(ActionOverrides::default());
        action.tags = vec![
            "  Shopping ".to_string(),
            "shopping".to_string(),
            "".to_string(),
            "Deals".to_string(),
        ];
        action.scope.priority = 9999;

        let sanitized = sanitize_action(action);
        assert_eq!(sanitized.tags, vec!["shopping", "deals"]);
        assert_eq!(sanitized.scope.priority, PRIORITY_MAX);
    }

    #[test]
    fn test_sanitize_drops_domain_on_global_scope() {
        let mut action = create_default_action(ActionOverrides::default());
        action.scope.domain = Some("Example.COM".to_string());
        let sanitized = sanitize_action(action);
        assert!(sanitized.scope.domain.is_none());
    }
}
