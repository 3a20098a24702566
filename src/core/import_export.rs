// src/core/import_export.rs

use crate::constants::EXPORT_VERSION;
use crate::models::{
    ActionAuthor, ActionCategory, ActionMetadata, ActionScope, ExportEnvelope, ExportMetadata,
    ScopeKind, StoredAction,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Column order of the CSV wire format. Import is keyed by header name, so
/// re-ordered columns still parse; this exact header is what export writes.
pub const CSV_HEADER: &str =
    "ID,Name,Description,Category,Author,ScopeType,Domain,Tags,UsageCount,CreatedAt,LastUsed";

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to parse JSON import: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV parse error at line {line}: {message}")]
    Csv { line: usize, message: String },
    #[error("Import payload is empty.")]
    Empty,
}

type ImportResult<T> = Result<T, ImportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Json,
    Csv,
}

/// Guesses the payload format: JSON documents open with an object or array,
/// everything else is treated as CSV.
pub fn detect_format(content: &str) -> ImportFormat {
    match content.trim_start().chars().next() {
        Some('{') | Some('[') => ImportFormat::Json,
        _ => ImportFormat::Csv,
    }
}

// --- EXPORT ---

/// Wraps a set of actions in the JSON export envelope.
pub fn build_export(actions: Vec<StoredAction>) -> ExportEnvelope {
    ExportEnvelope {
        metadata: ExportMetadata {
            export_version: EXPORT_VERSION,
            export_timestamp: Utc::now(),
            total_actions: actions.len(),
            exported_by: format!("webact/{}", env!("CARGO_PKG_VERSION")),
        },
        actions,
    }
}

pub fn export_json(actions: Vec<StoredAction>) -> ImportResult<String> {
    Ok(serde_json::to_string_pretty(&build_export(actions))?)
}

/// Flattens actions into the CSV wire format: tags semicolon-joined, fields
/// containing comma/quote/newline double-quote-wrapped with internal quotes
/// doubled (RFC 4180).
pub fn export_csv(actions: &[StoredAction]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for action in actions {
        let fields = [
            action.id.clone(),
            action.name.clone(),
            action.description.clone(),
            action.category.as_str().to_string(),
            action.author.as_str().to_string(),
            action.scope.kind.as_str().to_string(),
            action.scope.domain.clone().unwrap_or_default(),
            action.tags.join(";"),
            action.metadata.usage_count.to_string(),
            action.metadata.created_at.to_rfc3339(),
            action
                .metadata
                .last_used
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default(),
        ];
        let row: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

// --- IMPORT ---

/// Parses an import payload into candidate actions. Records are not yet
/// validated here; the store applies validation and conflict policy
/// per-record so one bad row cannot poison the batch.
pub fn parse_import(content: &str, format: Option<ImportFormat>) -> ImportResult<Vec<StoredAction>> {
    if content.trim().is_empty() {
        return Err(ImportError::Empty);
    }
    match format.unwrap_or_else(|| detect_format(content)) {
        ImportFormat::Json => parse_json(content),
        ImportFormat::Csv => parse_csv(content),
    }
}

/// Accepts either the export envelope or a bare action array.
fn parse_json(content: &str) -> ImportResult<Vec<StoredAction>> {
    if let Ok(envelope) = serde_json::from_str::<ExportEnvelope>(content) {
        return Ok(envelope.actions);
    }
    Ok(serde_json::from_str::<Vec<StoredAction>>(content)?)
}

fn parse_csv(content: &str) -> ImportResult<Vec<StoredAction>> {
    let records = parse_csv_records(content)?;
    let mut rows = records.into_iter();
    let header = rows.next().ok_or(ImportError::Empty)?;

    let columns: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_ascii_lowercase(), i))
        .collect();
    if !columns.contains_key("name") {
        return Err(ImportError::Csv {
            line: 1,
            message: "header row is missing the 'Name' column".to_string(),
        });
    }

    let mut actions = Vec::new();
    for (offset, row) in rows.enumerate() {
        let line = offset + 2; // 1-based, after the header
        actions.push(action_from_csv_row(&columns, &row, line)?);
    }
    Ok(actions)
}

fn action_from_csv_row(
    columns: &HashMap<String, usize>,
    row: &[String],
    line: usize,
) -> ImportResult<StoredAction> {
    let field = |name: &str| -> String {
        columns
            .get(name)
            .and_then(|&i| row.get(i))
            .cloned()
            .unwrap_or_default()
    };

    let id = field("id");
    let id = if id.trim().is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        id
    };

    let domain = {
        let raw = field("domain");
        let trimmed = raw.trim().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    };
    let mut scope_kind = ScopeKind::parse(&field("scopetype")).unwrap_or(ScopeKind::Global);
    // The CSV schema carries no pattern column: a pattern row degrades to its
    // domain, and a domain-less row to global.
    if scope_kind == ScopeKind::Pattern {
        log::debug!(
            "CSV line {}: 'pattern' scope has no pattern column; importing as domain scope.",
            line
        );
        scope_kind = ScopeKind::Domain;
    }
    if scope_kind != ScopeKind::Global && domain.is_none() {
        scope_kind = ScopeKind::Global;
    }
    let scope = ActionScope {
        kind: scope_kind,
        domain: if scope_kind == ScopeKind::Global {
            None
        } else {
            domain
        },
        url_pattern: None,
        priority: 0,
    };

    let usage_count = {
        let raw = field("usagecount");
        if raw.trim().is_empty() {
            0
        } else {
            raw.trim().parse::<u64>().map_err(|_| ImportError::Csv {
                line,
                message: format!("'{}' is not a valid usage count", raw),
            })?
        }
    };

    let parse_ts = |raw: &str| -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    };
    let now = Utc::now();
    let created_at = parse_ts(&field("createdat")).unwrap_or(now);

    let tags: Vec<String> = field("tags")
        .split(';')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    Ok(StoredAction {
        id,
        name: field("name"),
        description: field("description"),
        category: ActionCategory::parse_lenient(&field("category")),
        author: ActionAuthor::parse_lenient(&field("author")),
        scope,
        tags,
        steps: Vec::new(),
        metadata: ActionMetadata {
            usage_count,
            created_at,
            updated_at: now,
            last_used: parse_ts(&field("lastused")),
        },
    })
}

/// A minimal RFC 4180 reader: quoted fields, doubled quotes, CRLF or LF row
/// separators, multi-line fields inside quotes. Fully empty rows are
/// dropped.
fn parse_csv_records(content: &str) -> ImportResult<Vec<Vec<String>>> {
    let mut records: Vec<Vec<String>> = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(ImportError::Csv {
            line: records.len() + 1,
            message: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records
        .into_iter()
        .filter(|r| !(r.len() == 1 && r.first().is_some_and(|f| f.is_empty())))
        .collect())
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validator::{create_default_action, sanitize_action};
    use crate::models::ActionOverrides;

    fn sample(name: &str, tags: &[&str], usage: u64) -> StoredAction {
        let mut action = sanitize_action(create_default_action(ActionOverrides {
            name: Some(name.to_string()),
            tags: Some(tags.iter().map(|t| t.to_string()).collect()),
            ..Default::default()
        }));
        action.metadata.usage_count = usage;
        action
    }

    #[test]
    fn test_csv_escape_rfc4180() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn test_csv_round_trip_preserves_fields() {
        // --- Setup ---
        let actions = vec![
            sample("Click \"Buy now\", fast", &["shopping", "deals"], 4),
            sample("Scroll feed", &[], 0),
        ];

        // --- Execute ---
        let csv = export_csv(&actions);
        let imported = parse_import(&csv, Some(ImportFormat::Csv)).unwrap();

        // --- Assert ---
        assert_eq!(imported.len(), actions.len());
        for (original, round_tripped) in actions.iter().zip(&imported) {
            assert_eq!(round_tripped.name, original.name);
            assert_eq!(round_tripped.category, original.category);
            assert_eq!(round_tripped.tags, original.tags);
            assert_eq!(
                round_tripped.metadata.usage_count,
                original.metadata.usage_count
            );
        }
    }

    #[test]
    fn test_json_envelope_round_trip() {
        let actions = vec![sample("Open inbox", &["mail"], 2)];
        let json = export_json(actions.clone()).unwrap();

        let envelope: ExportEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(envelope.metadata.total_actions, 1);
        assert_eq!(envelope.metadata.export_version, EXPORT_VERSION);

        let imported = parse_import(&json, None).unwrap();
        assert_eq!(imported, actions);
    }

    #[test]
    fn test_json_bare_array_accepted() {
        let actions = vec![sample("Open inbox", &[], 0)];
        let raw = serde_json::to_string(&actions).unwrap();
        let imported = parse_import(&raw, None).unwrap();
        assert_eq!(imported.len(), 1);
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("  {\"metadata\":{}}"), ImportFormat::Json);
        assert_eq!(detect_format("[]"), ImportFormat::Json);
        assert_eq!(detect_format(CSV_HEADER), ImportFormat::Csv);
    }

    #[test]
    fn test_unterminated_quote_is_an_error() {
        let csv = format!("{}\n\"broken,row,,,,,,,,\n", CSV_HEADER);
        let result = parse_import(&csv, Some(ImportFormat::Csv));
        assert!(matches!(result, Err(ImportError::Csv { .. })));
    }

    #[test]
    fn test_empty_payload_is_an_error() {
        assert!(matches!(parse_import("  \n", None), Err(ImportError::Empty)));
    }

    #[test]
    fn test_csv_row_without_id_gets_one() {
        let csv = format!("{}\n,No id row,,custom,user,global,,,0,,\n", CSV_HEADER);
        let imported = parse_import(&csv, Some(ImportFormat::Csv)).unwrap();
        assert_eq!(imported.len(), 1);
        assert!(!imported[0].id.is_empty());
    }
}
