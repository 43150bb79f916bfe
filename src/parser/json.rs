//! JSON policy extraction
//!
//! Incoming JSON is classified once into a tagged shape, then dispatched:
//! a `policy`/`policies` envelope, a flat `{title, content}` document, or
//! an unrecognized generic object flattened into prose. Malformed JSON
//! degrades to an opaque dump titled "Unknown Policy"; the caller never
//! sees an error.

use serde_json::Value;

use crate::heuristics;
use crate::record::{PolicyDraft, PolicySection, DEFAULT_DEPARTMENT};

/// Recursion cap for flattening generic objects. Subtrees below this depth
/// are dropped silently, bounding the walk on deeply nested input.
pub const MAX_FLATTEN_DEPTH: usize = 3;

/// Inline string values longer than this are considered prose worth keeping
/// during flattening.
const PROSE_MIN_CHARS: usize = 50;

/// Fields that may carry pre-extracted key points, in probe order.
const KEY_POINT_FIELDS: &[&str] = &["keyPoints", "highlights", "important", "summary_points", "bullets"];

/// Shape of an incoming JSON policy document, resolved in one
/// classification step before any extraction runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonShape {
    /// `{"policy": {...}}` or `{"policies": [...]}` envelope.
    PolicyEnvelope,
    /// Flat `{"title": ..., "content": ...}` document.
    Structured,
    /// Anything else, flattened generically.
    Generic,
}

fn classify(value: &Value) -> JsonShape {
    match value.as_object() {
        Some(map) if map.contains_key("policy") || map.contains_key("policies") => {
            JsonShape::PolicyEnvelope
        }
        Some(map) if map.contains_key("title") && map.contains_key("content") => {
            JsonShape::Structured
        }
        _ => JsonShape::Generic,
    }
}

pub fn parse(content: &str, summary_max_chars: usize) -> Result<PolicyDraft, serde_json::Error> {
    let value: Value = serde_json::from_str(content)?;
    Ok(match classify(&value) {
        JsonShape::PolicyEnvelope => extract_envelope(&value, summary_max_chars),
        JsonShape::Structured => extract_structured(&value, summary_max_chars),
        JsonShape::Generic => extract_generic(&value, summary_max_chars),
    })
}

pub(crate) const OPAQUE_TITLE: &str = "Unknown Policy";

/// Opaque-dump draft for malformed JSON input.
pub fn opaque_dump(content: &str) -> PolicyDraft {
    let mut draft = PolicyDraft::bare(OPAQUE_TITLE, content);
    draft.summary = "JSON policy document".to_string();
    draft.fallback = true;
    draft
}

fn extract_envelope(value: &Value, summary_max_chars: usize) -> PolicyDraft {
    let policy = value
        .get("policy")
        .or_else(|| value.get("policies").and_then(|p| p.get(0)))
        .unwrap_or(value);

    let title = str_field(policy, &["title", "name"]).unwrap_or_else(|| "Policy Document".into());
    let content = flatten(policy, 0);
    let summary = str_field(policy, &["summary", "description"])
        .unwrap_or_else(|| heuristics::summarize(&content, summary_max_chars));

    let mut draft = PolicyDraft::bare(title, content);
    draft.summary = summary;
    draft.department = str_field(policy, &["department"]).unwrap_or_else(|| DEFAULT_DEPARTMENT.into());
    draft.effective_date = str_field(policy, &["effectiveDate", "lastUpdated"]);
    draft.version = str_field(policy, &["version"]);
    let sections = extract_sections(policy);
    draft.key_points =
        lifted_key_points(policy).unwrap_or_else(|| section_key_points(&sections));
    draft.sections = sections;
    draft
}

fn extract_structured(value: &Value, summary_max_chars: usize) -> PolicyDraft {
    let title = str_field(value, &["title"]).unwrap_or_default();
    let content = str_field(value, &["content"]).unwrap_or_default();
    let summary = str_field(value, &["summary"])
        .unwrap_or_else(|| heuristics::summarize(&content, summary_max_chars));

    let mut draft = PolicyDraft::bare(title, content);
    draft.summary = summary;
    draft.department = str_field(value, &["department"]).unwrap_or_else(|| DEFAULT_DEPARTMENT.into());
    draft.effective_date = str_field(value, &["effectiveDate"]);
    draft.version = str_field(value, &["version"]);
    draft.sections = value
        .get("sections")
        .and_then(Value::as_array)
        .map(|sections| sections.iter().filter_map(section_from_value).collect())
        .unwrap_or_default();
    draft.key_points = lifted_key_points(value).unwrap_or_default();
    draft
}

fn extract_generic(value: &Value, summary_max_chars: usize) -> PolicyDraft {
    let content = flatten(value, 0);
    let title = str_field(value, &["title", "name"]).unwrap_or_else(|| "Policy Document".into());
    let summary = str_field(value, &["summary", "description"])
        .unwrap_or_else(|| heuristics::summarize(&content, summary_max_chars));

    let mut draft = PolicyDraft::bare(title, content);
    draft.summary = summary;
    draft.department = str_field(value, &["department"]).unwrap_or_else(|| DEFAULT_DEPARTMENT.into());
    draft
}

/// Recursively flatten key/value pairs into prose. `content`/`text`/`body`
/// values are inlined verbatim; other long strings become `key: value`
/// lines; nested objects recurse up to [`MAX_FLATTEN_DEPTH`].
fn flatten(value: &Value, depth: usize) -> String {
    if depth > MAX_FLATTEN_DEPTH {
        return String::new();
    }

    let mut out = String::new();
    let entries: Vec<(String, &Value)> = match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => return String::new(),
    };

    for (key, entry) in entries {
        match entry {
            _ if matches!(key.as_str(), "content" | "text" | "body") => {
                out.push_str(entry.as_str().unwrap_or_default());
                out.push_str("\n\n");
            }
            Value::String(s) if s.chars().count() > PROSE_MIN_CHARS => {
                out.push_str(&format!("{key}: {s}\n\n"));
            }
            Value::Object(_) | Value::Array(_) => {
                let nested = flatten(entry, depth + 1);
                if !nested.is_empty() {
                    out.push_str(&format!("{key}:\n{nested}\n"));
                }
            }
            _ => {}
        }
    }

    out
}

/// Build sections from nested objects: every object value (`metadata` and
/// `info` excluded) becomes a section, its camelCase key spaced into a
/// title.
fn extract_sections(policy: &Value) -> Vec<PolicySection> {
    if let Some(sections) = policy.get("sections").and_then(Value::as_array) {
        return sections.iter().filter_map(section_from_value).collect();
    }

    let Some(map) = policy.as_object() else {
        return Vec::new();
    };

    map.iter()
        .filter(|(key, value)| {
            value.is_object() && key.as_str() != "metadata" && key.as_str() != "info"
        })
        .map(|(key, value)| PolicySection {
            title: Some(spaced_title(key)),
            content: flatten(value, 0),
        })
        .collect()
}

fn section_from_value(value: &Value) -> Option<PolicySection> {
    let title = str_field(value, &["title"]);
    let content = match value.get("content") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => flatten(other, 0),
        None => return None,
    };
    Some(PolicySection { title, content })
}

/// Lift pre-extracted key points from a known field, if present.
fn lifted_key_points(policy: &Value) -> Option<Vec<String>> {
    for field in KEY_POINT_FIELDS {
        if let Some(items) = policy.get(*field).and_then(Value::as_array) {
            return Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            );
        }
    }
    None
}

/// Pull key points out of sections whose title mentions key/important/summary.
fn section_key_points(sections: &[PolicySection]) -> Vec<String> {
    sections
        .iter()
        .filter(|s| {
            s.title.as_deref().is_some_and(|t| {
                let lower = t.to_lowercase();
                lower.contains("key") || lower.contains("important") || lower.contains("summary")
            })
        })
        .map(|s| s.content.clone())
        .collect()
}

fn str_field(value: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| value.get(*name).and_then(Value::as_str))
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

/// `camelCaseKey` → `Camel Case Key`.
fn spaced_title(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if i == 0 {
            out.extend(c.to_uppercase());
        } else {
            if c.is_uppercase() {
                out.push(' ');
            }
            out.push(c);
        }
    }
    out
}
