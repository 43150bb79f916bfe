//! Plain-text and markdown parsing
//!
//! Line-oriented by design: the first non-empty line (stripped of leading
//! `#`/`*` markers) becomes the title, and later lines are segmented into
//! sections at header boundaries.

use crate::heuristics;
use crate::record::{PolicyDraft, PolicySection};

/// Fallback title when the document is empty.
pub(crate) const DEFAULT_TITLE: &str = "Policy Document";

/// Headers longer than this are treated as shouting prose, not headings.
const MAX_HEADER_CHARS: usize = 100;

pub fn parse(content: &str, summary_max_chars: usize) -> PolicyDraft {
    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();

    let title = lines
        .first()
        .map(|l| strip_heading_markers(l))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let sections = split_sections(lines.get(1..).unwrap_or_default());

    let mut draft = PolicyDraft::bare(title, content);
    draft.summary = heuristics::summarize(content, summary_max_chars);
    draft.key_points = heuristics::extract_key_points(content);
    draft.sections = sections;
    draft
}

/// A line is a header if it starts with `#` or `*`, or is entirely
/// upper-case and under 100 characters.
pub(crate) fn is_header(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.starts_with('#') || trimmed.starts_with('*') {
        return true;
    }
    trimmed == trimmed.to_uppercase() && trimmed.chars().count() < MAX_HEADER_CHARS
}

pub(crate) fn strip_heading_markers(line: &str) -> String {
    line.trim()
        .trim_start_matches(['#', '*'])
        .trim()
        .to_string()
}

fn split_sections(lines: &[&str]) -> Vec<PolicySection> {
    let mut sections = Vec::new();
    let mut current_title: Option<String> = None;
    let mut body: Vec<&str> = Vec::new();

    for line in lines {
        if is_header(line) {
            if current_title.is_some() || !body.is_empty() {
                sections.push(PolicySection {
                    title: current_title.take(),
                    content: body.join("\n"),
                });
                body.clear();
            }
            current_title = Some(strip_heading_markers(line));
        } else {
            body.push(line);
        }
    }

    if current_title.is_some() || !body.is_empty() {
        sections.push(PolicySection {
            title: current_title,
            content: body.join("\n"),
        });
    }

    sections
}
