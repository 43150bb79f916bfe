//! Local text heuristics shared by every non-AI path
//!
//! The parser uses these to seed draft summaries and key points; the
//! processor falls back to them whenever the text generator fails. They are
//! deliberately simple line/sentence scans, not NLP.

/// Cap on key points extracted from marker lines.
const MAX_SCANNED_POINTS: usize = 10;

/// Cleaned marker-line length bounds, half-open.
const POINT_MIN_CHARS: usize = 10;
const POINT_MAX_CHARS: usize = 200;

/// Sentences kept by the keyword fallback must contain one of these.
const POLICY_KEYWORDS: &[&str] = &[
    "must",
    "shall",
    "required",
    "policy",
    "procedure",
    "guideline",
    "important",
    "mandatory",
];

/// Summarize `text` within `max_chars` characters.
///
/// Text already within the cap is returned unchanged. Otherwise whole
/// sentences (split on `.!?`) are accumulated greedily while they fit; if
/// not even the first sentence fits, the text is hard-truncated with a
/// trailing ellipsis marker.
pub fn summarize(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut summary = String::new();
    for sentence in text.split(['.', '!', '?']) {
        if sentence.trim().is_empty() {
            continue;
        }
        if summary.chars().count() + sentence.chars().count() <= max_chars {
            summary.push_str(sentence);
            summary.push('.');
        } else {
            break;
        }
    }

    if summary.is_empty() {
        summary = text.chars().take(max_chars).collect::<String>() + "...";
    }

    summary.trim().to_string()
}

/// Scan lines for bullet markers, numbered-list markers, or the literal
/// prefixes `important:` / `note:` / `key:` (case-insensitive). Markers are
/// stripped and points kept when the cleaned length falls in `[10, 200)`,
/// capped at 10 points.
pub fn extract_key_points(text: &str) -> Vec<String> {
    let mut points = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if !is_point_line(trimmed) {
            continue;
        }

        let clean = strip_point_markers(trimmed);
        let len = clean.chars().count();
        if (POINT_MIN_CHARS..POINT_MAX_CHARS).contains(&len) {
            points.push(clean);
            if points.len() >= MAX_SCANNED_POINTS {
                break;
            }
        }
    }

    points
}

/// Keyword-sentence fallback: when no marker lines match, keep sentences of
/// 20–200 characters containing a policy keyword, up to `cap`.
pub fn extract_keyword_sentences(text: &str, cap: usize) -> Vec<String> {
    let mut points = Vec::new();

    for sentence in text.split(['.', '!', '?']) {
        let trimmed = sentence.trim();
        let len = trimmed.chars().count();
        if !(20..200).contains(&len) {
            continue;
        }
        let lower = trimmed.to_lowercase();
        if POLICY_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            points.push(trimmed.to_string());
            if points.len() >= cap {
                break;
            }
        }
    }

    points
}

fn is_point_line(line: &str) -> bool {
    if has_bullet_marker(line) || has_number_marker(line) {
        return true;
    }
    let lower = line.to_lowercase();
    lower.starts_with("important:") || lower.starts_with("note:") || lower.starts_with("key:")
}

fn has_bullet_marker(line: &str) -> bool {
    let mut chars = line.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('-' | '•' | '*'), Some(c)) if c.is_whitespace()
    )
}

fn has_number_marker(line: &str) -> bool {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return false;
    }
    let rest = &line[digits..];
    let mut chars = rest.chars();
    matches!((chars.next(), chars.next()), (Some('.'), Some(c)) if c.is_whitespace())
}

fn strip_point_markers(line: &str) -> String {
    let mut rest = line;

    if has_bullet_marker(rest) {
        // The bullet may be multi-byte (`•`), so step over it by char.
        let mut chars = rest.chars();
        chars.next();
        rest = chars.as_str().trim_start();
    } else if has_number_marker(rest) {
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        rest = rest[digits + 1..].trim_start();
    }

    let lower = rest.to_lowercase();
    for prefix in ["important:", "note:", "key:"] {
        if lower.starts_with(prefix) {
            rest = rest[prefix.len()..].trim_start();
            break;
        }
    }

    rest.to_string()
}
