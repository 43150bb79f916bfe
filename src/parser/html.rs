//! HTML parsing without a full DOM
//!
//! Regex-based stripping is enough here: the engine only needs readable
//! prose and a title, never a faithful tree.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::heuristics;
use crate::record::PolicyDraft;

/// Title used when the document carries no `<title>` tag.
pub(crate) const UNTITLED: &str = "Web Policy Document";

static RE_SCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap());
static RE_STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap());
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<title[^>]*>([^<]+)</title>").unwrap());

pub fn parse(content: &str, summary_max_chars: usize) -> PolicyDraft {
    let text = to_text(content);
    let title = extract_title(content).unwrap_or_else(|| UNTITLED.to_string());

    let mut draft = PolicyDraft::bare(title, text.clone());
    draft.summary = heuristics::summarize(&text, summary_max_chars);
    draft.key_points = heuristics::extract_key_points(&text);
    draft
}

/// Strip `<script>`/`<style>` blocks and remaining tags, decode the minimal
/// entity set, and collapse whitespace.
pub fn to_text(html: &str) -> String {
    let text = RE_SCRIPT.replace_all(html, "");
    let text = RE_STYLE.replace_all(&text, "");
    let text = RE_TAGS.replace_all(&text, " ");
    let text = decode_entities(&text);
    let text = RE_WHITESPACE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Extract the `<title>` tag contents, if any.
pub fn extract_title(html: &str) -> Option<String> {
    RE_TITLE
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|t| !t.is_empty())
}

/// Decode the minimal entity set the engine guarantees.
fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}
