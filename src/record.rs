//! Policy record data model
//!
//! A document moves through exactly two states: a `PolicyDraft` produced by
//! the parser (parsed but not summarized) and an enriched `PolicyRecord`
//! produced by the processor and held in its cache. Records are keyed by
//! `(department, title)` and destroyed only by an explicit cache clear.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Department assigned when the source gives no better answer.
pub const DEFAULT_DEPARTMENT: &str = "General";

/// Upper bound on key points carried by an enriched record.
pub const MAX_KEY_POINTS: usize = 7;

/// Upper bound on related topics carried by an enriched record.
pub const MAX_RELATED_TOPICS: usize = 8;

/// Default character cap for generated or truncated summaries.
pub const DEFAULT_SUMMARY_CHARS: usize = 200;

/// Cache identity of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyKey {
    pub department: String,
    pub title: String,
}

impl PolicyKey {
    pub fn new(department: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            department: department.into(),
            title: title.into(),
        }
    }
}

impl std::fmt::Display for PolicyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.department, self.title)
    }
}

/// How an enriched field group was produced.
///
///`Heuristic` means the text generator failed (or returned unusable output)
/// and the local extraction rules filled in, the degraded-but-never-failing
/// path. Exposed so callers and tests can assert which path was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentSource {
    Generated,
    Heuristic,
}

/// One titled (or untitled preamble) span of a parsed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySection {
    pub title: Option<String>,
    pub content: String,
}

/// Skeleton record: the parser's output, before enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDraft {
    pub title: String,
    pub department: String,
    /// Full normalized text. Never re-parsed after creation.
    pub content: String,
    /// Heuristic summary; the processor may replace it with a generated one.
    pub summary: String,
    pub sections: Vec<PolicySection>,
    pub key_points: Vec<String>,
    pub effective_date: Option<String>,
    pub version: Option<String>,
    pub source_url: Option<String>,
    /// True when the requested format could not be honored and the content
    /// was reinterpreted through a degraded path.
    pub fallback: bool,
}

impl PolicyDraft {
    /// Draft with every optional field empty, for the common text paths.
    pub fn bare(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            department: DEFAULT_DEPARTMENT.to_string(),
            content: content.into(),
            summary: String::new(),
            sections: Vec::new(),
            key_points: Vec::new(),
            effective_date: None,
            version: None,
            source_url: None,
            fallback: false,
        }
    }

    pub fn key(&self) -> PolicyKey {
        PolicyKey::new(&self.department, &self.title)
    }
}

/// Fully enriched policy record, the unit of knowledge in the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub title: String,
    pub department: String,
    pub content: String,
    pub summary: String,
    pub key_points: Vec<String>,
    pub related_topics: Vec<String>,
    pub last_processed: DateTime<Utc>,
    pub summary_source: EnrichmentSource,
    pub key_points_source: EnrichmentSource,
    pub topics_source: EnrichmentSource,
}

impl PolicyRecord {
    pub fn key(&self) -> PolicyKey {
        PolicyKey::new(&self.department, &self.title)
    }
}

/// A record paired with its query-scoped relevance score.
///
/// Scores are lexical-overlap counts, not probabilities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPolicy {
    pub record: PolicyRecord,
    pub score: u32,
}
