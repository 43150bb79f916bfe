//! policydesk: policy document normalization, enrichment, and relevance
//! ranking.
//!
//! The engine takes policy documents in whatever shape they arrive (plain
//! text, Markdown, JSON envelopes, HTML pages, live URLs), normalizes them
//! into drafts, enriches each one into a `PolicyRecord` (summary, key
//! points, related topics) through a [`generator::TextGenerator`] with
//! local heuristic fallbacks, and answers questions over the enriched
//! corpus with lexical relevance ranking.
//!
//! Quality degrades before any public operation fails: a generator outage
//! yields heuristic summaries, an unreachable URL yields a placeholder
//! draft, malformed JSON yields an opaque dump. Every degradation is
//! logged and marked on the record via [`record::EnrichmentSource`].

pub mod generator;
pub mod heuristics;
pub mod ingest;
pub mod parser;
pub mod processor;
pub mod prompts;
pub mod record;
pub mod store;

pub use generator::{GenerationError, OllamaGenerator, ScriptedGenerator, TextGenerator};
pub use ingest::{BatchFailure, BatchResult, CorpusLoader, LoaderConfig};
pub use parser::{DocumentFormat, DocumentParser, ParseError, ParserConfig};
pub use processor::{
    AnswerOutcome, CacheStats, CrossReference, PolicyAnswer, PolicyProcessor, ProcessorConfig,
    QuestionContext, RankingWeights,
};
pub use record::{
    EnrichmentSource, PolicyDraft, PolicyKey, PolicyRecord, PolicySection, RankedPolicy,
};
pub use store::{DocumentStore, MemoryStore, StoreError, StoredObject, StoredObjectMeta};

/// Install the default tracing subscriber reading `RUST_LOG`. Safe to call
/// more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
