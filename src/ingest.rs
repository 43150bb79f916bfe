//! Batch corpus loading
//!
//! Pulls every document under a key prefix out of a `DocumentStore`, parses
//! and enriches it, and reports per-document outcomes. Documents are worked
//! in bounded concurrent groups with a pause between groups so a remote
//! store or generator is not hammered. One bad document never aborts the
//! batch.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::generator::TextGenerator;
use crate::parser::text;
use crate::parser::web::PageFetcher;
use crate::parser::DocumentParser;
use crate::processor::PolicyProcessor;
use crate::record::DEFAULT_DEPARTMENT;
use crate::store::{DocumentStore, StoreError};

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Key prefix to list under.
    pub prefix: String,
    /// Documents processed concurrently per group.
    pub group_size: usize,
    /// Pause between groups.
    pub group_pause: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            prefix: "policies/".to_string(),
            group_size: 5,
            group_pause: Duration::from_secs(1),
        }
    }
}

/// One document that could not be loaded.
#[derive(Debug)]
pub struct BatchFailure {
    pub key: String,
    pub error: StoreError,
}

/// Outcome of one batch run.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub loaded: usize,
    pub failed: Vec<BatchFailure>,
    pub skipped_unchanged: usize,
}

/// Batch loader with content-hash change detection across runs.
pub struct CorpusLoader {
    config: LoaderConfig,
    seen_hashes: Mutex<HashMap<String, String>>,
}

impl CorpusLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            seen_hashes: Mutex::new(HashMap::new()),
        }
    }

    /// Load every document under the configured prefix through `parser` and
    /// `processor`. Only a failed listing aborts; per-document failures are
    /// collected in the result.
    pub async fn load<S, F, G>(
        &self,
        store: &S,
        parser: &DocumentParser<F>,
        processor: &PolicyProcessor<G>,
    ) -> Result<BatchResult, StoreError>
    where
        S: DocumentStore,
        F: PageFetcher,
        G: TextGenerator,
    {
        let metas = store.list(&self.config.prefix).await?;
        info!(prefix = %self.config.prefix, count = metas.len(), "loading policy corpus");

        let mut result = BatchResult::default();
        let group_size = self.config.group_size.max(1);
        let mut first_group = true;

        for group in metas.chunks(group_size) {
            if !first_group {
                tokio::time::sleep(self.config.group_pause).await;
            }
            first_group = false;

            let outcomes = futures::future::join_all(
                group
                    .iter()
                    .map(|meta| self.load_one(store, parser, processor, &meta.key)),
            )
            .await;

            for (meta, outcome) in group.iter().zip(outcomes) {
                match outcome {
                    Ok(LoadOutcome::Loaded) => result.loaded += 1,
                    Ok(LoadOutcome::Unchanged) => result.skipped_unchanged += 1,
                    Err(error) => {
                        warn!(key = %meta.key, error = %error, "skipping document");
                        result.failed.push(BatchFailure {
                            key: meta.key.clone(),
                            error,
                        });
                    }
                }
            }
        }

        info!(
            loaded = result.loaded,
            failed = result.failed.len(),
            skipped = result.skipped_unchanged,
            "corpus load finished"
        );
        Ok(result)
    }

    async fn load_one<S, F, G>(
        &self,
        store: &S,
        parser: &DocumentParser<F>,
        processor: &PolicyProcessor<G>,
        key: &str,
    ) -> Result<LoadOutcome, StoreError>
    where
        S: DocumentStore,
        F: PageFetcher,
        G: TextGenerator,
    {
        let object = store.get(key).await?;
        let content = object.text();

        let hash = hex::encode(Sha256::digest(content.as_bytes()));
        if self.seen_hashes.lock().get(key) == Some(&hash) {
            debug!(key, "content unchanged since last run");
            return Ok(LoadOutcome::Unchanged);
        }

        let draft = parser
            .parse_document(&content, key, object.content_type.as_deref())
            .await;

        // Record identity comes from the key, never the parsed title.
        let title = title_from_key(key);
        let department = department_from_key(key);

        processor
            .process_policy(&draft.content, &title, &department)
            .await;
        self.seen_hashes.lock().insert(key.to_string(), hash);
        Ok(LoadOutcome::Loaded)
    }
}

enum LoadOutcome {
    Loaded,
    Unchanged,
}

/// Filename (extension stripped, dashes and underscores spaced) as a title.
pub fn title_from_key(key: &str) -> String {
    let file = key.rsplit('/').next().unwrap_or(key);
    let stem = file.rsplit_once('.').map(|(s, _)| s).unwrap_or(file);
    let spaced = stem.replace(['-', '_'], " ");
    let trimmed = spaced.trim();
    if trimmed.is_empty() {
        text::DEFAULT_TITLE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// The middle segment of `policies/<department>/<file>` keys. Keys without
/// a department segment fall back to the default.
pub fn department_from_key(key: &str) -> String {
    let parts: Vec<&str> = key.split('/').collect();
    if parts.len() >= 3 && !parts[1].is_empty() {
        parts[1].to_string()
    } else {
        DEFAULT_DEPARTMENT.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::ScriptedGenerator;
    use crate::parser::ParserConfig;
    use crate::store::MemoryStore;

    fn offline_parser() -> DocumentParser<crate::parser::web::HttpFetcher> {
        // Store keys are never URLs in these tests, so the HTTP fetcher
        // stays unused.
        DocumentParser::new(ParserConfig::default()).unwrap()
    }

    #[test]
    fn title_from_key_spaces_separators() {
        assert_eq!(title_from_key("policies/hr/parental-leave_policy.txt"), "parental leave policy");
        assert_eq!(title_from_key("vacation.json"), "vacation");
        assert_eq!(title_from_key("policies/hr/.txt"), "Policy Document");
    }

    #[test]
    fn department_needs_three_segments() {
        assert_eq!(department_from_key("policies/hr/leave.txt"), "hr");
        assert_eq!(department_from_key("policies/leave.txt"), "General");
        assert_eq!(department_from_key("leave.txt"), "General");
    }

    #[tokio::test]
    async fn batch_loads_and_counts() {
        let store = MemoryStore::new();
        store.put("policies/hr/leave.txt", "Employees get 15 days of paid leave.", None);
        store.put("policies/it/security.txt", "All laptops must be encrypted.", None);

        let processor = PolicyProcessor::new(ScriptedGenerator::failing());
        let loader = CorpusLoader::new(LoaderConfig {
            group_pause: Duration::from_millis(0),
            ..LoaderConfig::default()
        });

        let result = loader.load(&store, &offline_parser(), &processor).await.unwrap();
        assert_eq!(result.loaded, 2);
        assert!(result.failed.is_empty());
        assert_eq!(processor.cache_stats().policy_cache_size, 2);

        let hr = processor.cache().by_department("hr");
        assert_eq!(hr.len(), 1);
        assert_eq!(hr[0].title, "leave");
    }

    #[tokio::test]
    async fn second_run_skips_unchanged_content() {
        let store = MemoryStore::new();
        store.put("policies/hr/leave.txt", "Employees get 15 days of paid leave.", None);

        let processor = PolicyProcessor::new(ScriptedGenerator::failing());
        let loader = CorpusLoader::new(LoaderConfig {
            group_pause: Duration::from_millis(0),
            ..LoaderConfig::default()
        });
        let parser = offline_parser();

        let first = loader.load(&store, &parser, &processor).await.unwrap();
        assert_eq!(first.loaded, 1);

        let second = loader.load(&store, &parser, &processor).await.unwrap();
        assert_eq!(second.loaded, 0);
        assert_eq!(second.skipped_unchanged, 1);

        store.put("policies/hr/leave.txt", "Employees get 20 days of paid leave.", None);
        let third = loader.load(&store, &parser, &processor).await.unwrap();
        assert_eq!(third.loaded, 1);
    }

    #[tokio::test]
    async fn listing_failure_only_comes_from_the_store() {
        // A store with nothing under the prefix yields an empty, successful
        // batch rather than an error.
        let store = MemoryStore::new();
        let processor = PolicyProcessor::new(ScriptedGenerator::failing());
        let loader = CorpusLoader::new(LoaderConfig::default());

        let result = loader.load(&store, &offline_parser(), &processor).await.unwrap();
        assert_eq!(result.loaded, 0);
        assert!(result.failed.is_empty());
    }

    #[tokio::test]
    async fn key_title_wins_over_parsed_title() {
        let store = MemoryStore::new();
        store.put(
            "policies/hr/annual-leave.json",
            r#"{"policy": {"title": "Leave Policy (2024 revision)", "content": "Take your leave."}}"#,
            Some("application/json"),
        );

        let processor = PolicyProcessor::new(ScriptedGenerator::failing());
        let loader = CorpusLoader::new(LoaderConfig {
            group_pause: Duration::from_millis(0),
            ..LoaderConfig::default()
        });

        loader.load(&store, &offline_parser(), &processor).await.unwrap();
        let records = processor.cache().all();
        assert_eq!(records.len(), 1);
        // The key, not the document body, names the record.
        assert_eq!(records[0].title, "annual leave");
        assert_eq!(records[0].department, "hr");
    }
}
