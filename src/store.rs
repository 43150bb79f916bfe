//! Document storage abstraction
//!
//! The loader pulls raw documents from a `DocumentStore`. Payloads are bytes
//! plus an optional content type; text decoding honors a `charset` hint and
//! falls back to lossy UTF-8, so a mislabeled object never fails ingestion.

use std::collections::BTreeMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Listing entry for a stored document.
#[derive(Debug, Clone)]
pub struct StoredObjectMeta {
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub size: u64,
}

/// A retrieved document payload.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content: Vec<u8>,
    pub content_type: Option<String>,
}

impl StoredObject {
    /// Decode the payload to text. Uses the `charset` parameter of the
    /// content type when present and recognized, otherwise lossy UTF-8.
    pub fn text(&self) -> String {
        if let Some(label) = self.charset_label() {
            if let Some(encoding) = encoding_rs::Encoding::for_label(label.as_bytes()) {
                let (decoded, _, _) = encoding.decode(&self.content);
                return decoded.into_owned();
            }
        }
        String::from_utf8_lossy(&self.content).into_owned()
    }

    fn charset_label(&self) -> Option<String> {
        let content_type = self.content_type.as_deref()?;
        content_type.split(';').skip(1).find_map(|param| {
            let (name, value) = param.split_once('=')?;
            (name.trim().eq_ignore_ascii_case("charset"))
                .then(|| value.trim().trim_matches('"').to_string())
        })
    }
}

/// Read-only document source keyed by string paths.
pub trait DocumentStore: Send + Sync {
    /// List objects whose key starts with `prefix`, in key order.
    fn list(
        &self,
        prefix: &str,
    ) -> impl Future<Output = Result<Vec<StoredObjectMeta>, StoreError>> + Send;

    fn get(&self, key: &str) -> impl Future<Output = Result<StoredObject, StoreError>> + Send;
}

/// In-memory store for tests and embedding hosts. Keys list in sorted
/// order, matching what object stores return.
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn put(&self, key: &str, content: impl Into<Vec<u8>>, content_type: Option<&str>) {
        self.objects.lock().insert(
            key.to_string(),
            StoredObject {
                content: content.into(),
                content_type: content_type.map(str::to_string),
            },
        );
    }

    pub fn remove(&self, key: &str) {
        self.objects.lock().remove(key);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObjectMeta>, StoreError> {
        Ok(self
            .objects
            .lock()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| StoredObjectMeta {
                key: key.clone(),
                last_modified: None,
                size: object.content.len() as u64,
            })
            .collect())
    }

    async fn get(&self, key: &str) -> Result<StoredObject, StoreError> {
        self.objects
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}
