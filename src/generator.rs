//! Text generation collaborator
//!
//! The engine treats the language model as an external capability behind
//! [`TextGenerator`]. One attempt per call, no retries: callers fall back to
//! local heuristics on any failure. [`OllamaGenerator`] is the stock HTTP
//! implementation; [`ScriptedGenerator`] is the test double.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generator unreachable: {0}")]
    Connection(String),
    #[error("generation timed out after {0}s")]
    Timeout(u64),
    #[error("generator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unusable generator response: {0}")]
    Decode(String),
}

/// External capability producing natural-language text from a prompt.
pub trait TextGenerator: Send + Sync {
    /// Single-attempt completion with a token budget. The engine never
    /// retries; on `Err` it degrades locally.
    fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

/// Ollama HTTP client speaking `/api/generate`.
pub struct OllamaGenerator {
    base_url: String,
    model: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GenerationError::Connection(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout_secs,
            client,
        })
    }

    /// Local Ollama instance on the standard port, two-minute timeout.
    pub fn default_local(model: &str) -> Result<Self, GenerationError> {
        Self::new("http://localhost:11434", model, 120)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl TextGenerator for OllamaGenerator {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: max_tokens,
            },
        };

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout(self.timeout_secs)
            } else {
                GenerationError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;

        Ok(parsed.response)
    }
}

/// Test generator replaying queued replies in order; an exhausted queue
/// fails every further call, which doubles as the always-failing generator.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Generator whose every call fails.
    pub fn failing() -> Self {
        Self::new(std::iter::empty::<String>())
    }

    pub fn push_err(&self, err: GenerationError) {
        self.replies.lock().push_back(Err(err));
    }

    /// Number of `complete` calls observed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Connection("no scripted reply".into())))
    }
}
