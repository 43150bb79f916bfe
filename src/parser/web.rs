//! URL fetching with a fixed timeout and placeholder fallback
//!
//! A fetched page is parsed as HTML. Any fetch failure (timeout, connect
//! error, bad status, oversized body) degrades to a placeholder draft
//! titled from the URL path; it never reaches the caller as an error.

use std::future::Future;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use super::html;
use crate::record::PolicyDraft;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {0} timed out")]
    Timeout(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },
    #[error("content too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: usize, max: usize },
}

/// Web fetch configuration.
#[derive(Debug, Clone)]
pub struct WebFetchConfig {
    /// Fixed per-fetch timeout; expiry aborts the request.
    pub timeout_secs: u64,
    /// Streamed body size cap.
    pub max_page_size: usize,
    pub user_agent: String,
}

impl Default for WebFetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_page_size: 5 * 1024 * 1024, // 5MB
            user_agent: "policydesk/0.1 (Policy Document Parser)".into(),
        }
    }
}

/// Page retrieval seam, injectable so parse failure paths are testable
/// without a network.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// reqwest-backed fetcher.
pub struct HttpFetcher {
    config: WebFetchConfig,
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: WebFetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self { config, client })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.config.max_page_size {
                return Err(FetchError::TooLarge {
                    size: len as usize,
                    max: self.config.max_page_size,
                });
            }
        }

        let bytes = read_body_with_limit(response, self.config.max_page_size).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Fetch `url` and parse the body as HTML; degrade to a placeholder draft on
/// any failure.
pub async fn parse<F: PageFetcher>(fetcher: &F, url: &Url, summary_max_chars: usize) -> PolicyDraft {
    match fetcher.fetch(url).await {
        Ok(body) => {
            let mut draft = html::parse(&body, summary_max_chars);
            if draft.title == html::UNTITLED {
                draft.title = title_from_url(url);
            }
            draft.source_url = Some(url.to_string());
            draft
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "url fetch failed, synthesizing placeholder");
            placeholder_draft(url)
        }
    }
}

/// Placeholder draft for an unreachable URL.
fn placeholder_draft(url: &Url) -> PolicyDraft {
    let mut draft = PolicyDraft::bare(
        title_from_url(url),
        format!("Unable to fetch content from: {url}"),
    );
    draft.summary = "Website content unavailable".to_string();
    draft.source_url = Some(url.to_string());
    draft.fallback = true;
    draft
}

/// Derive a human-readable title from the last URL path segment (or the
/// host), stripping the extension and title-casing dash/underscore words.
pub(crate) fn title_from_url(url: &Url) -> String {
    let last_segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(str::to_string));

    // Only path segments carry a file extension worth stripping; a bare host
    // keeps its dots.
    let stem = match last_segment {
        Some(segment) => match segment.rsplit_once('.') {
            Some((stem, _ext)) if !stem.is_empty() => stem.to_string(),
            _ => segment,
        },
        None => url
            .host_str()
            .map(str::to_string)
            .unwrap_or_else(|| url.to_string()),
    };

    stem.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read the response body with a streaming size limit, stopping early once
/// the cap is exceeded.
async fn read_body_with_limit(
    response: reqwest::Response,
    max_size: usize,
) -> Result<Vec<u8>, FetchError> {
    let mut stream = response.bytes_stream();
    let mut buffer = Vec::new();
    let mut total = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(e.to_string())
            } else {
                FetchError::Request(e.to_string())
            }
        })?;
        total += chunk.len();
        if total > max_size {
            return Err(FetchError::TooLarge {
                size: total,
                max: max_size,
            });
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(buffer)
}
