//! Tavily search client.
//!
//! Talks to the Tavily Search API over HTTP. Transient failures (timeouts,
//! connect errors, rate limits, 5xx) are retried with exponential backoff
//! before surfacing as a [`SearchError`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{SearchDepth, SearchError, SearchHit, SearchProvider};

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Client for the Tavily Search API.
pub struct TavilyClient {
    api_key: String,
    base_url: String,
    client: Client,
    timeout: Duration,
    max_retries: u32,
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: MAX_RETRIES,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/search", self.base_url.trim_end_matches('/'))
    }

    async fn execute_with_retry(
        &self,
        request: &TavilyRequest<'_>,
    ) -> Result<TavilyResponse, SearchError> {
        let mut last_error = SearchError::Network("no attempts made".to_string());

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(RETRY_BASE_DELAY_MS * 2u64.pow(attempt - 1));
                debug!(attempt, delay_ms = delay.as_millis(), "retrying search request");
                tokio::time::sleep(delay).await;
            }

            match self.execute_single_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    warn!(attempt, error = %e, "search request failed, will retry");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    async fn execute_single_request(
        &self,
        request: &TavilyRequest<'_>,
    ) -> Result<TavilyResponse, SearchError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout
                } else if e.is_connect() {
                    SearchError::Connection(e.to_string())
                } else {
                    SearchError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| SearchError::Malformed(e.to_string()));
        }

        let error_text = response.text().await.unwrap_or_default();

        match status.as_u16() {
            400 => Err(SearchError::BadRequest(error_text)),
            401 => Err(SearchError::Unauthorized),
            429 => Err(SearchError::RateLimited),
            500..=599 => Err(SearchError::Server(status.as_u16(), error_text)),
            _ => Err(SearchError::Http(status.as_u16(), error_text)),
        }
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: u32,
    search_depth: &'static str,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
    title: String,
    content: String,
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(
        &self,
        query: &str,
        max_results: u32,
        depth: SearchDepth,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let request = TavilyRequest {
            query,
            max_results,
            search_depth: depth.as_str(),
        };

        let response = self.execute_with_retry(&request).await?;

        // The cap is part of the contract even if the backend over-returns.
        let hits = response
            .results
            .into_iter()
            .take(max_results as usize)
            .map(|r| SearchHit::new(r.url, r.title, r.content))
            .collect();

        Ok(hits)
    }

    fn name(&self) -> &str {
        "tavily"
    }
}
