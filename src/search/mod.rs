//! Web-search collaborator interface.
//!
//! The [`SearchProvider`] trait is the boundary the researcher step talks
//! through; [`TavilyClient`] in [`tavily`] is the shipped backend. An empty
//! result set is a valid outcome, not an error.

pub mod tavily;

pub use tavily::TavilyClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Search depth requested from the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    /// Fast search with basic results
    #[default]
    Basic,
    /// More thorough search with detailed results
    Advanced,
}

impl SearchDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchDepth::Basic => "basic",
            SearchDepth::Advanced => "advanced",
        }
    }
}

impl FromStr for SearchDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(SearchDepth::Basic),
            "advanced" => Ok(SearchDepth::Advanced),
            other => Err(format!("unknown search depth: {other}")),
        }
    }
}

/// A single hit returned by the search backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub content: String,
}

impl SearchHit {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Typed errors for search backends.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("unauthorized - check API key")]
    Unauthorized,

    #[error("rate limited - too many requests")]
    RateLimited,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("server error ({0}): {1}")]
    Server(u16, String),

    #[error("http error ({0}): {1}")]
    Http(u16, String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl SearchError {
    /// Transient failures worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SearchError::Timeout
                | SearchError::Connection(_)
                | SearchError::RateLimited
                | SearchError::Server(_, _)
        )
    }
}

/// Web-search collaborator.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run a query, returning at most `max_results` hits.
    async fn search(
        &self,
        query: &str,
        max_results: u32,
        depth: SearchDepth,
    ) -> Result<Vec<SearchHit>, SearchError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_parse() {
        assert_eq!("basic".parse::<SearchDepth>().unwrap(), SearchDepth::Basic);
        assert_eq!(
            "Advanced".parse::<SearchDepth>().unwrap(),
            SearchDepth::Advanced
        );
        assert!("deep".parse::<SearchDepth>().is_err());
    }

    #[test]
    fn test_depth_wire_format() {
        assert_eq!(SearchDepth::Basic.as_str(), "basic");
        assert_eq!(SearchDepth::Advanced.as_str(), "advanced");
    }

    #[test]
    fn test_error_retryability() {
        assert!(SearchError::Timeout.is_retryable());
        assert!(SearchError::Server(502, "bad gateway".into()).is_retryable());
        assert!(!SearchError::Unauthorized.is_retryable());
        assert!(!SearchError::BadRequest("bad query".into()).is_retryable());
    }
}
