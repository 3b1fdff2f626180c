//! Retrieval backend port
//!
//! Boundary to the passage-retrieval collaborator: a query goes in, ranked
//! passages come back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One retrieved passage with its relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    pub score: f64,
}

/// Errors from the retrieval backend
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Retrieval backend request failed: {0}")]
    Backend(String),

    #[error("Retrieval backend returned a malformed response: {0}")]
    Malformed(String),
}

/// Port to the retrieval backend
#[async_trait]
pub trait RetrievalPort: Send + Sync {
    /// Search for passages relevant to `query`.
    ///
    /// Returns at most `max_results` passages scoring at least `min_score`,
    /// ordered by descending relevance.
    async fn search(
        &self,
        query: &str,
        min_score: f64,
        max_results: usize,
    ) -> Result<Vec<Passage>, RetrievalError>;
}
