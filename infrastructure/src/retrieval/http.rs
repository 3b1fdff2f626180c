//! HTTP retrieval backend
//!
//! Thin typed client for a ranked-passage retrieval service: a query plus a
//! score threshold and result cap go in, ordered `{content, score}` pairs
//! come out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use callsheet_application::ports::retrieval::{Passage, RetrievalError, RetrievalPort};

/// Retrieval backend reached over HTTP.
pub struct HttpRetrievalBackend {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    min_score: f64,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<PassageDto>,
}

#[derive(Deserialize)]
struct PassageDto {
    content: String,
    score: f64,
}

impl HttpRetrievalBackend {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl RetrievalPort for HttpRetrievalBackend {
    async fn search(
        &self,
        query: &str,
        min_score: f64,
        max_results: usize,
    ) -> Result<Vec<Passage>, RetrievalError> {
        let request = SearchRequest {
            query,
            min_score,
            max_results,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| RetrievalError::Backend(e.to_string()))?
            .error_for_status()
            .map_err(|e| RetrievalError::Backend(e.to_string()))?;

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Malformed(e.to_string()))?;

        Ok(body
            .results
            .into_iter()
            .map(|dto| Passage {
                content: dto.content,
                score: dto.score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_shape() {
        let request = SearchRequest {
            query: "Curtis Clark",
            min_score: 0.4,
            max_results: 5,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["query"], "Curtis Clark");
        assert_eq!(json["min_score"], 0.4);
        assert_eq!(json["max_results"], 5);
    }

    #[test]
    fn test_search_response_tolerates_missing_results() {
        let body: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(body.results.is_empty());
    }
}
