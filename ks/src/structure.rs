//! Structural knowledge source - code graph queries
//!
//! The graph service indexes a codebase as components and relationships.
//! `GraphClient` speaks a small JSON protocol to it; the trait exists so
//! verification logic can run against in-memory fixtures in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::error::SourceError;
use crate::types::{DependencyView, SimilarMatch, StructureView};

/// Structural queries against a code graph
///
/// Implementations must be safe for concurrent use and must tolerate
/// callers abandoning in-flight queries (cancellation drops the future,
/// nothing more).
#[async_trait]
pub trait StructureSource: Send + Sync {
    /// Query components and relationships, restricted to `scope` names.
    ///
    /// An empty scope means unrestricted (the service applies its own
    /// relevance cap).
    async fn query_structure(&self, scope: &[String]) -> Result<StructureView, SourceError>;

    /// Get upstream and downstream dependencies of a single component
    async fn get_dependencies(&self, component: &str) -> Result<DependencyView, SourceError>;

    /// Rank features similar to the given free-text description
    async fn search_similar(&self, text: &str, limit: usize) -> Result<Vec<SimilarMatch>, SourceError>;
}

/// HTTP client for the code-graph service
pub struct GraphClient {
    base_url: String,
    http: Client,
}

impl GraphClient {
    /// Create a client with a per-call timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let base_url = base_url.into();
        debug!(%base_url, ?timeout, "GraphClient::new: called");
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, http })
    }

    /// Check whether the graph service is reachable and healthy
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.http.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(error = %e, "GraphClient::health_check: unreachable");
                false
            }
        }
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.post(&url).json(&body).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SourceError::InvalidResponse(format!("{}: {}", status, text)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl StructureSource for GraphClient {
    async fn query_structure(&self, scope: &[String]) -> Result<StructureView, SourceError> {
        debug!(scope_len = scope.len(), "GraphClient::query_structure: called");
        self.post_json("/structure", json!({ "scope": scope })).await
    }

    async fn get_dependencies(&self, component: &str) -> Result<DependencyView, SourceError> {
        debug!(%component, "GraphClient::get_dependencies: called");
        self.post_json("/dependencies", json!({ "component": component })).await
    }

    async fn search_similar(&self, text: &str, limit: usize) -> Result<Vec<SimilarMatch>, SourceError> {
        debug!(text_len = text.len(), %limit, "GraphClient::search_similar: called");
        self.post_json("/similar", json!({ "text": text, "limit": limit })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_client_construction() {
        let client = GraphClient::new("http://localhost:3006", Duration::from_secs(30));
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_graph_is_connection_error() {
        // Port 1 is never listening; reqwest reports a connect error
        let client = GraphClient::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();

        let result = client.query_structure(&[]).await;
        match result {
            Err(e) => assert!(e.is_connection(), "expected connection error, got {:?}", e),
            Ok(_) => panic!("expected error from unreachable service"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_graph_health_check_false() {
        let client = GraphClient::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
        assert!(!client.health_check().await);
    }
}
