//! Search collaborator abstraction.
//!
//! Every backing index implements the same capability, so the session never
//! cares which technology answered the query.

pub mod opensearch;

pub use opensearch::OpenSearchClient;

use crate::index::LocalIndex;
use crate::types::RetrievedDocument;
use kbchat_core::config::SearchConfig;
use kbchat_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Default request timeout for remote search backends.
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A document index that can be queried for a turn.
///
/// Backends may filter by `min_score` and limit by `top_k` upstream, but
/// callers must not rely on it: the relevance gate re-applies both.
#[async_trait::async_trait]
pub trait SearchClient: Send + Sync {
    /// Backend name for logging (e.g., "opensearch", "local").
    fn backend_name(&self) -> &str;

    /// Find documents relevant to `query`.
    ///
    /// Errors are `AppError::Search` when the backend is unreachable or
    /// returns something unparseable.
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
    ) -> AppResult<Vec<RetrievedDocument>>;
}

/// Build the search client named by the configuration.
pub fn create_search_client(config: &AppConfig) -> AppResult<Arc<dyn SearchClient>> {
    match &config.search {
        SearchConfig::Local { .. } => {
            let path = config.local_index_path().ok_or_else(|| {
                AppError::Config("Local search backend has no index path".to_string())
            })?;
            Ok(Arc::new(LocalIndex::open(&path)?))
        }
        SearchConfig::OpenSearch {
            endpoint,
            index,
            timeout_secs,
        } => {
            let timeout = timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SEARCH_TIMEOUT);
            Ok(Arc::new(OpenSearchClient::new(endpoint, index, timeout)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_local_client() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.workspace = temp_dir.path().to_path_buf();

        let client = create_search_client(&config).unwrap();
        assert_eq!(client.backend_name(), "local");
        assert!(temp_dir.path().join(".kbchat/documents.db").exists());
    }

    #[test]
    fn test_create_opensearch_client() {
        let mut config = AppConfig::default();
        config.search = SearchConfig::OpenSearch {
            endpoint: "https://search.example.com".to_string(),
            index: "kb".to_string(),
            timeout_secs: Some(5),
        };

        let client = create_search_client(&config).unwrap();
        assert_eq!(client.backend_name(), "opensearch");
    }
}
