//! OpenSearch search backend.
//!
//! Issues a `multi_match` query against one index and maps hits to
//! [`RetrievedDocument`]s. Authentication is left to the endpoint (a signing
//! proxy, or a cluster that trusts the network).

use super::SearchClient;
use crate::types::RetrievedDocument;
use kbchat_core::{AppError, AppResult};
use serde::Deserialize;
use std::time::Duration;

/// Fields searched, with content boosted over title and metadata.
const SEARCH_FIELDS: [&str; 3] = ["content^2", "title", "metadata"];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_score")]
    score: Option<f32>,
    #[serde(rename = "_source", default)]
    source: HitSource,
}

#[derive(Debug, Default, Deserialize)]
struct HitSource {
    #[serde(default)]
    content: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

/// Client for an OpenSearch index.
pub struct OpenSearchClient {
    endpoint: String,
    index: String,
    client: reqwest::Client,
}

impl OpenSearchClient {
    pub fn new(
        endpoint: impl Into<String>,
        index: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build search HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            index: index.into(),
            client,
        })
    }

    fn search_url(&self) -> String {
        format!("{}/{}/_search", self.endpoint, self.index)
    }

    fn query_body(query: &str, top_k: usize, min_score: f32) -> serde_json::Value {
        serde_json::json!({
            "size": top_k,
            "query": {
                "multi_match": {
                    "query": query,
                    "fields": SEARCH_FIELDS,
                    "type": "best_fields",
                    "fuzziness": "AUTO"
                }
            },
            "min_score": min_score
        })
    }

    fn convert_hits(response: SearchResponse) -> Vec<RetrievedDocument> {
        response
            .hits
            .hits
            .into_iter()
            .map(|hit| {
                let mut doc = RetrievedDocument::new(hit.source.content, hit.score.unwrap_or(0.0));
                doc.title = hit.source.title;
                if let Some(metadata) = hit.source.metadata {
                    doc.metadata = metadata;
                }
                doc
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl SearchClient for OpenSearchClient {
    fn backend_name(&self) -> &str {
        "opensearch"
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
    ) -> AppResult<Vec<RetrievedDocument>> {
        tracing::debug!(index = %self.index, top_k, min_score, "Querying OpenSearch");

        let response = self
            .client
            .post(self.search_url())
            .json(&Self::query_body(query, top_k, min_score))
            .send()
            .await
            .map_err(|e| AppError::Search(format!("Failed to reach OpenSearch: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Search(format!(
                "OpenSearch error ({}): {}",
                status, error_text
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Search(format!("Failed to parse OpenSearch response: {}", e)))?;

        let documents = Self::convert_hits(parsed);
        tracing::debug!(hits = documents.len(), "OpenSearch returned hits");

        Ok(documents)
    }
}
