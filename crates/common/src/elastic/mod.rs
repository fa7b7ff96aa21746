//! Elasticsearch REST client
//!
//! Thin wrapper over `_search` shared by every request. The underlying
//! `reqwest::Client` pools connections and is safe to use concurrently.

use crate::config::ElasticsearchConfig;
use crate::errors::{AppError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

const SERVICE: &str = "elasticsearch";

/// Decoded `_search` response envelope
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Hits,

    #[serde(default)]
    pub aggregations: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub total: Option<TotalHits>,

    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TotalHits {
    pub value: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_source", default)]
    pub source: Option<Value>,
}

impl SearchResponse {
    /// Total hit count, or 0 when the cluster reports none
    pub fn total_hits(&self) -> u64 {
        self.hits.total.as_ref().map(|t| t.value).unwrap_or(0)
    }

    /// Named aggregation, if present
    pub fn aggregation(&self, name: &str) -> Option<&Value> {
        self.aggregations.as_ref().and_then(|aggs| aggs.get(name))
    }
}

/// Elasticsearch client
#[derive(Debug, Clone)]
pub struct ElasticClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl ElasticClient {
    /// Create a new client from configuration
    pub fn new(config: &ElasticsearchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            credentials: config
                .credentials()
                .map(|(user, pass)| (user.to_string(), pass.to_string())),
        })
    }

    /// Run a search body against an index
    pub async fn search(&self, index: &str, body: &Value) -> Result<SearchResponse> {
        let url = format!("{}/{}/_search", self.base_url, index);

        let mut request = self.client.post(&url).json(body);
        if let Some((user, pass)) = &self.credentials {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(index = %index, error = %e, "Search request failed");
            AppError::unavailable(SERVICE, e)
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(index = %index, status = status.as_u16(), "Search rejected");
            return Err(AppError::unavailable(
                SERVICE,
                format!("API error {}: {}", status, body),
            ));
        }

        response.json::<SearchResponse>().await.map_err(|e| {
            AppError::unavailable(SERVICE, format!("Failed to parse response: {}", e))
        })
    }
}
