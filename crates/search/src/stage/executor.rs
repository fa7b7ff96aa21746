//! Single-query execution against the document index

use async_trait::async_trait;
use serde_json::{json, Value};
use shopsearch_common::{elastic::SearchResponse, errors::Result, ElasticClient, SearchConfig};
use std::sync::Arc;

use crate::mapper;
use crate::model::{CandidateDoc, Pagination, StageResult};
use crate::query::StageClauses;

/// Fully formed request for the product collection
#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    pub query: Value,
    pub from: u64,
    pub size: u32,
    pub aggregations: Option<Value>,
    /// Source fields to return; `None` returns the whole document
    pub source: Option<Vec<String>>,
}

impl ProductQuery {
    /// Request body, sorted by relevance score descending
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "from": self.from,
            "size": self.size,
            "query": self.query,
            "sort": [ { "_score": { "order": "desc" } } ],
        });

        if let Some(aggs) = &self.aggregations {
            body["aggs"] = aggs.clone();
        }
        if let Some(fields) = &self.source {
            body["_source"] = json!(fields);
        }

        body
    }
}

/// Read access to the product collection
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    async fn search(&self, query: &ProductQuery) -> Result<SearchResponse>;
}

/// Document index backed by Elasticsearch
pub struct ElasticDocumentIndex {
    client: ElasticClient,
    config: Arc<SearchConfig>,
}

impl ElasticDocumentIndex {
    pub fn new(client: ElasticClient, config: Arc<SearchConfig>) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl DocumentIndex for ElasticDocumentIndex {
    async fn search(&self, query: &ProductQuery) -> Result<SearchResponse> {
        let body = query.to_body();
        tracing::debug!(query = %body, "Product query");
        self.client.search(&self.config.index.product_index, &body).await
    }
}

/// Runs stage queries and maps their responses
#[derive(Clone)]
pub struct StageExecutor {
    index: Arc<dyn DocumentIndex>,
    config: Arc<SearchConfig>,
}

impl StageExecutor {
    pub fn new(index: Arc<dyn DocumentIndex>, config: Arc<SearchConfig>) -> Self {
        Self { index, config }
    }

    /// One page of products with facets. Index failures are returned as-is, never retried.
    pub async fn execute(&self, clauses: &StageClauses, page: Pagination) -> Result<StageResult> {
        let query = ProductQuery {
            query: clauses.to_query(),
            from: page.from,
            size: page.size,
            aggregations: Some(self.facet_aggregations(page.size)),
            source: None,
        };

        self.run(&query).await
    }

    /// Exact id lookup without text scoring, hits reordered to follow `ids`
    pub async fn execute_ids(&self, ids: &[String], page: Pagination) -> Result<StageResult> {
        let query = ProductQuery {
            query: json!({ "ids": { "values": ids } }),
            from: page.from,
            size: page.size,
            aggregations: Some(self.facet_aggregations(page.size)),
            source: None,
        };

        let mut response = self.index.search(&query).await?;
        response
            .hits
            .hits
            .sort_by_key(|hit| ids.iter().position(|id| *id == hit.id).unwrap_or(usize::MAX));

        Ok(mapper::to_stage_result(response, &self.config.aggregation))
    }

    /// Id and name of every product in scope, up to the candidate pool size
    pub async fn fetch_candidates(&self, scope: &StageClauses) -> Result<Vec<CandidateDoc>> {
        let query = ProductQuery {
            query: scope.to_query(),
            from: 0,
            size: self.config.request.candidate_pool_size,
            aggregations: None,
            source: Some(vec![self.config.fields.name.clone()]),
        };

        let response = self.index.search(&query).await?;
        Ok(mapper::to_candidates(response, &self.config.fields.name))
    }

    async fn run(&self, query: &ProductQuery) -> Result<StageResult> {
        let response = self.index.search(query).await?;
        Ok(mapper::to_stage_result(response, &self.config.aggregation))
    }

    fn facet_aggregations(&self, size: u32) -> Value {
        let agg = &self.config.aggregation;
        json!({
            agg.brand.as_str(): {
                "terms": {
                    "field": self.config.fields.brand_keyword,
                    "size": size,
                    "order": [ { "_count": "desc" }, { "_key": "asc" } ]
                }
            },
            agg.price_ranges.as_str(): {
                "range": {
                    "field": self.config.fields.price,
                    "ranges": [
                        { "key": agg.cheap, "to": agg.cheap_price },
                        { "key": agg.average, "from": agg.cheap_price, "to": agg.expensive_price },
                        { "key": agg.expensive, "from": agg.expensive_price }
                    ]
                }
            }
        })
    }
}
