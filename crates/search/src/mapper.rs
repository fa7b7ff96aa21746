//! Raw index responses to public result shapes

use serde_json::Value;
use shopsearch_common::{config::AggregationConfig, elastic::SearchResponse};

use crate::model::{CandidateDoc, FacetBucket, FacetSet, ProductView, StageResult};

/// Products, total hits and facets of one executed query
pub fn to_stage_result(response: SearchResponse, aggregation: &AggregationConfig) -> StageResult {
    let total_hits = response.total_hits();
    let facets = map_facets(&response, aggregation);
    let products = map_products(response);

    StageResult {
        products,
        total_hits,
        facets,
    }
}

/// Decodable sources in hit order; missing or malformed sources are dropped
pub fn map_products(response: SearchResponse) -> Vec<ProductView> {
    response
        .hits
        .hits
        .into_iter()
        .filter_map(|hit| {
            let source = hit.source?;
            serde_json::from_value::<ProductView>(source)
                .map_err(|e| {
                    tracing::warn!(id = %hit.id, error = %e, "Skipping undecodable product");
                })
                .ok()
        })
        .collect()
}

/// Id and name projection for the ranker prompt
pub fn to_candidates(response: SearchResponse, name_field: &str) -> Vec<CandidateDoc> {
    response
        .hits
        .hits
        .into_iter()
        .filter_map(|hit| {
            let name = hit.source.as_ref()?.get(name_field)?.as_str()?.to_string();
            Some(CandidateDoc { id: hit.id, name })
        })
        .collect()
}

pub fn map_facets(response: &SearchResponse, aggregation: &AggregationConfig) -> FacetSet {
    let mut facets = FacetSet::default();

    if let Some(brand) = response.aggregation(&aggregation.brand) {
        facets.insert(aggregation.brand.clone(), buckets(brand));
    }

    if let Some(ranges) = response.aggregation(&aggregation.price_ranges) {
        let found = buckets(ranges);
        let fixed = aggregation
            .price_labels()
            .iter()
            .map(|label| FacetBucket {
                value: label.to_string(),
                count: found
                    .iter()
                    .find(|b| b.value == *label)
                    .map(|b| b.count)
                    .unwrap_or(0),
            })
            .collect();
        facets.insert(aggregation.price_ranges.clone(), fixed);
    }

    facets
}

fn buckets(aggregation: &Value) -> Vec<FacetBucket> {
    aggregation
        .get("buckets")
        .and_then(Value::as_array)
        .map(|buckets| {
            buckets
                .iter()
                .filter_map(|bucket| {
                    let value = match bucket.get("key")? {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    let count = bucket.get("doc_count").and_then(Value::as_u64).unwrap_or(0);
                    Some(FacetBucket { value, count })
                })
                .collect()
        })
        .unwrap_or_default()
}
