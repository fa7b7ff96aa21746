//! Concept resolution
//!
//! Classifies query tokens into known vocabulary (brand, category, color,
//! size) through the concept index and keeps the rest as free text.

use async_trait::async_trait;
use serde_json::json;
use shopsearch_common::{config::SearchConfig, errors::Result, ElasticClient};
use std::sync::Arc;

use crate::model::ConceptMatch;

/// Upper bound of concept documents returned for one query
const CONCEPT_LOOKUP_SIZE: usize = 100;

/// Exact-term lookup of query tokens
#[async_trait]
pub trait ConceptIndex: Send + Sync {
    /// Concepts whose lookup terms contain any of the tokens
    async fn lookup(&self, tokens: &[String]) -> Result<Vec<ConceptMatch>>;
}

/// Concept index backed by an Elasticsearch collection
pub struct ElasticConceptIndex {
    client: ElasticClient,
    config: Arc<SearchConfig>,
}

impl ElasticConceptIndex {
    pub fn new(client: ElasticClient, config: Arc<SearchConfig>) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ConceptIndex for ElasticConceptIndex {
    async fn lookup(&self, tokens: &[String]) -> Result<Vec<ConceptMatch>> {
        let body = json!({
            "size": CONCEPT_LOOKUP_SIZE,
            "query": {
                "terms": { self.config.index.search_terms_field.as_str(): tokens }
            }
        });

        tracing::debug!(query = %body, "Concept lookup");

        let response = self
            .client
            .search(&self.config.index.concept_index, &body)
            .await?;

        let concepts = response
            .hits
            .hits
            .into_iter()
            .filter_map(|hit| {
                let source = hit.source?;
                match serde_json::from_value::<ConceptMatch>(source) {
                    Ok(concept) => Some(concept),
                    Err(e) => {
                        tracing::warn!(
                            id = %hit.id,
                            error = %e,
                            "Skipping malformed concept document"
                        );
                        None
                    }
                }
            })
            .collect();

        Ok(concepts)
    }
}

/// Concepts plus the unconsumed remainder of the query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub concepts: Vec<ConceptMatch>,
    pub free_text: String,
}

/// Lower-cased whitespace tokens in query order
pub fn tokenize(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

/// Tokens no concept consumed, joined with single spaces in original order
pub fn free_text(tokens: &[String], concepts: &[ConceptMatch]) -> String {
    tokens
        .iter()
        .filter(|token| !concepts.iter().any(|c| c.matches_token(token)))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves a raw query into concepts and free text
pub struct ConceptResolver {
    index: Arc<dyn ConceptIndex>,
}

impl ConceptResolver {
    pub fn new(index: Arc<dyn ConceptIndex>) -> Self {
        Self { index }
    }

    /// One concept index read per request; a failed read fails the request
    pub async fn resolve(&self, query: &str) -> Result<Resolution> {
        let tokens = tokenize(query);
        if tokens.is_empty() {
            return Ok(Resolution::default());
        }

        let concepts = self.index.lookup(&tokens).await?;
        let free_text = free_text(&tokens, &concepts);

        tracing::debug!(
            concepts = concepts.len(),
            free_text = %free_text,
            "Query resolved"
        );

        Ok(Resolution { concepts, free_text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{concept, StaticConceptIndex};
    use shopsearch_common::AppError;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        assert_eq!(tokenize("Puma  Shorts\tBLACK L"), vec!["puma", "shorts", "black", "l"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_free_text_keeps_order_of_unmatched_tokens() {
        let tokens = tokenize("puma running shorts black");
        let concepts = vec![
            concept("brand", "Puma", &["puma"]),
            concept("skus.color", "Black", &["black"]),
        ];
        assert_eq!(free_text(&tokens, &concepts), "running shorts");
    }

    #[test]
    fn test_token_matched_by_several_concepts_consumed_once() {
        let tokens = tokenize("orange shorts");
        let concepts = vec![
            concept("skus.color", "Orange", &["orange"]),
            concept("brand", "Orange", &["orange"]),
        ];
        assert_eq!(free_text(&tokens, &concepts), "shorts");
    }

    #[tokio::test]
    async fn test_resolve_scenario_query() {
        let index = Arc::new(StaticConceptIndex::new(vec![
            concept("skus.color", "Black", &["black"]),
            concept("skus.size", "L", &["l"]),
            concept("skus.color", "Blue", &["blue"]),
        ]));
        let resolver = ConceptResolver::new(index.clone());

        let resolution = assert_ok!(resolver.resolve("puma shorts black L").await);
        assert_eq!(resolution.free_text, "puma shorts");
        assert_eq!(resolution.concepts.len(), 2);
        assert_eq!(index.calls(), 1);
        assert_eq!(index.last_tokens(), vec!["puma", "shorts", "black", "l"]);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_fatal() {
        let resolver = ConceptResolver::new(Arc::new(StaticConceptIndex::failing()));
        let err = assert_err!(resolver.resolve("jacket").await);
        assert!(matches!(err, AppError::UpstreamUnavailable { .. }));
    }
}
