//! Request, result and response types of the product search pipeline

use serde::{Deserialize, Deserializer, Serialize};
use shopsearch_common::{config::RequestConfig, AppError, Result};
use std::collections::BTreeMap;

/// Public search request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Free-text query; absent or blank yields the empty outcome
    pub query_text: Option<String>,

    /// Page size
    pub size: Option<u32>,

    /// Zero-based page number
    pub page: Option<u32>,
}

impl SearchRequest {
    pub fn new(query_text: impl Into<String>) -> Self {
        Self {
            query_text: Some(query_text.into()),
            ..Self::default()
        }
    }

    /// Trimmed query text, `None` when absent or blank
    pub fn query(&self) -> Option<&str> {
        self.query_text
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    /// Rejects an explicit zero page size
    pub fn validate(&self) -> Result<()> {
        if self.size == Some(0) {
            return Err(AppError::Validation {
                message: "size must be greater than zero".to_string(),
                field: Some("size".to_string()),
            });
        }
        Ok(())
    }

    /// Effective page window with configured fallbacks
    pub fn pagination(&self, defaults: &RequestConfig) -> Pagination {
        let size = self.size.unwrap_or(defaults.default_size);
        let page = self.page.unwrap_or(defaults.default_page);
        Pagination {
            from: u64::from(size) * u64::from(page),
            size,
        }
    }
}

/// Offset and page size sent to the document index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub from: u64,
    pub size: u32,
}

/// A query token recognised by the concept index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptMatch {
    /// Root field name (`brand`) or nested field (`skus.color`)
    #[serde(rename = "type")]
    pub concept_type: String,

    /// Canonical value as stored on product documents
    pub original_term: String,

    /// Lower-cased lookup terms that resolve to this concept
    #[serde(default)]
    pub search_terms: Vec<String>,
}

impl ConceptMatch {
    pub fn matches_token(&self, token: &str) -> bool {
        self.search_terms.iter().any(|term| term == token)
    }
}

/// Minimal projection handed to the semantic ranker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateDoc {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuView {
    #[serde(default, deserialize_with = "scalar_text")]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub size: Option<String>,
}

/// Product as returned to callers.
///
/// Decoding is lenient: null lists become empty and numeric or boolean
/// values of text fields are stringified, so a hit is never dropped over
/// the shape of a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductView {
    #[serde(default, deserialize_with = "scalar_text")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub skus: Vec<SkuView>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    Flag(bool),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Signed(n) => n.to_string(),
            Scalar::Unsigned(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Flag(b) => b.to_string(),
        }
    }
}

fn scalar_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(Scalar::into_text))
}

/// Null list or null entries decode as absent
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items = Option::<Vec<Option<T>>>::deserialize(deserializer)?;
    Ok(items.into_iter().flatten().flatten().collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetBucket {
    pub value: String,
    pub count: u64,
}

/// Facet name to ordered buckets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacetSet(BTreeMap<String, Vec<FacetBucket>>);

impl FacetSet {
    pub fn insert(&mut self, name: impl Into<String>, buckets: Vec<FacetBucket>) {
        self.0.insert(name.into(), buckets);
    }

    pub fn get(&self, name: &str) -> Option<&[FacetBucket]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Output of one stage attempt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageResult {
    pub products: Vec<ProductView>,
    pub total_hits: u64,
    pub facets: FacetSet,
}

impl StageResult {
    /// Stages advance on zero mapped products, not on zero total hits
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Fixed user-facing messages, one per terminal outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMessage {
    StrictSuccess,
    CategoryRelaxedSuccess,
    SemanticSuccess,
    NoResults,
}

impl SearchMessage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMessage::StrictSuccess => "Here's what we found for your search",
            SearchMessage::CategoryRelaxedSuccess => {
                "No matches with your filters, here are some suggestions"
            }
            SearchMessage::SemanticSuccess => {
                "Here are the closest matches we found for your search"
            }
            SearchMessage::NoResults => "We couldn't find any products matching your request",
        }
    }
}

/// Public search response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub total_hits: u64,
    pub message: String,
    pub products: Vec<ProductView>,
    pub facets: FacetSet,
}

impl SearchOutcome {
    /// Zero-result outcome with the no-results message
    pub fn empty() -> Self {
        Self {
            total_hits: 0,
            message: SearchMessage::NoResults.as_str().to_string(),
            products: Vec::new(),
            facets: FacetSet::default(),
        }
    }

    pub fn from_stage(message: SearchMessage, result: StageResult) -> Self {
        Self {
            total_hits: result.total_hits,
            message: message.as_str().to_string(),
            products: result.products,
            facets: result.facets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_query_treated_as_absent() {
        assert_eq!(SearchRequest::default().query(), None);
        assert_eq!(SearchRequest::new("   ").query(), None);
        assert_eq!(SearchRequest::new(" puma shorts ").query(), Some("puma shorts"));
    }

    #[test]
    fn test_pagination_defaults_and_offset() {
        let defaults = RequestConfig::default();

        let page = SearchRequest::new("jacket").pagination(&defaults);
        assert_eq!(page, Pagination { from: 0, size: 10 });

        let request = SearchRequest {
            query_text: Some("jacket".into()),
            size: Some(5),
            page: Some(3),
        };
        assert_eq!(request.pagination(&defaults), Pagination { from: 15, size: 5 });
    }

    #[test]
    fn test_zero_size_is_a_validation_error() {
        let request = SearchRequest {
            size: Some(0),
            ..SearchRequest::new("jacket")
        };
        match request.validate() {
            Err(AppError::Validation { field, .. }) => assert_eq!(field.as_deref(), Some("size")),
            other => panic!("unexpected result {:?}", other),
        }
        assert!(SearchRequest::new("jacket").validate().is_ok());
    }

    #[test]
    fn test_product_decoding_tolerates_field_shapes() {
        let product: ProductView = serde_json::from_value(json!({
            "name": "Tee",
            "skus": [ { "color": "White", "size": 42 }, null, { "size": 9.5 } ]
        }))
        .unwrap();
        assert_eq!(product.skus.len(), 2);
        assert_eq!(product.skus[0].size.as_deref(), Some("42"));
        assert_eq!(product.skus[1].size.as_deref(), Some("9.5"));
        assert_eq!(product.skus[1].color, None);

        let product: ProductView =
            serde_json::from_value(json!({ "name": "Cap", "skus": null, "brand": null })).unwrap();
        assert!(product.skus.is_empty());
        assert_eq!(product.brand, None);
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let request: SearchRequest =
            serde_json::from_value(json!({ "queryText": "puma", "size": 2 })).unwrap();
        assert_eq!(request.query(), Some("puma"));
        assert_eq!(request.size, Some(2));
        assert_eq!(request.page, None);
    }

    #[test]
    fn test_concept_match_wire_format() {
        let concept: ConceptMatch = serde_json::from_value(json!({
            "search_terms": ["black", "blk"],
            "original_term": "Black",
            "type": "skus.color"
        }))
        .unwrap();
        assert_eq!(concept.concept_type, "skus.color");
        assert!(concept.matches_token("blk"));
        assert!(!concept.matches_token("Black"));
    }

    #[test]
    fn test_empty_outcome_shape() {
        let value = serde_json::to_value(SearchOutcome::empty()).unwrap();
        assert_eq!(value["totalHits"], 0);
        assert_eq!(value["products"], json!([]));
        assert_eq!(value["facets"], json!({}));
        assert_eq!(value["message"], SearchMessage::NoResults.as_str());
    }

    #[test]
    fn test_stage_messages_are_distinct() {
        let messages = [
            SearchMessage::StrictSuccess,
            SearchMessage::CategoryRelaxedSuccess,
            SearchMessage::SemanticSuccess,
            SearchMessage::NoResults,
        ];
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a.as_str(), b.as_str());
            }
        }
    }
}
