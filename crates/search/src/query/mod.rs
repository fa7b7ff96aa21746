//! Structured query clauses
//!
//! Stage queries are assembled from three ordered clause lists:
//! - filters: concept groups and the nested SKU filter (non-scoring)
//! - must: the free-text name match
//! - should: the shingled phrase boost

mod builder;

pub use builder::QueryBuilder;

use serde_json::{json, Value};

/// Scoring clause over a text field
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// All terms required
    Match { field: String, query: String, boost: f32 },
    /// Exact adjacency of the terms
    MatchPhrase { field: String, query: String, boost: f32 },
}

impl Clause {
    pub fn to_json(&self) -> Value {
        match self {
            Clause::Match { field, query, boost } => json!({
                "match": {
                    field.as_str(): { "query": query, "operator": "and", "boost": boost }
                }
            }),
            Clause::MatchPhrase { field, query, boost } => json!({
                "match_phrase": {
                    field.as_str(): { "query": query, "boost": boost }
                }
            }),
        }
    }
}

/// Exact values accepted for one field, any of which may match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermGroup {
    pub field: String,
    pub terms: Vec<String>,
}

impl TermGroup {
    fn to_json(&self) -> Value {
        let terms: Vec<Value> = self
            .terms
            .iter()
            .map(|term| json!({ "term": { self.field.as_str(): term } }))
            .collect();

        json!({ "bool": { "should": terms, "minimum_should_match": 1 } })
    }
}

/// Non-scoring restriction derived from resolved concepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterClause {
    /// Root-level concept type, terms OR'd
    Concept {
        concept_type: String,
        group: TermGroup,
    },
    /// SKU sub-document restriction; groups AND'd inside one nested scope
    NestedSku {
        path: String,
        groups: Vec<TermGroup>,
    },
}

impl FilterClause {
    pub fn concept_type(&self) -> Option<&str> {
        match self {
            FilterClause::Concept { concept_type, .. } => Some(concept_type),
            FilterClause::NestedSku { .. } => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FilterClause::Concept { group, .. } => group.to_json(),
            FilterClause::NestedSku { path, groups } => {
                let filters: Vec<Value> = groups.iter().map(TermGroup::to_json).collect();
                json!({
                    "nested": {
                        "path": path,
                        "query": { "bool": { "filter": filters } }
                    }
                })
            }
        }
    }
}

/// Inputs to one stage's query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageClauses {
    pub filters: Vec<FilterClause>,
    pub must: Vec<Clause>,
    pub should: Vec<Clause>,
}

impl StageClauses {
    /// Same text clauses, filters reduced to the category group
    pub fn category_only(&self, category_type: &str) -> StageClauses {
        StageClauses {
            filters: self
                .filters
                .iter()
                .filter(|f| f.concept_type() == Some(category_type))
                .cloned()
                .collect(),
            must: self.must.clone(),
            should: self.should.clone(),
        }
    }

    /// Filters only, text clauses dropped
    pub fn filter_scope(&self) -> StageClauses {
        StageClauses {
            filters: self.filters.clone(),
            must: Vec::new(),
            should: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.must.is_empty() && self.should.is_empty()
    }

    /// Boolean query tree, or match-all when there is nothing to restrict on
    pub fn to_query(&self) -> Value {
        if self.is_empty() {
            return json!({ "match_all": {} });
        }

        let mut bool_query = serde_json::Map::new();
        if !self.filters.is_empty() {
            bool_query.insert(
                "filter".to_string(),
                Value::Array(self.filters.iter().map(FilterClause::to_json).collect()),
            );
        }
        if !self.must.is_empty() {
            bool_query.insert(
                "must".to_string(),
                Value::Array(self.must.iter().map(Clause::to_json).collect()),
            );
        }
        if !self.should.is_empty() {
            bool_query.insert(
                "should".to_string(),
                Value::Array(self.should.iter().map(Clause::to_json).collect()),
            );
        }

        json!({ "bool": bool_query })
    }
}
