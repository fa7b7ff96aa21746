use shopsearch_common::SearchConfig;
use std::sync::Arc;

use super::{Clause, FilterClause, StageClauses, TermGroup};
use crate::model::ConceptMatch;

const MATCH_BOOST: f32 = 2.0;
const PHRASE_BOOST: f32 = 5.0;

/// Pure assembly of base stage clauses from resolved concepts
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    config: Arc<SearchConfig>,
}

impl QueryBuilder {
    pub fn new(config: Arc<SearchConfig>) -> Self {
        Self { config }
    }

    /// Base (strict) clauses; relaxed stages are derived from these
    pub fn build(&self, concepts: &[ConceptMatch], free_text: &str) -> StageClauses {
        let mut filters = self.root_filters(concepts);
        if let Some(nested) = self.nested_filter(concepts) {
            filters.push(nested);
        }

        let (must, should) = self.text_clauses(free_text);

        StageClauses { filters, must, should }
    }

    fn is_nested(&self, concept_type: &str) -> bool {
        concept_type
            .strip_prefix(self.config.nested.skus.as_str())
            .is_some_and(|rest| rest.starts_with('.'))
    }

    fn root_filters(&self, concepts: &[ConceptMatch]) -> Vec<FilterClause> {
        group_by_type(concepts.iter().filter(|c| !self.is_nested(&c.concept_type)))
            .into_iter()
            .map(|(concept_type, terms)| FilterClause::Concept {
                group: TermGroup {
                    field: format!("{}.{}", concept_type, self.config.fields.keyword_suffix),
                    terms,
                },
                concept_type,
            })
            .collect()
    }

    fn nested_filter(&self, concepts: &[ConceptMatch]) -> Option<FilterClause> {
        let groups: Vec<TermGroup> =
            group_by_type(concepts.iter().filter(|c| self.is_nested(&c.concept_type)))
                .into_iter()
                .map(|(field, terms)| TermGroup { field, terms })
                .collect();

        if groups.is_empty() {
            return None;
        }

        Some(FilterClause::NestedSku {
            path: self.config.nested.skus.clone(),
            groups,
        })
    }

    fn text_clauses(&self, free_text: &str) -> (Vec<Clause>, Vec<Clause>) {
        let text = free_text.trim();
        if text.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let must = vec![Clause::Match {
            field: self.config.fields.name.clone(),
            query: text.to_string(),
            boost: MATCH_BOOST,
        }];
        let should = vec![Clause::MatchPhrase {
            field: self.config.fields.name_shingles.clone(),
            query: text.to_string(),
            boost: PHRASE_BOOST,
        }];

        (must, should)
    }
}

/// Groups original terms by concept type, in order of first appearance
fn group_by_type<'a>(
    concepts: impl Iterator<Item = &'a ConceptMatch>,
) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();

    for concept in concepts {
        let index = match groups.iter().position(|(t, _)| *t == concept.concept_type) {
            Some(index) => index,
            None => {
                groups.push((concept.concept_type.clone(), Vec::new()));
                groups.len() - 1
            }
        };

        let terms = &mut groups[index].1;
        if !terms.contains(&concept.original_term) {
            terms.push(concept.original_term.clone());
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::concept;
    use serde_json::json;

    fn builder() -> QueryBuilder {
        QueryBuilder::new(Arc::new(SearchConfig::default()))
    }

    #[test]
    fn test_scenario_strict_clauses() {
        let concepts = vec![
            concept("skus.color", "Black", &["black"]),
            concept("skus.size", "L", &["l"]),
        ];
        let clauses = builder().build(&concepts, "puma shorts");

        assert_eq!(clauses.filters.len(), 1);
        assert_eq!(
            clauses.filters[0].to_json(),
            json!({
                "nested": {
                    "path": "skus",
                    "query": { "bool": { "filter": [
                        { "bool": {
                            "should": [ { "term": { "skus.color": "Black" } } ],
                            "minimum_should_match": 1
                        }},
                        { "bool": {
                            "should": [ { "term": { "skus.size": "L" } } ],
                            "minimum_should_match": 1
                        }}
                    ]}}
                }
            })
        );
        assert_eq!(
            clauses.must,
            vec![Clause::Match {
                field: "name".into(),
                query: "puma shorts".into(),
                boost: 2.0,
            }]
        );
        assert_eq!(
            clauses.should,
            vec![Clause::MatchPhrase {
                field: "name.shingles".into(),
                query: "puma shorts".into(),
                boost: 5.0,
            }]
        );
    }

    #[test]
    fn test_root_concepts_grouped_by_type() {
        let concepts = vec![
            concept("brand", "Puma", &["puma"]),
            concept("category", "Shorts", &["shorts"]),
            concept("brand", "Nike", &["nike"]),
            concept("brand", "Puma", &["pma"]),
        ];
        let clauses = builder().build(&concepts, "");

        assert_eq!(clauses.filters.len(), 2);
        match &clauses.filters[0] {
            FilterClause::Concept { concept_type, group } => {
                assert_eq!(concept_type, "brand");
                assert_eq!(group.field, "brand.keyword");
                assert_eq!(group.terms, vec!["Puma", "Nike"]);
            }
            other => panic!("unexpected filter {:?}", other),
        }
        assert_eq!(clauses.filters[1].concept_type(), Some("category"));
        assert!(clauses.must.is_empty());
        assert!(clauses.should.is_empty());
    }

    #[test]
    fn test_nested_prefix_requires_separator() {
        let concepts = vec![concept("skusize", "XL", &["xl"])];
        let clauses = builder().build(&concepts, "");
        assert_eq!(clauses.filters[0].concept_type(), Some("skusize"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let concepts = vec![
            concept("category", "Jackets", &["jacket"]),
            concept("skus.color", "Red", &["red"]),
        ];
        let b = builder();
        assert_eq!(b.build(&concepts, "rain"), b.build(&concepts, "rain"));
    }

    #[test]
    fn test_blank_free_text_adds_no_text_clauses() {
        let clauses = builder().build(&[], "   ");
        assert!(clauses.is_empty());
    }
}
