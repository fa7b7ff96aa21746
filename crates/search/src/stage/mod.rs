//! Search stages
//!
//! Stages run in a fixed order and the first one producing at least one
//! product answers the request:
//!
//! ```text
//! Strict -> CategoryRelaxed -> Semantic -> Empty
//! ```

mod executor;
mod pipeline;

pub use executor::{DocumentIndex, ElasticDocumentIndex, ProductQuery, StageExecutor};
pub use pipeline::SearchPipeline;

use std::fmt;

use crate::model::SearchMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStage {
    /// All concept filters plus the free-text clauses
    Strict,
    /// Only the category filter group is kept
    CategoryRelaxed,
    /// Language-model ranking over the category scope
    Semantic,
    /// Terminal, nothing matched
    Empty,
}

impl SearchStage {
    pub fn next(self) -> SearchStage {
        match self {
            SearchStage::Strict => SearchStage::CategoryRelaxed,
            SearchStage::CategoryRelaxed => SearchStage::Semantic,
            SearchStage::Semantic | SearchStage::Empty => SearchStage::Empty,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == SearchStage::Empty
    }

    /// Message reported when this stage answers the request
    pub fn message(self) -> SearchMessage {
        match self {
            SearchStage::Strict => SearchMessage::StrictSuccess,
            SearchStage::CategoryRelaxed => SearchMessage::CategoryRelaxedSuccess,
            SearchStage::Semantic => SearchMessage::SemanticSuccess,
            SearchStage::Empty => SearchMessage::NoResults,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SearchStage::Strict => "strict",
            SearchStage::CategoryRelaxed => "category_relaxed",
            SearchStage::Semantic => "semantic",
            SearchStage::Empty => "empty",
        }
    }
}

impl fmt::Display for SearchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
