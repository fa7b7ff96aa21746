//! In-memory collaborators for pipeline tests

use async_trait::async_trait;
use serde_json::{json, Value};
use shopsearch_common::{elastic::SearchResponse, AppError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::concept::ConceptIndex;
use crate::model::{CandidateDoc, ConceptMatch};
use crate::rerank::SemanticRanker;
use crate::stage::{DocumentIndex, ProductQuery};

pub fn concept(concept_type: &str, original: &str, terms: &[&str]) -> ConceptMatch {
    ConceptMatch {
        concept_type: concept_type.to_string(),
        original_term: original.to_string(),
        search_terms: terms.iter().map(|t| t.to_string()).collect(),
    }
}

/// Raw hit carrying only a product name
pub fn hit(id: &str, name: &str) -> Value {
    json!({ "_id": id, "_source": { "name": name } })
}

pub fn response(value: Value) -> SearchResponse {
    serde_json::from_value(value).expect("valid search response")
}

fn unavailable(service: &str) -> AppError {
    AppError::unavailable(service, "connection refused")
}

/// Concept index answering from a fixed vocabulary
pub struct StaticConceptIndex {
    concepts: Vec<ConceptMatch>,
    fail: bool,
    calls: AtomicUsize,
    last_tokens: Mutex<Vec<String>>,
}

impl StaticConceptIndex {
    pub fn new(concepts: Vec<ConceptMatch>) -> Self {
        Self {
            concepts,
            fail: false,
            calls: AtomicUsize::new(0),
            last_tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_tokens(&self) -> Vec<String> {
        self.last_tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConceptIndex for StaticConceptIndex {
    async fn lookup(&self, tokens: &[String]) -> Result<Vec<ConceptMatch>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_tokens.lock().unwrap() = tokens.to_vec();

        if self.fail {
            return Err(unavailable("elasticsearch"));
        }

        Ok(self
            .concepts
            .iter()
            .filter(|c| tokens.iter().any(|t| c.matches_token(t)))
            .cloned()
            .collect())
    }
}

type Responder = Box<dyn Fn(&ProductQuery) -> Result<SearchResponse> + Send + Sync>;

/// Document index that records every query and answers through a closure
pub struct RecordingDocumentIndex {
    responder: Responder,
    requests: Mutex<Vec<ProductQuery>>,
}

impl RecordingDocumentIndex {
    pub fn returning<F>(responder: F) -> Self
    where
        F: Fn(&ProductQuery) -> Result<SearchResponse> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::returning(|_| Err(unavailable("elasticsearch")))
    }

    pub fn requests(&self) -> Vec<ProductQuery> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentIndex for RecordingDocumentIndex {
    async fn search(&self, query: &ProductQuery) -> Result<SearchResponse> {
        self.requests.lock().unwrap().push(query.clone());
        (self.responder)(query)
    }
}

/// Ranker replaying a canned ranking or a one-shot error
pub struct ScriptedRanker {
    ids: Vec<String>,
    error: Mutex<Option<AppError>>,
    calls: AtomicUsize,
    last_query: Mutex<String>,
    last_candidates: Mutex<Vec<CandidateDoc>>,
}

impl ScriptedRanker {
    pub fn returning(ids: Vec<&str>) -> Self {
        Self {
            ids: ids.into_iter().map(String::from).collect(),
            error: Mutex::new(None),
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(String::new()),
            last_candidates: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: AppError) -> Self {
        let ranker = Self::returning(Vec::new());
        *ranker.error.lock().unwrap() = Some(error);
        ranker
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> String {
        self.last_query.lock().unwrap().clone()
    }

    pub fn last_candidates(&self) -> Vec<CandidateDoc> {
        self.last_candidates.lock().unwrap().clone()
    }
}

#[async_trait]
impl SemanticRanker for ScriptedRanker {
    async fn rank(&self, query: &str, candidates: &[CandidateDoc]) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = query.to_string();
        *self.last_candidates.lock().unwrap() = candidates.to_vec();

        match self.error.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(self.ids.clone()),
        }
    }
}
