//! Semantic re-ranking
//!
//! Last structured attempt before giving up: collect a candidate pool under
//! the category scope, let a language model order it by name relevance, then
//! fetch the chosen products by id.

mod parse;
mod prompt;

pub use parse::parse_ids;
pub use prompt::build_prompt;

use async_trait::async_trait;
use shopsearch_common::{errors::Result, ChatClient};
use std::collections::HashSet;
use std::sync::Arc;

use crate::model::{CandidateDoc, Pagination, StageResult};
use crate::query::StageClauses;
use crate::stage::StageExecutor;

/// External relevance ranker over candidate names
#[async_trait]
pub trait SemanticRanker: Send + Sync {
    /// Candidate ids ordered best to worst; may be empty
    async fn rank(&self, query: &str, candidates: &[CandidateDoc]) -> Result<Vec<String>>;
}

/// Ranker backed by a chat completion model
pub struct OpenAiRanker {
    client: ChatClient,
    max_ids: usize,
}

impl OpenAiRanker {
    pub fn new(client: ChatClient, max_ids: usize) -> Self {
        Self { client, max_ids }
    }
}

#[async_trait]
impl SemanticRanker for OpenAiRanker {
    async fn rank(&self, query: &str, candidates: &[CandidateDoc]) -> Result<Vec<String>> {
        let prompt = build_prompt(query, candidates, self.max_ids);

        tracing::debug!(
            model = %self.client.model(),
            candidates = candidates.len(),
            "Requesting semantic ranking"
        );

        let reply = self.client.complete(&prompt).await?;
        parse_ids(&reply)
    }
}

pub struct SemanticReranker {
    executor: StageExecutor,
    ranker: Arc<dyn SemanticRanker>,
    max_ids: usize,
}

impl SemanticReranker {
    pub fn new(executor: StageExecutor, ranker: Arc<dyn SemanticRanker>, max_ids: usize) -> Self {
        Self {
            executor,
            ranker,
            max_ids,
        }
    }

    /// Empty result when the pool or the ranking is empty; the ranker is
    /// never called without candidates.
    pub async fn run(
        &self,
        query: &str,
        scope: &StageClauses,
        page: Pagination,
    ) -> Result<StageResult> {
        let candidates = self.executor.fetch_candidates(scope).await?;
        if candidates.is_empty() {
            tracing::debug!("Candidate pool empty, skipping ranker");
            return Ok(StageResult::default());
        }

        let ranked = self.ranker.rank(query, &candidates).await?;
        let ids = self.accept(ranked, &candidates);

        tracing::debug!(
            candidates = candidates.len(),
            ranked = ids.len(),
            "Semantic ranking received"
        );

        if ids.is_empty() {
            return Ok(StageResult::default());
        }

        self.executor.execute_ids(&ids, page).await
    }

    /// Keeps known candidate ids in ranker order, without duplicates, capped
    fn accept(&self, ranked: Vec<String>, candidates: &[CandidateDoc]) -> Vec<String> {
        let known: HashSet<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(ranked.len().min(self.max_ids));

        for id in ranked {
            if ids.len() >= self.max_ids {
                break;
            }
            if !known.contains(id.as_str()) {
                tracing::warn!(id = %id, "Ranker returned unknown id");
                continue;
            }
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }

        ids
    }
}
