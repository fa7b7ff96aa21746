use shopsearch_common::{errors::Result, SearchConfig};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{DocumentIndex, SearchStage, StageExecutor};
use crate::concept::{ConceptIndex, ConceptResolver};
use crate::model::{Pagination, SearchOutcome, SearchRequest, StageResult};
use crate::query::{QueryBuilder, StageClauses};
use crate::rerank::{SemanticRanker, SemanticReranker};

/// Staged product search.
///
/// Stateless across requests; the collaborators it holds are shared clients
/// and may serve many requests concurrently.
pub struct SearchPipeline {
    config: Arc<SearchConfig>,
    resolver: ConceptResolver,
    builder: QueryBuilder,
    executor: StageExecutor,
    reranker: SemanticReranker,
}

impl SearchPipeline {
    pub fn new(
        config: Arc<SearchConfig>,
        concepts: Arc<dyn ConceptIndex>,
        documents: Arc<dyn DocumentIndex>,
        ranker: Arc<dyn SemanticRanker>,
    ) -> Self {
        let executor = StageExecutor::new(documents, config.clone());
        let reranker = SemanticReranker::new(
            executor.clone(),
            ranker,
            config.request.max_ranked_ids,
        );

        Self {
            resolver: ConceptResolver::new(concepts),
            builder: QueryBuilder::new(config.clone()),
            executor,
            reranker,
            config,
        }
    }

    /// Runs stages in order until one yields products.
    ///
    /// Collaborator failures abort immediately; only an empty stage result
    /// moves on to the next stage.
    #[instrument(skip(self, request), fields(query = request.query().unwrap_or_default()))]
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        let Some(query) = request.query() else {
            debug!("No query text");
            return Ok(SearchOutcome::empty());
        };

        let page = request.pagination(&self.config.request);
        let resolution = self.resolver.resolve(query).await?;
        let base = self.builder.build(&resolution.concepts, &resolution.free_text);

        let mut stage = SearchStage::Strict;
        while !stage.is_terminal() {
            let result = self.attempt(stage, query, &base, page).await?;
            if !result.is_empty() {
                info!(
                    stage = %stage,
                    products = result.products.len(),
                    total_hits = result.total_hits,
                    "Search answered"
                );
                return Ok(SearchOutcome::from_stage(stage.message(), result));
            }

            debug!(stage = %stage, "Stage empty, advancing");
            stage = stage.next();
        }

        info!("No products matched");
        Ok(SearchOutcome::empty())
    }

    async fn attempt(
        &self,
        stage: SearchStage,
        query: &str,
        base: &StageClauses,
        page: Pagination,
    ) -> Result<StageResult> {
        let category = self.config.fields.category_type.as_str();

        match stage {
            SearchStage::Strict => self.executor.execute(base, page).await,
            SearchStage::CategoryRelaxed => {
                self.executor
                    .execute(&base.category_only(category), page)
                    .await
            }
            SearchStage::Semantic => {
                let scope = base.category_only(category).filter_scope();
                self.reranker.run(query, &scope, page).await
            }
            SearchStage::Empty => Ok(StageResult::default()),
        }
    }
}
