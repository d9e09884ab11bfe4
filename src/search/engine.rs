//! Union orchestrator.

use std::sync::Arc;
use std::time::Duration;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use super::controls::{apply_paging, apply_score_modifiers, apply_sort, project_fields};
use super::request::SearchRequest;
use super::response::{SearchResponse, SearchResultPayload};
use crate::aggregation::Aggregator;
use crate::analysis::DslAnalyzer;
use crate::cancel::CancellationToken;
use crate::config::EngineConfig;
use crate::document::{Document, SCORE_FIELD, set_score};
use crate::error::{HalberdError, Result};
use crate::loader::{DocumentLoader, IndexConfig, IteratorGuard};
use crate::query::{Bool, Condition, EvalContext, Query, SortField, SortOrder};
use crate::template::TemplateCache;

/// Runs requests against a loader.
///
/// Each query of a request streams its documents from the loader, and
/// batches of them are evaluated on a dedicated thread pool. Matches of all
/// queries are merged in query order, then scored, aggregated or sorted,
/// projected, and paged with the controls of the first query.
///
/// Clones share the loader, template cache, analyzer, and pool.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use halberd::cancel::CancellationToken;
/// use halberd::config::EngineConfig;
/// use halberd::loader::{IndexConfig, StaticLoader};
/// use halberd::search::{SearchEngine, SearchRequest};
/// use serde_json::json;
///
/// let loader = StaticLoader::new().with_shared(vec![
///     json!({"id": 1, "title": "red car fast"}),
///     json!({"id": 2, "title": "blue car"}),
/// ]);
/// let engine = SearchEngine::new(Arc::new(loader), EngineConfig::default()).unwrap();
///
/// let request = SearchRequest::from_json(
///     br#"{"query": {"index": "ads", "bool": {"all": [{"match": {"field": "title", "value": "red"}}]}}}"#,
/// )
/// .unwrap();
/// let response = engine
///     .execute(&request, &IndexConfig::default(), &CancellationToken::new())
///     .unwrap();
/// assert_eq!(response.documents().unwrap().len(), 1);
/// ```
#[derive(Clone)]
pub struct SearchEngine {
    loader: Arc<dyn DocumentLoader>,
    config: EngineConfig,
    templates: Arc<TemplateCache>,
    analyzer: Arc<DslAnalyzer>,
    pool: Arc<ThreadPool>,
}

impl SearchEngine {
    /// Create an engine over `loader`.
    pub fn new(loader: Arc<dyn DocumentLoader>, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.parallelism)
            .thread_name(|i| format!("halberd-eval-{i}"))
            .build()
            .map_err(|e| HalberdError::other(format!("Failed to create thread pool: {e}")))?;

        Ok(SearchEngine {
            loader,
            templates: Arc::new(TemplateCache::new(config.template_cache_capacity)),
            analyzer: Arc::new(DslAnalyzer::new()?),
            pool: Arc::new(pool),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The engine's compiled template cache.
    pub fn templates(&self) -> &TemplateCache {
        &self.templates
    }

    pub fn analyzer(&self) -> &DslAnalyzer {
        &self.analyzer
    }

    /// Parse and run a request body, reporting every outcome as a payload.
    pub fn handle(&self, body: &[u8], index: &IndexConfig, cancel: &CancellationToken) -> SearchResultPayload {
        let outcome = SearchRequest::from_json(body)
            .and_then(|request| self.execute(&request, index, cancel));
        match outcome {
            Ok(response) => SearchResultPayload::ok(response),
            Err(e) => {
                warn!(error = %e, status = e.status_code(), "search request failed");
                SearchResultPayload::from_error(&e)
            }
        }
    }

    /// Run a request.
    ///
    /// `index` supplies owner, stage, repo, and branch; each query supplies
    /// its own index id. A loader failure skips its query unless it is a
    /// configuration error, which fails the whole request. Cancellation
    /// discards partial results.
    pub fn execute(
        &self,
        request: &SearchRequest,
        index: &IndexConfig,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse> {
        let mut matches = Vec::new();
        for (position, query) in request.queries().iter().enumerate() {
            if position > 0 && query.has_controls() {
                warn!(
                    index = %query.index,
                    position,
                    "result controls of non-first union queries are ignored"
                );
            }
            self.collect_matches(query, index, cancel, &mut matches)?;
        }
        cancel.check()?;

        info!(
            queries = request.queries().len(),
            matched = matches.len(),
            "search matched documents"
        );
        Ok(self.finish(request.primary(), matches))
    }

    /// Run a request on a blocking thread, cancelling it after `timeout`.
    pub async fn execute_with_timeout(
        &self,
        request: SearchRequest,
        index: IndexConfig,
        timeout: Duration,
    ) -> Result<SearchResponse> {
        let cancel = CancellationToken::new();
        let engine = self.clone();
        let task_cancel = cancel.clone();
        let task =
            tokio::task::spawn_blocking(move || engine.execute(&request, &index, &task_cancel));

        match tokio::time::timeout(timeout, task).await {
            Ok(joined) => {
                joined.map_err(|e| HalberdError::other(format!("search task failed: {e}")))?
            }
            Err(_) => {
                cancel.cancel();
                warn!(?timeout, "search timed out");
                Err(HalberdError::cancelled(format!(
                    "search exceeded {} ms",
                    timeout.as_millis()
                )))
            }
        }
    }

    /// Stream one query's documents and append its matches to `matches`.
    fn collect_matches(
        &self,
        query: &Query,
        base: &IndexConfig,
        cancel: &CancellationToken,
        matches: &mut Vec<Document>,
    ) -> Result<()> {
        cancel.check()?;
        let index = base.with_id(query.index.as_str());

        let iterator = match self.loader.load(cancel, &index, &query.composite) {
            Ok(iterator) => iterator,
            Err(e) if e.is_fatal_configuration() || e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!(index = %query.index, error = %e, "failed to load documents, skipping query");
                return Ok(());
            }
        };
        let mut documents = IteratorGuard::new(iterator);

        let ctx = EvalContext::new(
            self.loader.as_ref(),
            &index,
            cancel,
            &self.templates,
            &self.analyzer,
            &self.config,
        );

        let before = matches.len();
        let mut scanned = 0usize;
        loop {
            cancel.check()?;

            let mut batch = Vec::with_capacity(self.config.batch_size);
            let mut pulled = 0usize;
            for item in documents.by_ref().take(self.config.batch_size) {
                pulled += 1;
                match item {
                    Ok(doc) => batch.push(doc),
                    Err(e) => warn!(index = %query.index, error = %e, "skipping undecodable document"),
                }
            }
            if pulled == 0 {
                break;
            }
            scanned += pulled;
            matches.extend(self.evaluate_batch(&query.bool, batch, &ctx));
        }

        if let Some(error) = documents.last_error() {
            warn!(index = %query.index, error, "iterator finished with a non-fatal error");
        }
        if let Err(e) = documents.close() {
            warn!(index = %query.index, error = %e, "failed to close document iterator");
        }
        debug!(
            index = %query.index,
            scanned,
            matched = matches.len() - before,
            "query finished"
        );
        Ok(())
    }

    /// Evaluate a batch on the pool, keeping matches in input order with
    /// their `_score` set.
    fn evaluate_batch(&self, condition: &Bool, batch: Vec<Document>, ctx: &EvalContext<'_>) -> Vec<Document> {
        self.pool.install(|| {
            batch
                .into_par_iter()
                .filter_map(|mut doc| {
                    let evaluation = condition.evaluate(&doc, ctx);
                    if !evaluation.matched {
                        return None;
                    }
                    set_score(&mut doc, evaluation.score.max(0.0));
                    Some(doc)
                })
                .collect()
        })
    }

    /// Apply the primary query's result controls to the merged matches.
    fn finish(&self, primary: &Query, mut matches: Vec<Document>) -> SearchResponse {
        if let Some(function_score) = &primary.score_modifiers
            && !matches.is_empty()
        {
            apply_score_modifiers(&mut matches, function_score, &self.templates);
        }

        if !primary.aggs.is_empty() {
            let aggregator = Aggregator::with_config(&self.templates, &self.config);
            return SearchResponse::Aggregation(aggregator.execute_request(&matches, &primary.aggs));
        }

        if primary.sort.is_empty() {
            apply_sort(&mut matches, &[SortField::new(SCORE_FIELD, SortOrder::Desc)]);
        } else {
            apply_sort(&mut matches, &primary.sort);
        }
        let projected = project_fields(matches, &primary.source);
        SearchResponse::Documents(apply_paging(projected, primary.limit, primary.offset))
    }
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("loader", &self.loader)
            .field("config", &self.config)
            .field("templates", &self.templates.len())
            .finish()
    }
}
