use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::db::{RecommendationCache, Repository};
use crate::services::{deadline_token, BatchService, RecommendationService, Scorer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recommendations: Arc<RecommendationService>,
    pub batch: Arc<BatchService>,
    pub cache: RecommendationCache,
    pub request_timeout: Duration,
}

impl AppState {
    /// Wires the pipeline around explicit repository, cache and scorer handles
    pub fn new(
        repo: Arc<dyn Repository>,
        cache: RecommendationCache,
        scorer: Arc<dyn Scorer>,
        batch_concurrency: usize,
        request_timeout: Duration,
    ) -> Self {
        let recommendations = Arc::new(RecommendationService::new(
            Arc::clone(&repo),
            cache.clone(),
            scorer,
        ));
        let batch = Arc::new(BatchService::new(
            Arc::clone(&recommendations),
            repo,
            batch_concurrency,
        ));

        Self {
            recommendations,
            batch,
            cache,
            request_timeout,
        }
    }

    /// Cancellation token carrying this request's deadline
    pub fn request_token(&self) -> CancellationToken {
        deadline_token(self.request_timeout)
    }
}
