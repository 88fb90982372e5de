use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{
    db::{RecommendationCache, Repository},
    error::AppResult,
    models::{RecommendationResult, ScoredRecommendation},
    services::{
        cancel::cancellable,
        scoring::{ScoreInput, Scorer},
    },
};

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 50;
/// Watch events considered when computing genre affinity
pub const WATCH_HISTORY_LIMIT: usize = 50;
/// Unwatched items handed to the scorer per request
pub const CANDIDATE_POOL_SIZE: usize = 100;

pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_LIMIT)
}

/// Single-user recommendation pipeline
///
/// Cache-aside over the scoring engine: a hit returns without touching the
/// repository; a miss loads the user's data, scores it and stores the result.
pub struct RecommendationService {
    repo: Arc<dyn Repository>,
    cache: RecommendationCache,
    scorer: Arc<dyn Scorer>,
}

impl RecommendationService {
    pub fn new(
        repo: Arc<dyn Repository>,
        cache: RecommendationCache,
        scorer: Arc<dyn Scorer>,
    ) -> Self {
        Self {
            repo,
            cache,
            scorer,
        }
    }

    pub fn cache(&self) -> &RecommendationCache {
        &self.cache
    }

    #[instrument(skip(self, cancel))]
    pub async fn get_recommendations(
        &self,
        user_id: i64,
        limit: usize,
        cancel: &CancellationToken,
    ) -> AppResult<RecommendationResult> {
        let limit = clamp_limit(limit);

        let lookup = async { Ok(self.cache.get(user_id, limit).await) };
        let cached = cancellable(cancel, lookup).await?;
        if let Some(recommendations) = cached {
            tracing::debug!(user_id, limit, cache_hit = true, "Serving cached recommendations");
            return Ok(RecommendationResult {
                recommendations,
                cache_hit: true,
            });
        }

        tracing::debug!(user_id, limit, cache_hit = false, "Cache miss, generating");

        let recommendations = cancellable(cancel, async {
            let recs = self.generate(user_id, limit).await?;
            self.cache.set(user_id, limit, &recs).await;
            Ok(recs)
        })
        .await?;

        Ok(RecommendationResult {
            recommendations,
            cache_hit: false,
        })
    }

    async fn generate(&self, user_id: i64, limit: usize) -> AppResult<Vec<ScoredRecommendation>> {
        let profile = self.repo.get_user(user_id).await?;
        let history = self
            .repo
            .get_recent_watch_history(user_id, WATCH_HISTORY_LIMIT)
            .await?;
        let candidates = self
            .repo
            .get_unwatched_candidates(user_id, CANDIDATE_POOL_SIZE)
            .await?;

        let recommendations = self
            .scorer
            .score(ScoreInput {
                profile: &profile,
                history: &history,
                candidates: &candidates,
                limit,
            })
            .await?;

        tracing::info!(
            user_id,
            history_len = history.len(),
            candidate_count = candidates.len(),
            returned = recommendations.len(),
            "Generated recommendations"
        );

        Ok(recommendations)
    }

    /// Records a watch event and drops the user's cached lists
    #[instrument(skip(self, cancel))]
    pub async fn add_watch_history(
        &self,
        user_id: i64,
        content_id: i64,
        cancel: &CancellationToken,
    ) -> AppResult<()> {
        cancellable(cancel, self.repo.append_watch_history(user_id, content_id)).await?;

        // Runs even if the caller has since been cancelled; the event is
        // already persisted and stale lists must not outlive it.
        if self.cache.invalidate(user_id).await.is_none() {
            tracing::warn!(user_id, "Watch event recorded but cached lists may be stale");
        }

        Ok(())
    }
}
