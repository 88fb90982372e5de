use std::sync::Arc;
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{
    db::Repository,
    error::{AppError, AppResult},
    models::{BatchErrorCode, BatchMeta, BatchResponse, BatchSummary, BatchUserResult},
    services::{cancel::cancellable, gate::AdmissionGate, RecommendationService},
};

/// Recommendations computed per user in a batch
pub const BATCH_RECOMMENDATION_LIMIT: usize = 10;

/// Fans one page of users out over the single-user pipeline
///
/// Each user runs in its own task behind an [`AdmissionGate`] sized to the
/// configured concurrency. Per-user failures are folded into the response;
/// only paging errors or cancellation fail the whole call.
pub struct BatchService {
    recommendations: Arc<RecommendationService>,
    repo: Arc<dyn Repository>,
    concurrency: usize,
}

impl BatchService {
    pub fn new(
        recommendations: Arc<RecommendationService>,
        repo: Arc<dyn Repository>,
        concurrency: usize,
    ) -> Self {
        Self {
            recommendations,
            repo,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    #[instrument(skip(self, cancel))]
    pub async fn get_batch(
        &self,
        page: u32,
        limit: u32,
        cancel: &CancellationToken,
    ) -> AppResult<BatchResponse> {
        let start = Instant::now();

        let user_ids = cancellable(cancel, self.repo.get_user_ids_page(page, limit)).await?;
        let total_users = cancellable(cancel, self.repo.count_users()).await?;

        let gate = AdmissionGate::new(self.concurrency);
        let results = self.fan_out(&user_ids, &gate, cancel).await;

        if cancel.is_cancelled() {
            tracing::warn!(page, limit, "Batch cancelled before completion");
            return Err(AppError::Cancelled);
        }

        let success_count = results.iter().filter(|r| r.is_success()).count();
        let failed_count = results.len() - success_count;
        let processing_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            page,
            limit,
            users = results.len(),
            success_count,
            failed_count,
            peak_in_flight = gate.peak(),
            elapsed_ms = processing_time_ms,
            "Batch recommendations completed"
        );

        Ok(BatchResponse {
            page,
            limit,
            total_users,
            results,
            summary: BatchSummary {
                success_count,
                failed_count,
                processing_time_ms,
            },
            metadata: BatchMeta {
                generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            },
        })
    }

    /// Runs every user to completion and returns results in input order
    async fn fan_out(
        &self,
        user_ids: &[i64],
        gate: &AdmissionGate,
        cancel: &CancellationToken,
    ) -> Vec<BatchUserResult> {
        // Units are detached tasks; if this future is dropped they are
        // cancelled through the child token instead of running on.
        let units_cancel = cancel.child_token();
        let _abandon_guard = units_cancel.clone().drop_guard();

        let handles: Vec<_> = user_ids
            .iter()
            .map(|&user_id| {
                let service = Arc::clone(&self.recommendations);
                let gate = gate.clone();
                let cancel = units_cancel.clone();

                let handle = tokio::spawn(async move {
                    let _permit = gate.acquire(&cancel).await?;
                    service
                        .get_recommendations(user_id, BATCH_RECOMMENDATION_LIMIT, &cancel)
                        .await
                });
                (user_id, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (user_id, handle) in handles {
            let result = match handle.await {
                Ok(Ok(outcome)) => BatchUserResult::success(user_id, outcome.recommendations),
                Ok(Err(e)) => {
                    tracing::warn!(user_id, error = %e, "Batch: recommendation failed for user");
                    BatchUserResult::failed(user_id, BatchErrorCode::classify(&e))
                }
                Err(e) => {
                    tracing::error!(user_id, error = %e, "Batch: task join error");
                    BatchUserResult::failed(user_id, BatchErrorCode::InternalError)
                }
            };
            results.push(result);
        }

        results
    }
}
