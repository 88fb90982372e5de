use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorKind};

use super::ScoredRecommendation;

/// Closed vocabulary for per-user batch failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchErrorCode {
    UserNotFound,
    ModelInferenceError,
    InternalError,
}

impl BatchErrorCode {
    pub fn classify(err: &AppError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => BatchErrorCode::UserNotFound,
            ErrorKind::ModelUnavailable => BatchErrorCode::ModelInferenceError,
            _ => BatchErrorCode::InternalError,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            BatchErrorCode::UserNotFound => "user not found",
            BatchErrorCode::ModelInferenceError => {
                "recommendation model failed to generate a response"
            }
            BatchErrorCode::InternalError => "an unexpected error occurred",
        }
    }
}

/// Per-user outcome inside a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Success {
        recommendations: Vec<ScoredRecommendation>,
    },
    Failed {
        error: BatchErrorCode,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUserResult {
    pub user_id: i64,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

impl BatchUserResult {
    pub fn success(user_id: i64, recommendations: Vec<ScoredRecommendation>) -> Self {
        Self {
            user_id,
            outcome: BatchOutcome::Success { recommendations },
        }
    }

    pub fn failed(user_id: i64, code: BatchErrorCode) -> Self {
        Self {
            user_id,
            outcome: BatchOutcome::Failed {
                error: code,
                message: code.message().to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub success_count: usize,
    pub failed_count: usize,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMeta {
    pub generated_at: String,
}

/// Aggregated response for one page of users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub page: u32,
    pub limit: u32,
    pub total_users: i64,
    pub results: Vec<BatchUserResult>,
    pub summary: BatchSummary,
    pub metadata: BatchMeta,
}
