use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::middleware::request_id::RequestId;
use crate::models::{BatchResponse, ScoredRecommendation};
use crate::services::recommendations::{DEFAULT_LIMIT, MAX_LIMIT};

use super::AppState;

const MAX_PAGE: i64 = 10_000;
const DEFAULT_BATCH_LIMIT: i64 = 20;
const MAX_BATCH_LIMIT: i64 = 100;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddWatchHistoryRequest {
    pub content_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationMeta {
    pub cache_hit: bool,
    pub generated_at: String,
    pub total_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: i64,
    pub recommendations: Vec<ScoredRecommendation>,
    pub metadata: RecommendationMeta,
}

/// Parses an optional integer parameter, enforcing `min..=max`
fn bounded_param(
    raw: Option<&str>,
    name: &str,
    default: i64,
    min: i64,
    max: i64,
) -> AppResult<i64> {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return Ok(default);
    };

    match raw.parse::<i64>() {
        Ok(value) if (min..=max).contains(&value) => Ok(value),
        _ => Err(AppError::InvalidInput(format!("Invalid {} parameter", name))),
    }
}

fn parse_user_id(raw: &str) -> AppResult<i64> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::InvalidInput("Invalid user_id parameter".to_string())),
    }
}

// Handlers

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let cache_status = if state.cache.is_available().await {
        "ok"
    } else {
        "unavailable"
    };

    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "cache": cache_status,
            "cache_backend": state.cache.backend_name(),
        })),
    )
}

/// Recommendations for a single user
pub async fn get_recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<String>,
    Query(params): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let user_id = parse_user_id(&user_id)?;
    let limit = bounded_param(
        params.limit.as_deref(),
        "limit",
        DEFAULT_LIMIT as i64,
        1,
        MAX_LIMIT as i64,
    )?;

    let cancel = state.request_token();
    let _deadline = cancel.clone().drop_guard();

    let result = state
        .recommendations
        .get_recommendations(user_id, limit as usize, &cancel)
        .await?;

    tracing::info!(
        request_id = %request_id,
        user_id,
        limit,
        cache_hit = result.cache_hit,
        count = result.recommendations.len(),
        "Served recommendations"
    );

    Ok(Json(RecommendationResponse {
        user_id,
        metadata: RecommendationMeta {
            cache_hit: result.cache_hit,
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            total_count: result.recommendations.len(),
        },
        recommendations: result.recommendations,
    }))
}

/// Record a watch event for a user
pub async fn add_watch_history(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<String>,
    Json(request): Json<AddWatchHistoryRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let user_id = parse_user_id(&user_id)?;
    if request.content_id <= 0 {
        return Err(AppError::InvalidInput(
            "Invalid content_id parameter".to_string(),
        ));
    }

    let cancel = state.request_token();
    let _deadline = cancel.clone().drop_guard();

    state
        .recommendations
        .add_watch_history(user_id, request.content_id, &cancel)
        .await?;

    tracing::info!(
        request_id = %request_id,
        user_id,
        content_id = request.content_id,
        "Recorded watch event"
    );

    Ok((StatusCode::CREATED, Json(json!({ "status": "recorded" }))))
}

/// Recommendations for one page of users
pub async fn get_batch_recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<BatchQuery>,
) -> AppResult<Json<BatchResponse>> {
    let page = bounded_param(params.page.as_deref(), "page", 1, 1, MAX_PAGE)?;
    let limit = bounded_param(
        params.limit.as_deref(),
        "limit",
        DEFAULT_BATCH_LIMIT,
        1,
        MAX_BATCH_LIMIT,
    )?;

    tracing::info!(request_id = %request_id, page, limit, "Processing batch request");

    let cancel = state.request_token();
    let _deadline = cancel.clone().drop_guard();

    let response = state
        .batch
        .get_batch(page as u32, limit as u32, &cancel)
        .await?;

    Ok(Json(response))
}
