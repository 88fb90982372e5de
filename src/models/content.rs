use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of a user's watch history, joined with the content genre
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WatchHistoryItem {
    pub content_id: i64,
    pub genre: String,
    pub watched_at: DateTime<Utc>,
}

/// Content the user has not watched yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CandidateContent {
    pub id: i64,
    pub title: String,
    pub genre: String,
    /// Precomputed popularity in `[0, 1]`
    pub popularity_score: f64,
    pub created_at: DateTime<Utc>,
}
