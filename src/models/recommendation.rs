use serde::{Deserialize, Serialize};

/// A ranked candidate as returned to clients and stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecommendation {
    pub content_id: i64,
    pub title: String,
    pub genre: String,
    pub popularity_score: f64,
    /// Final score rounded to three decimals
    pub score: f64,
}

/// Outcome of a single-user recommendation request
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationResult {
    pub recommendations: Vec<ScoredRecommendation>,
    pub cache_hit: bool,
}
