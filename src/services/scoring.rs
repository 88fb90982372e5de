//! Heuristic scoring engine
//!
//! Ranks unwatched candidates for a user by blending content popularity, the
//! user's genre affinity, content recency and a small exploration noise term.
//! The engine stands in for a remote inference call, so every invocation
//! waits a random latency and occasionally fails outright.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;

use crate::{
    error::{AppError, AppResult},
    models::{CandidateContent, ScoredRecommendation, UserProfile, WatchHistoryItem},
};

const POPULARITY_WEIGHT: f64 = 0.40;
const GENRE_WEIGHT: f64 = 0.35;
const RECENCY_WEIGHT: f64 = 0.15;
const NOISE_WEIGHT: f64 = 0.10;

/// Half-width of the raw noise range, before `NOISE_WEIGHT` is applied
const NOISE_AMPLITUDE: f64 = 0.05;

/// Affinity assigned to a genre that never appears in the history
pub const UNSEEN_GENRE_WEIGHT: f64 = 0.1;

/// Everything the engine needs to rank candidates for one user
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    pub profile: &'a UserProfile,
    pub history: &'a [WatchHistoryItem],
    pub candidates: &'a [CandidateContent],
    pub limit: usize,
}

/// Ranking backend used by the recommendation pipeline
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Returns at most `input.limit` recommendations, best first.
    ///
    /// Fails with [`AppError::ModelUnavailable`] without producing any
    /// partial output.
    async fn score(&self, input: ScoreInput<'_>) -> AppResult<Vec<ScoredRecommendation>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScorerConfig {
    pub min_latency: Duration,
    pub max_latency: Duration,
    /// Probability in `[0, 1]` that a call fails
    pub failure_rate: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            min_latency: Duration::from_millis(30),
            max_latency: Duration::from_millis(50),
            failure_rate: 0.015,
        }
    }
}

impl ScorerConfig {
    /// No latency and no failures
    pub fn reliable() -> Self {
        Self {
            min_latency: Duration::ZERO,
            max_latency: Duration::ZERO,
            failure_rate: 0.0,
        }
    }
}

/// Stateless [`Scorer`] simulating an inference service
#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer {
    config: ScorerConfig,
}

impl HeuristicScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    fn sample_latency(&self) -> Duration {
        let min = self.config.min_latency.as_millis() as u64;
        let max = self.config.max_latency.as_millis() as u64;
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    fn should_fail(&self) -> bool {
        self.config.failure_rate > 0.0
            && rand::thread_rng().gen_bool(self.config.failure_rate.min(1.0))
    }
}

#[async_trait]
impl Scorer for HeuristicScorer {
    async fn score(&self, input: ScoreInput<'_>) -> AppResult<Vec<ScoredRecommendation>> {
        tokio::time::sleep(self.sample_latency()).await;

        if self.should_fail() {
            tracing::warn!(user_id = input.profile.id, "Simulated model inference failure");
            return Err(AppError::ModelUnavailable("model inference failed".to_string()));
        }

        let mut rng = rand::thread_rng();
        Ok(rank_candidates(
            input.history,
            input.candidates,
            input.limit,
            Utc::now(),
            || rng.gen_range(-NOISE_AMPLITUDE..NOISE_AMPLITUDE),
        ))
    }
}

/// Share of each genre in the history
///
/// Genres absent from the returned map should be looked up through
/// [`genre_weight`], which applies the exploration floor.
pub fn genre_weights(history: &[WatchHistoryItem]) -> HashMap<&str, f64> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for item in history {
        *counts.entry(item.genre.as_str()).or_default() += 1;
    }

    let total = history.len() as f64;
    counts
        .into_iter()
        .map(|(genre, count)| (genre, count as f64 / total))
        .collect()
}

pub fn genre_weight(weights: &HashMap<&str, f64>, genre: &str) -> f64 {
    weights.get(genre).copied().unwrap_or(UNSEEN_GENRE_WEIGHT)
}

/// `1 / (1 + days / 365)`; content dated in the future counts as brand new.
pub fn recency_factor(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days = (now - created_at).num_milliseconds() as f64 / 86_400_000.0;
    1.0 / (1.0 + days.max(0.0) / 365.0)
}

/// Score before noise is added
pub fn base_score(
    content: &CandidateContent,
    weights: &HashMap<&str, f64>,
    now: DateTime<Utc>,
) -> f64 {
    content.popularity_score * POPULARITY_WEIGHT
        + genre_weight(weights, &content.genre) * GENRE_WEIGHT
        + recency_factor(content.created_at, now) * RECENCY_WEIGHT
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Deterministic core of the engine
///
/// `noise` is sampled once per candidate and must return values in
/// `[-0.05, 0.05]`. The sort is stable, so ties keep candidate order.
pub fn rank_candidates<F>(
    history: &[WatchHistoryItem],
    candidates: &[CandidateContent],
    limit: usize,
    now: DateTime<Utc>,
    mut noise: F,
) -> Vec<ScoredRecommendation>
where
    F: FnMut() -> f64,
{
    let weights = genre_weights(history);

    let mut scored: Vec<ScoredRecommendation> = candidates
        .iter()
        .map(|content| {
            let score = base_score(content, &weights, now) + noise() * NOISE_WEIGHT;
            ScoredRecommendation {
                content_id: content.id,
                title: content.title.clone(),
                genre: content.genre.clone(),
                popularity_score: content.popularity_score,
                score: round3(score),
            }
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(limit);
    scored
}
