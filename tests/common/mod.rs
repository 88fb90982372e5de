use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};

use recommendation_service::api::{create_router, AppState};
use recommendation_service::db::{MemoryBackend, RecommendationCache, Repository};
use recommendation_service::error::{AppError, AppResult};
use recommendation_service::models::{CandidateContent, UserProfile, WatchHistoryItem};
use recommendation_service::services::{HeuristicScorer, ScorerConfig};

pub const USER_COUNT: i64 = 20;
pub const CONTENT_COUNT: i64 = 30;

const GENRES: [&str; 5] = ["action", "drama", "comedy", "horror", "documentary"];

/// Seeded in-process stand-in for the PostgreSQL repository
pub struct InMemoryRepository {
    users: Vec<UserProfile>,
    content: Vec<CandidateContent>,
    history: Mutex<Vec<(i64, i64, chrono::DateTime<Utc>)>>,
}

impl InMemoryRepository {
    pub fn seeded() -> Self {
        let now = Utc::now();
        let users = (1..=USER_COUNT)
            .map(|id| UserProfile {
                id,
                age: 18 + (id as i32 % 40),
                country: "US".to_string(),
                subscription_type: if id % 2 == 0 { "premium" } else { "basic" }.to_string(),
                created_at: now - ChronoDuration::days(200),
            })
            .collect();
        let content = (1..=CONTENT_COUNT)
            .map(|id| CandidateContent {
                id,
                title: format!("Title {}", id),
                genre: GENRES[id as usize % GENRES.len()].to_string(),
                popularity_score: id as f64 / CONTENT_COUNT as f64,
                created_at: now - ChronoDuration::days(id * 10),
            })
            .collect();
        let history = (1..=USER_COUNT)
            .map(|user_id| (user_id, (user_id % CONTENT_COUNT) + 1, now))
            .collect();

        Self {
            users,
            content,
            history: Mutex::new(history),
        }
    }

    fn watched(&self, user_id: i64) -> Vec<(i64, chrono::DateTime<Utc>)> {
        let history = self.history.lock().unwrap();
        let mut watched: Vec<_> = history
            .iter()
            .filter(|(uid, _, _)| *uid == user_id)
            .map(|(_, cid, at)| (*cid, *at))
            .collect();
        watched.reverse();
        watched
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, user_id: i64) -> AppResult<UserProfile> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or(AppError::UserNotFound(user_id))
    }

    async fn get_recent_watch_history(
        &self,
        user_id: i64,
        cap: usize,
    ) -> AppResult<Vec<WatchHistoryItem>> {
        Ok(self
            .watched(user_id)
            .into_iter()
            .take(cap)
            .filter_map(|(content_id, watched_at)| {
                let item = self.content.iter().find(|c| c.id == content_id)?;
                Some(WatchHistoryItem {
                    content_id,
                    genre: item.genre.clone(),
                    watched_at,
                })
            })
            .collect())
    }

    async fn get_unwatched_candidates(
        &self,
        user_id: i64,
        cap: usize,
    ) -> AppResult<Vec<CandidateContent>> {
        let watched: Vec<i64> = self.watched(user_id).into_iter().map(|(id, _)| id).collect();
        let mut candidates: Vec<_> = self
            .content
            .iter()
            .filter(|c| !watched.contains(&c.id))
            .cloned()
            .collect();
        candidates.sort_by(|a, b| b.popularity_score.total_cmp(&a.popularity_score));
        candidates.truncate(cap);
        Ok(candidates)
    }

    async fn get_user_ids_page(&self, page: u32, limit: u32) -> AppResult<Vec<i64>> {
        let offset = (page.saturating_sub(1) as usize) * limit as usize;
        Ok(self
            .users
            .iter()
            .map(|u| u.id)
            .skip(offset)
            .take(limit as usize)
            .collect())
    }

    async fn count_users(&self) -> AppResult<i64> {
        Ok(self.users.len() as i64)
    }

    async fn append_watch_history(&self, user_id: i64, content_id: i64) -> AppResult<()> {
        let known_user = self.users.iter().any(|u| u.id == user_id);
        let known_content = self.content.iter().any(|c| c.id == content_id);
        if !known_user || !known_content {
            return Err(AppError::InvalidInput(
                "Unknown user or content".to_string(),
            ));
        }
        self.history
            .lock()
            .unwrap()
            .push((user_id, content_id, Utc::now()));
        Ok(())
    }
}

pub fn app_state(scorer: ScorerConfig) -> AppState {
    let cache = RecommendationCache::new(Arc::new(MemoryBackend::new()), Duration::from_secs(60));
    AppState::new(
        Arc::new(InMemoryRepository::seeded()),
        cache,
        Arc::new(HeuristicScorer::new(scorer)),
        4,
        Duration::from_secs(5),
    )
}

pub fn router(scorer: ScorerConfig) -> axum::Router {
    create_router(app_state(scorer))
}
