use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{CandidateContent, UserProfile, WatchHistoryItem},
};

/// Data access used by the recommendation pipeline
///
/// Implementations must be safe for concurrent use; batch requests call
/// into the same repository from many tasks at once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Repository: Send + Sync {
    /// Fails with [`AppError::UserNotFound`] when no such user exists.
    async fn get_user(&self, user_id: i64) -> AppResult<UserProfile>;

    /// Most recent `cap` watch events, newest first.
    async fn get_recent_watch_history(
        &self,
        user_id: i64,
        cap: usize,
    ) -> AppResult<Vec<WatchHistoryItem>>;

    /// Up to `cap` unwatched items, most popular first.
    async fn get_unwatched_candidates(
        &self,
        user_id: i64,
        cap: usize,
    ) -> AppResult<Vec<CandidateContent>>;

    /// User ids ordered by id; `page` is 1-based.
    async fn get_user_ids_page(&self, page: u32, limit: u32) -> AppResult<Vec<i64>>;

    async fn count_users(&self) -> AppResult<i64>;

    async fn append_watch_history(&self, user_id: i64, content_id: i64) -> AppResult<()>;
}

/// PostgreSQL-backed [`Repository`]
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn get_user(&self, user_id: i64) -> AppResult<UserProfile> {
        sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT id, age, country, subscription_type, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database("fetch user", e))?
        .ok_or(AppError::UserNotFound(user_id))
    }

    async fn get_recent_watch_history(
        &self,
        user_id: i64,
        cap: usize,
    ) -> AppResult<Vec<WatchHistoryItem>> {
        sqlx::query_as::<_, WatchHistoryItem>(
            r#"
            SELECT c.id AS content_id, c.genre, uwh.watched_at
            FROM user_watch_history uwh
            JOIN content c ON uwh.content_id = c.id
            WHERE uwh.user_id = $1
            ORDER BY uwh.watched_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(cap as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database("fetch watch history", e))
    }

    async fn get_unwatched_candidates(
        &self,
        user_id: i64,
        cap: usize,
    ) -> AppResult<Vec<CandidateContent>> {
        sqlx::query_as::<_, CandidateContent>(
            r#"
            SELECT c.id, c.title, c.genre, c.popularity_score, c.created_at
            FROM content c
            LEFT JOIN user_watch_history uwh
                ON uwh.content_id = c.id AND uwh.user_id = $1
            WHERE uwh.content_id IS NULL
            ORDER BY c.popularity_score DESC, c.id
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(cap as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database("fetch candidates", e))
    }

    async fn get_user_ids_page(&self, page: u32, limit: u32) -> AppResult<Vec<i64>> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);

        sqlx::query_scalar::<_, i64>("SELECT id FROM users ORDER BY id LIMIT $1 OFFSET $2")
            .bind(i64::from(limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database("fetch user ids", e))
    }

    async fn count_users(&self) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database("count users", e))
    }

    async fn append_watch_history(&self, user_id: i64, content_id: i64) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_watch_history (user_id, content_id, watched_at)
            VALUES ($1, $2, NOW())
            "#,
        )
        .bind(user_id)
        .bind(content_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                Err(AppError::InvalidInput(format!(
                    "unknown user {} or content {}",
                    user_id, content_id
                )))
            }
            Err(e) => Err(AppError::database("append watch history", e)),
        }
    }
}
