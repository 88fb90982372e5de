use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use crate::models::ScoredRecommendation;

use super::CacheBackend;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// One ranked list per (user, limit) pair
    Recommendations { user_id: i64, limit: usize },
    /// Every limit variant cached for a user
    UserRecommendations(i64),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommendations { user_id, limit } => {
                write!(f, "rec:user:{}:limit:{}", user_id, limit)
            }
            CacheKey::UserRecommendations(user_id) => write!(f, "rec:user:{}:limit:*", user_id),
        }
    }
}

/// Cache-aside store for scored recommendation lists
///
/// Backend failures never escape this type: reads degrade to a miss and
/// writes or invalidations become no-ops, both logged.
#[derive(Clone)]
pub struct RecommendationCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl RecommendationCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Looks up the list cached for exactly this `(user_id, limit)` pair
    pub async fn get(&self, user_id: i64, limit: usize) -> Option<Vec<ScoredRecommendation>> {
        let key = CacheKey::Recommendations { user_id, limit }.to_string();

        let raw = match self.backend.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(user_id, limit, error = %e, "Cache get failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(recs) => Some(recs),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cached value is not decodable");
                None
            }
        }
    }

    /// Best-effort write with the configured TTL
    pub async fn set(&self, user_id: i64, limit: usize, recommendations: &[ScoredRecommendation]) {
        let key = CacheKey::Recommendations { user_id, limit }.to_string();

        let json = match serde_json::to_string(recommendations) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        if let Err(e) = self.backend.set_ex(&key, json, self.ttl).await {
            tracing::warn!(user_id, limit, error = %e, "Cache set failed");
        }
    }

    /// Drops every cached list for `user_id`, whatever its limit
    ///
    /// Returns the number of entries removed, or `None` when the backend
    /// could not complete the deletion.
    pub async fn invalidate(&self, user_id: i64) -> Option<u64> {
        let pattern = CacheKey::UserRecommendations(user_id).to_string();

        match self.backend.delete_pattern(&pattern).await {
            Ok(deleted) => {
                tracing::debug!(user_id, deleted, "Invalidated cached recommendations");
                Some(deleted)
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Cache invalidation failed");
                None
            }
        }
    }

    pub async fn is_available(&self) -> bool {
        self.backend.ping().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::cache::MemoryBackend;
    use crate::error::{AppError, AppResult};
    use async_trait::async_trait;

    struct UnreachableBackend;

    #[async_trait]
    impl CacheBackend for UnreachableBackend {
        async fn get(&self, _key: &str) -> AppResult<Option<String>> {
            Err(AppError::Internal("connection refused".into()))
        }

        async fn set_ex(&self, _key: &str, _value: String, _ttl: Duration) -> AppResult<()> {
            Err(AppError::Internal("connection refused".into()))
        }

        async fn delete_pattern(&self, _pattern: &str) -> AppResult<u64> {
            Err(AppError::Internal("connection refused".into()))
        }

        async fn ping(&self) -> AppResult<()> {
            Err(AppError::Internal("connection refused".into()))
        }

        fn name(&self) -> &'static str {
            "unreachable"
        }
    }

    fn rec(content_id: i64, score: f64) -> ScoredRecommendation {
        ScoredRecommendation {
            content_id,
            title: format!("Title {}", content_id),
            genre: "drama".to_string(),
            popularity_score: 0.5,
            score,
        }
    }

    fn memory_cache() -> RecommendationCache {
        RecommendationCache::new(Arc::new(MemoryBackend::new()), Duration::from_secs(60))
    }

    #[test]
    fn test_cache_key_display_recommendations() {
        let key = CacheKey::Recommendations {
            user_id: 17,
            limit: 10,
        };
        assert_eq!(format!("{}", key), "rec:user:17:limit:10");
    }

    #[test]
    fn test_cache_key_display_user_pattern() {
        let key = CacheKey::UserRecommendations(17);
        assert_eq!(format!("{}", key), "rec:user:17:limit:*");
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let cache = memory_cache();
        assert_eq!(cache.get(1, 10).await, None);
    }

    #[tokio::test]
    async fn test_set_then_get_preserves_order() {
        let cache = memory_cache();
        let recs = vec![rec(3, 0.9), rec(1, 0.7), rec(2, 0.4)];

        cache.set(1, 3, &recs).await;

        assert_eq!(cache.get(1, 3).await, Some(recs));
    }

    #[tokio::test]
    async fn test_limits_are_independent_entries() {
        let cache = memory_cache();
        cache.set(1, 5, &[rec(1, 0.5)]).await;

        assert!(cache.get(1, 5).await.is_some());
        assert_eq!(cache.get(1, 2).await, None);
        assert_eq!(cache.get(1, 10).await, None);
    }

    #[tokio::test]
    async fn test_invalidate_clears_all_limits_for_user_only() {
        let cache = memory_cache();
        cache.set(1, 5, &[rec(1, 0.5)]).await;
        cache.set(1, 10, &[rec(1, 0.5)]).await;
        cache.set(2, 5, &[rec(9, 0.3)]).await;

        assert_eq!(cache.invalidate(1).await, Some(2));
        assert_eq!(cache.get(1, 5).await, None);
        assert_eq!(cache.get(1, 10).await, None);
        assert!(cache.get(2, 5).await.is_some());
    }

    #[tokio::test]
    async fn test_backend_failures_degrade_silently() {
        let cache =
            RecommendationCache::new(Arc::new(UnreachableBackend), Duration::from_secs(60));

        cache.set(1, 5, &[rec(1, 0.5)]).await;
        assert_eq!(cache.get(1, 5).await, None);
        assert_eq!(cache.invalidate(1).await, None);
        assert!(!cache.is_available().await);
    }

    #[tokio::test]
    async fn test_undecodable_value_is_a_miss() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .set_ex("rec:user:4:limit:10", "not json".into(), Duration::from_secs(60))
            .await
            .unwrap();
        let cache = RecommendationCache::new(backend, Duration::from_secs(60));

        assert_eq!(cache.get(4, 10).await, None);
    }
}
