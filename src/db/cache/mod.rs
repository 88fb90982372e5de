mod backend;
mod store;

pub use backend::{create_redis_client, CacheBackend, MemoryBackend, RedisBackend};
pub use store::{CacheKey, RecommendationCache};
