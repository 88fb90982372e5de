pub mod cache;
pub mod postgres;
pub mod repository;
pub mod seed;

pub use cache::{CacheBackend, CacheKey, MemoryBackend, RecommendationCache, RedisBackend};
pub use postgres::{create_pool, wait_for_database};
pub use repository::{PgRepository, Repository};
pub use seed::seed_if_empty;
