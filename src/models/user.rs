use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a user row, read once per recommendation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub age: i32,
    pub country: String,
    pub subscription_type: String,
    pub created_at: DateTime<Utc>,
}
