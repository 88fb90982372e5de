mod batch;
mod content;
mod recommendation;
mod user;

pub use batch::{
    BatchErrorCode, BatchMeta, BatchOutcome, BatchResponse, BatchSummary, BatchUserResult,
};
pub use content::{CandidateContent, WatchHistoryItem};
pub use recommendation::{RecommendationResult, ScoredRecommendation};
pub use user::UserProfile;
