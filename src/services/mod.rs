pub mod batch;
pub mod cancel;
pub mod gate;
pub mod recommendations;
pub mod scoring;

pub use batch::BatchService;
pub use cancel::{cancellable, deadline_token};
pub use gate::AdmissionGate;
pub use recommendations::RecommendationService;
pub use scoring::{HeuristicScorer, Scorer, ScorerConfig};
