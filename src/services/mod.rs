pub mod recommendation;
pub mod session_reaper;

pub use recommendation::{NextRecipe, RecommendationEngine, ReplayPolicy, SwipeOutcome};
