use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::{CatalogReader, SaveStore, SessionStore},
    error::{AppError, AppResult},
    models::{RecipeCard, SessionStats, SwipeSession},
};

/// Weight added to each tag of a liked recipe
pub const LIKE_WEIGHT: f64 = 1.0;
/// Weight added to each tag of a disliked recipe
pub const DISLIKE_WEIGHT: f64 = -0.5;
/// Weight of a tag the session has never swiped on
pub const DEFAULT_WEIGHT: f64 = 0.0;
/// Smallest sampling weight any candidate can have
pub const MIN_SAMPLING_WEIGHT: f64 = 0.1;

/// How a swipe on an already-seen recipe affects tag weights
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayPolicy {
    /// Every swipe moves the weights, including repeats
    #[default]
    Accumulate,
    /// Repeat swipes only refresh the seen set and save flag
    IgnoreSeen,
}

/// Result of asking for the next recipe
#[derive(Debug, Clone, PartialEq)]
pub enum NextRecipe {
    Recipe(RecipeCard),
    /// Every catalog recipe has been seen in this session
    Exhausted,
}

/// What a swipe changed
#[derive(Debug, Clone, PartialEq)]
pub struct SwipeOutcome {
    /// Tag weights after the swipe
    pub tag_weights: HashMap<String, f64>,
    /// Whether this swipe created a new save record
    pub newly_saved: bool,
}

/// Sum of the session's weights over a recipe's tags
pub fn score<'a, I>(tags: I, weights: &HashMap<String, f64>) -> f64
where
    I: IntoIterator<Item = &'a String>,
{
    tags.into_iter()
        .map(|tag| weights.get(tag).copied().unwrap_or(DEFAULT_WEIGHT))
        .sum()
}

/// Sampling weight for a score, floored so no candidate becomes unreachable
pub fn sampling_weight(score: f64) -> f64 {
    // f64::max also maps NaN to the floor
    score.max(MIN_SAMPLING_WEIGHT)
}

/// Normalizes sampling weights into selection probabilities
pub fn selection_probabilities(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        let uniform = 1.0 / weights.len().max(1) as f64;
        return vec![uniform; weights.len()];
    }
    weights.iter().map(|w| w / total).collect()
}

/// Session-scoped adaptive recipe selector
///
/// Draws the next recipe for a session from its unseen candidates with
/// probability proportional to `max(0.1, score)`, where a candidate's score is
/// the sum of the session's tag weights over its tags. Swipes feed back into
/// those weights.
pub struct RecommendationEngine {
    catalog: Arc<dyn CatalogReader>,
    saves: Arc<dyn SaveStore>,
    sessions: Arc<dyn SessionStore>,
    replay_policy: ReplayPolicy,
    rng: Mutex<StdRng>,
}

impl RecommendationEngine {
    /// Creates an engine with an entropy-seeded sampler
    pub fn new(
        catalog: Arc<dyn CatalogReader>,
        saves: Arc<dyn SaveStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            catalog,
            saves,
            sessions,
            replay_policy: ReplayPolicy::default(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reseeds the sampler so draws are reproducible for a fixed catalog
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_replay_policy(mut self, replay_policy: ReplayPolicy) -> Self {
        self.replay_policy = replay_policy;
        self
    }

    /// Starts a new session
    pub async fn start_session(&self) -> AppResult<SwipeSession> {
        let session = self.sessions.create().await?;
        tracing::info!(session_id = %session.id, "Swipe session started");
        Ok(session)
    }

    /// Ends a session; its id is invalid afterwards
    pub async fn end_session(&self, session_id: Uuid) -> AppResult<()> {
        let session = self.sessions.get(session_id).await?;
        self.sessions.delete(session_id).await?;

        tracing::info!(
            session_id = %session_id,
            seen = session.seen_recipes.len(),
            tags = session.tag_weights.len(),
            "Swipe session ended"
        );
        Ok(())
    }

    /// Progress summary for a session
    pub async fn session_stats(&self, session_id: Uuid) -> AppResult<SessionStats> {
        Ok(self.sessions.get(session_id).await?.stats())
    }

    /// Records a like or dislike and folds it into the session's tag weights
    pub async fn register_swipe(
        &self,
        session_id: Uuid,
        recipe_id: Uuid,
        liked: bool,
        save: bool,
    ) -> AppResult<SwipeOutcome> {
        self.sessions.get(session_id).await?;

        let recipe = self
            .catalog
            .get(recipe_id)
            .await?
            .ok_or(AppError::RecipeNotFound(recipe_id))?;

        // A failed save must leave the session unchanged
        let newly_saved = if save {
            self.saves.add(recipe_id).await?
        } else {
            false
        };

        let delta = if liked { LIKE_WEIGHT } else { DISLIKE_WEIGHT };
        let replay_policy = self.replay_policy;
        let tags: Vec<String> = recipe.tags.into_iter().collect();

        let session = self
            .sessions
            .apply(
                session_id,
                Box::new(move |session: &mut SwipeSession| {
                    let first_seen = session.mark_seen(recipe_id);
                    if first_seen || replay_policy == ReplayPolicy::Accumulate {
                        session.adjust_tags(&tags, delta);
                    }
                }),
            )
            .await?;

        tracing::info!(
            session_id = %session_id,
            recipe_id = %recipe_id,
            liked,
            newly_saved,
            seen = session.seen_recipes.len(),
            "Swipe registered"
        );

        Ok(SwipeOutcome {
            tag_weights: session.tag_weights,
            newly_saved,
        })
    }

    /// Draws the next recipe to show, or reports that none are left
    pub async fn next_recipe(&self, session_id: Uuid) -> AppResult<NextRecipe> {
        let session = self.sessions.get(session_id).await?;
        let mut candidates = self.catalog.list_unseen(&session.seen_recipes).await?;

        if candidates.is_empty() {
            tracing::info!(
                session_id = %session_id,
                seen = session.seen_recipes.len(),
                "No unseen recipes left"
            );
            return Ok(NextRecipe::Exhausted);
        }

        let weights: Vec<f64> = candidates
            .iter()
            .map(|recipe| sampling_weight(score(&recipe.tags, &session.tag_weights)))
            .collect();

        let index = self.draw(&weights);
        let recipe = candidates.swap_remove(index);
        let is_saved = self.saves.exists(recipe.id).await?;

        tracing::debug!(
            session_id = %session_id,
            recipe_id = %recipe.id,
            candidates = weights.len(),
            weight = weights[index],
            "Selected next recipe"
        );

        Ok(NextRecipe::Recipe(RecipeCard { recipe, is_saved }))
    }

    /// Picks an index with probability proportional to its weight
    fn draw(&self, weights: &[f64]) -> usize {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        match WeightedIndex::new(weights) {
            Ok(distribution) => distribution.sample(&mut *rng),
            Err(e) => {
                tracing::warn!(error = %e, candidates = weights.len(), "Degenerate weights, drawing uniformly");
                rng.gen_range(0..weights.len())
            }
        }
    }
}
