use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single swiping session and everything it has learned
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwipeSession {
    pub id: Uuid,
    /// Recipes already shown; only ever grows
    pub seen_recipes: HashSet<Uuid>,
    /// Accumulated preference per tag; absent tags weigh 0.0
    pub tag_weights: HashMap<String, f64>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Default for SwipeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SwipeSession {
    /// Creates an empty session stamped with the current time
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            seen_recipes: HashSet::new(),
            tag_weights: HashMap::new(),
            created_at: now,
            last_updated: now,
        }
    }

    /// Whether a recipe has already been shown in this session
    pub fn has_seen(&self, recipe_id: &Uuid) -> bool {
        self.seen_recipes.contains(recipe_id)
    }

    /// Marks a recipe as seen, returning true if it was not seen before
    pub fn mark_seen(&mut self, recipe_id: Uuid) -> bool {
        self.seen_recipes.insert(recipe_id)
    }

    /// Current weight of a tag
    pub fn tag_weight(&self, tag: &str) -> f64 {
        self.tag_weights.get(tag).copied().unwrap_or(0.0)
    }

    /// Adds `delta` to every listed tag's weight
    pub fn adjust_tags<'a, I>(&mut self, tags: I, delta: f64)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for tag in tags {
            *self.tag_weights.entry(tag.clone()).or_insert(0.0) += delta;
        }
    }

    /// Refreshes `last_updated`
    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    /// Summary exposed to clients
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            tag_weights: self.tag_weights.clone(),
            seen_recipes: self.seen_recipes.len(),
            created_at: self.created_at,
            last_updated: self.last_updated,
        }
    }
}

/// Aggregate view of a session's progress
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionStats {
    pub tag_weights: HashMap<String, f64>,
    pub seen_recipes: usize,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}
