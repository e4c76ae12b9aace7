use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A favorited recipe; at most one per recipe id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedRecipe {
    pub recipe_id: Uuid,
    pub saved_at: DateTime<Utc>,
}

impl SavedRecipe {
    pub fn new(recipe_id: Uuid) -> Self {
        Self {
            recipe_id,
            saved_at: Utc::now(),
        }
    }
}
