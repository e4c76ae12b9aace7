use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recipe in the catalog
///
/// Only `id` and `tags` take part in recommendation; everything else is
/// carried through for presentation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    /// Unique identifier for the recipe
    pub id: Uuid,
    pub title: String,
    /// Ingredient groups as scraped, e.g. `{"main": ["2 eggs", ...]}`
    #[serde(default = "empty_object")]
    pub ingredients: serde_json::Value,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    /// Total preparation time in minutes
    #[serde(default)]
    pub total_time: Option<i32>,
    #[serde(default)]
    pub servings: Option<i32>,
    /// Tags used for scoring; duplicates collapse
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Content hash for change detection
    #[serde(default)]
    pub hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl Recipe {
    /// Creates a recipe with the given title and tags
    pub fn new<I, S>(title: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            ingredients: empty_object(),
            steps: Vec::new(),
            source_url: None,
            images: Vec::new(),
            total_time: None,
            servings: None,
            tags: tags.into_iter().map(Into::into).collect(),
            hash: None,
            created_at: Utc::now(),
        }
    }
}

/// Payload for adding a recipe to the catalog
#[derive(Debug, Clone, Deserialize)]
pub struct NewRecipe {
    pub title: String,
    #[serde(default = "empty_object")]
    pub ingredients: serde_json::Value,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub total_time: Option<i32>,
    #[serde(default)]
    pub servings: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub hash: Option<String>,
}

impl From<NewRecipe> for Recipe {
    fn from(new: NewRecipe) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: new.title,
            ingredients: new.ingredients,
            steps: new.steps,
            source_url: new.source_url,
            images: new.images,
            total_time: new.total_time,
            servings: new.servings,
            tags: new
                .tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            hash: new.hash,
            created_at: Utc::now(),
        }
    }
}

/// A recipe as served to a swiping client, with its saved flag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeCard {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub is_saved: bool,
}
