pub mod recipe;
pub mod saved_recipe;
pub mod swipe_session;

pub use recipe::{NewRecipe, Recipe, RecipeCard};
pub use saved_recipe::SavedRecipe;
pub use swipe_session::{SessionStats, SwipeSession};
