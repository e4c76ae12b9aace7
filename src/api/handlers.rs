use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{CatalogReader, CatalogStore, SaveStore};
use crate::error::{AppError, AppResult};
use crate::middleware::request_id::RequestId;
use crate::models::{NewRecipe, Recipe, RecipeCard, SessionStats};
use crate::services::NextRecipe;

use super::AppState;

const MAX_PAGE_SIZE: usize = 100;

// Request/Response types

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SwipeParams {
    pub liked: bool,
    #[serde(default)]
    pub save: bool,
}

#[derive(Debug, Serialize)]
pub struct SwipeResponse {
    pub message: String,
    pub tag_weights: HashMap<String, f64>,
}

#[derive(Debug, Serialize)]
pub struct NextRecipeResponse {
    pub has_more_recipes: bool,
    pub recipe: Option<RecipeCard>,
}

impl From<NextRecipe> for NextRecipeResponse {
    fn from(next: NextRecipe) -> Self {
        match next {
            NextRecipe::Recipe(card) => Self {
                has_more_recipes: true,
                recipe: Some(card),
            },
            NextRecipe::Exhausted => Self {
                has_more_recipes: false,
                recipe: None,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Serialize)]
pub struct SavedStatusResponse {
    pub is_saved: bool,
}

/// Logs a failed swipe-session operation with its context
fn log_failure<'a>(
    request_id: &'a RequestId,
    operation: &'static str,
    session_id: Uuid,
) -> impl Fn(&AppError) + 'a {
    move |error| {
        tracing::warn!(
            request_id = %request_id,
            operation,
            session_id = %session_id,
            error = %error,
            "Swipe session operation failed"
        );
    }
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Start a new swipe session
pub async fn start_session(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<StartSessionResponse>)> {
    let session = state.engine.start_session().await?;
    Ok((
        StatusCode::CREATED,
        Json(StartSessionResponse {
            session_id: session.id,
        }),
    ))
}

/// Register a like/dislike for a recipe
pub async fn register_swipe(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((session_id, recipe_id)): Path<(Uuid, Uuid)>,
    Query(params): Query<SwipeParams>,
) -> AppResult<Json<SwipeResponse>> {
    let outcome = state
        .engine
        .register_swipe(session_id, recipe_id, params.liked, params.save)
        .await
        .inspect_err(log_failure(&request_id, "swipe", session_id))?;

    Ok(Json(SwipeResponse {
        message: "Swipe registered successfully".to_string(),
        tag_weights: outcome.tag_weights,
    }))
}

/// Draw the next recipe for a session
pub async fn next_recipe(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<NextRecipeResponse>> {
    let next = state
        .engine
        .next_recipe(session_id)
        .await
        .inspect_err(log_failure(&request_id, "next_recipe", session_id))?;

    Ok(Json(next.into()))
}

/// Summarize a session's progress
pub async fn session_stats(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<SessionStats>> {
    let stats = state
        .engine
        .session_stats(session_id)
        .await
        .inspect_err(log_failure(&request_id, "session_stats", session_id))?;
    Ok(Json(stats))
}

/// End a swipe session
pub async fn end_session(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state
        .engine
        .end_session(session_id)
        .await
        .inspect_err(log_failure(&request_id, "end_session", session_id))?;

    Ok(MessageResponse::new("Session ended successfully"))
}

/// Add a recipe to the catalog
pub async fn create_recipe(
    State(state): State<AppState>,
    Json(request): Json<NewRecipe>,
) -> AppResult<(StatusCode, Json<Recipe>)> {
    if request.title.trim().is_empty() {
        return Err(AppError::InvalidInput("Recipe title must not be empty".to_string()));
    }

    let recipe = state.catalog.insert(Recipe::from(request)).await?;
    tracing::info!(recipe_id = %recipe.id, tags = recipe.tags.len(), "Recipe created");

    Ok((StatusCode::CREATED, Json(recipe)))
}

/// List one page of the catalog
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<Recipe>>> {
    if page.limit > MAX_PAGE_SIZE {
        return Err(AppError::InvalidInput(format!(
            "limit must be at most {}",
            MAX_PAGE_SIZE
        )));
    }

    let recipes = state.catalog.list(page.skip, page.limit).await?;
    Ok(Json(recipes))
}

/// Fetch a single recipe
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> AppResult<Json<Recipe>> {
    state
        .catalog
        .get(recipe_id)
        .await?
        .map(Json)
        .ok_or(AppError::RecipeNotFound(recipe_id))
}

/// Remove a recipe and any save pointing at it
pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.catalog.delete(recipe_id).await?;

    match state.saves.remove(recipe_id).await {
        Ok(()) | Err(AppError::NotSaved(_)) => {}
        Err(e) => return Err(e),
    }

    tracing::info!(recipe_id = %recipe_id, "Recipe deleted");
    Ok(MessageResponse::new(format!(
        "Recipe {} deleted successfully",
        recipe_id
    )))
}

/// Save a recipe to favorites
pub async fn save_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    if state.catalog.get(recipe_id).await?.is_none() {
        return Err(AppError::RecipeNotFound(recipe_id));
    }

    if state.saves.add(recipe_id).await? {
        Ok(MessageResponse::new("Recipe saved successfully"))
    } else {
        Ok(MessageResponse::new("Recipe already saved"))
    }
}

/// List saved recipes, most recently saved first
pub async fn list_saved_recipes(State(state): State<AppState>) -> AppResult<Json<Vec<Recipe>>> {
    let saves = state.saves.list().await?;

    let mut recipes = Vec::with_capacity(saves.len());
    for saved in saves {
        match state.catalog.get(saved.recipe_id).await? {
            Some(recipe) => recipes.push(recipe),
            None => tracing::warn!(recipe_id = %saved.recipe_id, "Saved recipe missing from catalog"),
        }
    }

    Ok(Json(recipes))
}

/// Check whether a recipe is saved
pub async fn check_saved(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> AppResult<Json<SavedStatusResponse>> {
    let is_saved = state.saves.exists(recipe_id).await?;
    Ok(Json(SavedStatusResponse { is_saved }))
}

/// Remove a recipe from favorites
pub async fn unsave_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.saves.remove(recipe_id).await?;
    Ok(MessageResponse::new("Recipe removed from saved recipes"))
}
