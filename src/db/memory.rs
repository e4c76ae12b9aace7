use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Recipe, SavedRecipe, SwipeSession},
};

use super::{CatalogReader, CatalogStore, SaveStore, SessionMutation, SessionStore};

/// Catalog held in insertion order
#[derive(Default)]
pub struct MemoryCatalog {
    recipes: RwLock<Vec<Recipe>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog pre-filled with `recipes`, keeping their order
    pub fn with_recipes(recipes: Vec<Recipe>) -> Self {
        Self {
            recipes: RwLock::new(recipes),
        }
    }
}

#[async_trait::async_trait]
impl CatalogReader for MemoryCatalog {
    async fn list_all(&self) -> AppResult<Vec<Recipe>> {
        Ok(self.recipes.read().await.clone())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Recipe>> {
        let recipes = self.recipes.read().await;
        Ok(recipes.iter().find(|r| r.id == id).cloned())
    }
}

#[async_trait::async_trait]
impl CatalogStore for MemoryCatalog {
    async fn insert(&self, recipe: Recipe) -> AppResult<Recipe> {
        let mut recipes = self.recipes.write().await;
        if recipes.iter().any(|r| r.id == recipe.id) {
            return Err(AppError::InvalidInput(format!(
                "Recipe {} already exists",
                recipe.id
            )));
        }
        recipes.push(recipe.clone());
        Ok(recipe)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut recipes = self.recipes.write().await;
        let before = recipes.len();
        recipes.retain(|r| r.id != id);
        if recipes.len() == before {
            return Err(AppError::RecipeNotFound(id));
        }
        Ok(())
    }
}

/// Saved-recipe table keyed by recipe id
#[derive(Default)]
pub struct MemorySaveStore {
    saves: RwLock<HashMap<Uuid, SavedRecipe>>,
}

impl MemorySaveStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SaveStore for MemorySaveStore {
    async fn exists(&self, recipe_id: Uuid) -> AppResult<bool> {
        Ok(self.saves.read().await.contains_key(&recipe_id))
    }

    async fn add(&self, recipe_id: Uuid) -> AppResult<bool> {
        let mut saves = self.saves.write().await;
        if saves.contains_key(&recipe_id) {
            return Ok(false);
        }
        saves.insert(recipe_id, SavedRecipe::new(recipe_id));
        Ok(true)
    }

    async fn remove(&self, recipe_id: Uuid) -> AppResult<()> {
        self.saves
            .write()
            .await
            .remove(&recipe_id)
            .map(|_| ())
            .ok_or(AppError::NotSaved(recipe_id))
    }

    async fn list(&self) -> AppResult<Vec<SavedRecipe>> {
        let mut saves: Vec<SavedRecipe> = self.saves.read().await.values().cloned().collect();
        saves.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(saves)
    }
}

/// Per-session slot; `None` once the session has been deleted
type SessionSlot = Arc<Mutex<Option<SwipeSession>>>;

/// Session store with one lock per session
///
/// The outer map lock is only held long enough to find a slot, so swipes on
/// different sessions proceed in parallel while swipes on the same session
/// queue on its mutex.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Uuid, SessionSlot>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, id: Uuid) -> AppResult<SessionSlot> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(AppError::SessionNotFound(id))
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self) -> AppResult<SwipeSession> {
        let session = SwipeSession::new();
        self.sessions
            .write()
            .await
            .insert(session.id, Arc::new(Mutex::new(Some(session.clone()))));
        Ok(session)
    }

    async fn get(&self, id: Uuid) -> AppResult<SwipeSession> {
        let slot = self.slot(id).await?;
        let guard = slot.lock().await;
        guard.clone().ok_or(AppError::SessionNotFound(id))
    }

    async fn update(&self, session: &SwipeSession) -> AppResult<SwipeSession> {
        let slot = self.slot(session.id).await?;
        let mut guard = slot.lock().await;
        if guard.is_none() {
            return Err(AppError::SessionNotFound(session.id));
        }
        let mut stored = session.clone();
        stored.touch();
        *guard = Some(stored.clone());
        Ok(stored)
    }

    async fn apply(&self, id: Uuid, mutation: SessionMutation) -> AppResult<SwipeSession> {
        let slot = self.slot(id).await?;
        let mut guard = slot.lock().await;
        let session = guard.as_mut().ok_or(AppError::SessionNotFound(id))?;
        mutation(&mut *session);
        session.touch();
        Ok(session.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let slot = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(AppError::SessionNotFound(id))?;
        // Holders of a cloned slot must observe the deletion too
        slot.lock().await.take();
        Ok(())
    }

    async fn purge_inactive(&self, cutoff: DateTime<Utc>) -> AppResult<usize> {
        let slots: Vec<(Uuid, SessionSlot)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, slot)| (*id, slot.clone()))
            .collect();

        let mut expired = Vec::new();
        for (id, slot) in slots {
            let mut guard = slot.lock().await;
            let is_stale = guard
                .as_ref()
                .map_or(true, |session| session.last_updated < cutoff);
            if is_stale {
                guard.take();
                expired.push((id, slot.clone()));
            }
        }

        if expired.is_empty() {
            return Ok(0);
        }

        let mut sessions = self.sessions.write().await;
        for (id, slot) in &expired {
            if sessions.get(id).is_some_and(|current| Arc::ptr_eq(current, slot)) {
                sessions.remove(id);
            }
        }

        Ok(expired.len())
    }
}
