//! Storage collaborators for the swipe engine
//!
//! The engine only ever talks to these traits. Each has an in-memory
//! implementation (the default backend, also used by tests) and a PostgreSQL
//! one; the catalog can additionally be fronted by a Redis read-through cache.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Recipe, SavedRecipe, SwipeSession},
};

pub mod memory;
pub mod postgres;
pub mod redis;
pub mod retry;

pub use self::memory::{MemoryCatalog, MemorySaveStore, MemorySessionStore};
pub use self::postgres::{create_pool, PgCatalog, PgSaveStore, PgSessionStore};
pub use self::redis::{create_redis_client, Cache, CacheKey, CachedCatalog};

/// In-place change applied to a session under its lock
///
/// Must be repeatable: a store may run it again on fresh state after a
/// transient failure.
pub type SessionMutation = Box<dyn Fn(&mut SwipeSession) + Send + Sync>;

/// Read-only view of the recipe catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogReader: Send + Sync {
    /// All recipes, in a stable order
    async fn list_all(&self) -> AppResult<Vec<Recipe>>;

    /// Looks up a single recipe
    async fn get(&self, id: Uuid) -> AppResult<Option<Recipe>>;

    /// All recipes whose id is not in `seen`, in the same order as `list_all`
    ///
    /// Backends that can push the filter down to storage should override this.
    async fn list_unseen(&self, seen: &HashSet<Uuid>) -> AppResult<Vec<Recipe>> {
        let recipes = self.list_all().await?;
        Ok(recipes
            .into_iter()
            .filter(|r| !seen.contains(&r.id))
            .collect())
    }
}

/// Catalog with the write operations used by the recipe endpoints
#[async_trait::async_trait]
pub trait CatalogStore: CatalogReader {
    /// Adds a recipe to the catalog
    async fn insert(&self, recipe: Recipe) -> AppResult<Recipe>;

    /// Removes a recipe, failing with `RecipeNotFound` if absent
    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// One page of the catalog
    async fn list(&self, skip: usize, limit: usize) -> AppResult<Vec<Recipe>> {
        let recipes = self.list_all().await?;
        Ok(recipes.into_iter().skip(skip).take(limit).collect())
    }
}

/// Favorites side table keyed by recipe id
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SaveStore: Send + Sync {
    async fn exists(&self, recipe_id: Uuid) -> AppResult<bool>;

    /// Saves a recipe; returns false if it was already saved
    async fn add(&self, recipe_id: Uuid) -> AppResult<bool>;

    /// Unsaves a recipe, failing with `NotSaved` if it was not saved
    async fn remove(&self, recipe_id: Uuid) -> AppResult<()>;

    /// All saves, most recent first
    async fn list(&self) -> AppResult<Vec<SavedRecipe>>;
}

/// Lifecycle of swipe sessions
///
/// Implementations serialize `apply` per session id; operations on different
/// ids never wait on each other.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Allocates a new empty session
    async fn create(&self) -> AppResult<SwipeSession>;

    /// Fetches the last committed state of a session
    async fn get(&self, id: Uuid) -> AppResult<SwipeSession>;

    /// Overwrites the full stored state and refreshes `last_updated`
    ///
    /// Read-modify-write callers should use [`SessionStore::apply`] instead,
    /// which holds the session lock across the whole cycle.
    async fn update(&self, session: &SwipeSession) -> AppResult<SwipeSession>;

    /// Runs `mutation` on the session under its lock and commits the result
    async fn apply(&self, id: Uuid, mutation: SessionMutation) -> AppResult<SwipeSession>;

    /// Removes a session; later operations on the id fail with `SessionNotFound`
    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Deletes sessions not updated since `cutoff`, returning how many went
    async fn purge_inactive(&self, cutoff: DateTime<Utc>) -> AppResult<usize>;
}
