use uuid::Uuid;

use crate::{
    db::{CatalogReader, CatalogStore},
    error::AppResult,
    models::Recipe,
    read_through,
};

use super::{Cache, CacheKey};

/// Read-through Redis cache in front of another catalog
///
/// Stale entries after a write are bounded by the TTL: a background fill
/// queued just before an invalidation can still land.
pub struct CachedCatalog<C> {
    inner: C,
    cache: Cache,
    ttl: u64,
}

impl<C> CachedCatalog<C> {
    pub fn new(inner: C, cache: Cache, ttl: u64) -> Self {
        Self { inner, cache, ttl }
    }
}

#[async_trait::async_trait]
impl<C: CatalogStore> CatalogReader for CachedCatalog<C> {
    async fn list_all(&self) -> AppResult<Vec<Recipe>> {
        let recipes: Vec<Recipe> =
            read_through!(self.cache, CacheKey::Catalog, self.ttl, self.inner.list_all());
        Ok(recipes)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Recipe>> {
        let key = CacheKey::Recipe(id);
        if let Some(recipe) = self.cache.get_from_cache::<Recipe>(&key).await? {
            return Ok(Some(recipe));
        }

        // Misses are not cached so a recipe added later is visible at once
        let recipe = self.inner.get(id).await?;
        if let Some(recipe) = &recipe {
            self.cache.set_in_background(&key, recipe, self.ttl);
        }
        Ok(recipe)
    }
}

#[async_trait::async_trait]
impl<C: CatalogStore> CatalogStore for CachedCatalog<C> {
    async fn insert(&self, recipe: Recipe) -> AppResult<Recipe> {
        let recipe = self.inner.insert(recipe).await?;
        self.cache.invalidate(&[CacheKey::Catalog]).await?;
        Ok(recipe)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.inner.delete(id).await?;
        self.cache
            .invalidate(&[CacheKey::Catalog, CacheKey::Recipe(id)])
            .await
    }

    async fn list(&self, skip: usize, limit: usize) -> AppResult<Vec<Recipe>> {
        self.inner.list(skip, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_redis_client, MemoryCatalog};

    #[tokio::test]
    #[ignore = "requires a running Redis instance"]
    async fn test_delete_invalidates_cached_recipe() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let (cache, _handle) = Cache::new(create_redis_client(&redis_url).unwrap());

        let recipe = Recipe::new("Ramen", ["soup", "quick"]);
        let catalog = CachedCatalog::new(MemoryCatalog::with_recipes(vec![recipe.clone()]), cache, 60);

        assert_eq!(catalog.get(recipe.id).await.unwrap(), Some(recipe.clone()));
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        catalog.delete(recipe.id).await.unwrap();
        assert_eq!(catalog.get(recipe.id).await.unwrap(), None);
    }
}
