use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::db::{
    Cache, CachedCatalog, CatalogReader, CatalogStore, MemoryCatalog, MemorySaveStore,
    MemorySessionStore, PgCatalog, PgSaveStore, PgSessionStore, SaveStore, SessionStore,
};
use crate::models::Recipe;
use crate::services::{RecommendationEngine, ReplayPolicy};

/// The storage collaborators the service runs on
///
/// The catalog is exposed twice so the engine only gets read access.
#[derive(Clone)]
pub struct Backends {
    pub catalog_reader: Arc<dyn CatalogReader>,
    pub catalog: Arc<dyn CatalogStore>,
    pub saves: Arc<dyn SaveStore>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Backends {
    /// In-process storage, optionally pre-seeded with recipes
    pub fn memory(recipes: Vec<Recipe>) -> Self {
        let catalog = Arc::new(MemoryCatalog::with_recipes(recipes));
        Self {
            catalog_reader: catalog.clone(),
            catalog,
            saves: Arc::new(MemorySaveStore::new()),
            sessions: Arc::new(MemorySessionStore::new()),
        }
    }

    /// PostgreSQL storage, with the catalog optionally cached in Redis
    pub fn postgres(pool: PgPool, cache: Option<(Cache, u64)>, retry_attempts: u32) -> Self {
        let saves = Arc::new(PgSaveStore::new(pool.clone()));
        let sessions = Arc::new(PgSessionStore::new(pool.clone(), retry_attempts));
        let catalog = PgCatalog::new(pool);

        match cache {
            Some((cache, ttl)) => {
                let catalog = Arc::new(CachedCatalog::new(catalog, cache, ttl));
                Self {
                    catalog_reader: catalog.clone(),
                    catalog,
                    saves,
                    sessions,
                }
            }
            None => {
                let catalog = Arc::new(catalog);
                Self {
                    catalog_reader: catalog.clone(),
                    catalog,
                    saves,
                    sessions,
                }
            }
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    pub catalog: Arc<dyn CatalogStore>,
    pub saves: Arc<dyn SaveStore>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Creates an empty in-memory application state
    pub fn new() -> Self {
        Self::from_backends(&Backends::memory(Vec::new()), ReplayPolicy::default(), None)
    }

    /// Builds state from configured backends
    pub fn from_backends(
        backends: &Backends,
        replay_policy: ReplayPolicy,
        rng_seed: Option<u64>,
    ) -> Self {
        let engine = RecommendationEngine::new(
            backends.catalog_reader.clone(),
            backends.saves.clone(),
            backends.sessions.clone(),
        )
        .with_replay_policy(replay_policy);

        let engine = match rng_seed {
            Some(seed) => engine.with_seed(seed),
            None => engine,
        };

        Self {
            engine: Arc::new(engine),
            catalog: backends.catalog.clone(),
            saves: backends.saves.clone(),
        }
    }

    /// Builds state with the engine options from `config`
    pub fn from_config(backends: &Backends, config: &Config) -> Self {
        Self::from_backends(backends, config.replay_policy, config.rng_seed)
    }
}
