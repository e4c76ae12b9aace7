use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Recipe, SavedRecipe, SwipeSession},
};

use super::{
    retry::with_retry, CatalogReader, CatalogStore, SaveStore, SessionMutation, SessionStore,
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const RECIPE_COLUMNS: &str = "id, title, ingredients, steps, source_url, images, total_time, \
                              servings, tags, hash, created_at";

#[derive(FromRow)]
struct RecipeRow {
    id: Uuid,
    title: String,
    ingredients: serde_json::Value,
    steps: Vec<String>,
    source_url: Option<String>,
    images: Vec<String>,
    total_time: Option<i32>,
    servings: Option<i32>,
    tags: Vec<String>,
    hash: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<RecipeRow> for Recipe {
    fn from(row: RecipeRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            ingredients: row.ingredients,
            steps: row.steps,
            source_url: row.source_url,
            images: row.images,
            total_time: row.total_time,
            servings: row.servings,
            tags: row.tags.into_iter().collect(),
            hash: row.hash,
            created_at: row.created_at,
        }
    }
}

/// Recipe catalog backed by the `recipes` table
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CatalogReader for PgCatalog {
    async fn list_all(&self) -> AppResult<Vec<Recipe>> {
        let rows: Vec<RecipeRow> = sqlx::query_as(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Recipe::from).collect())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Recipe>> {
        let row: Option<RecipeRow> =
            sqlx::query_as(&format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Recipe::from))
    }

    async fn list_unseen(&self, seen: &HashSet<Uuid>) -> AppResult<Vec<Recipe>> {
        let seen: Vec<Uuid> = seen.iter().copied().collect();
        let rows: Vec<RecipeRow> = sqlx::query_as(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id <> ALL($1) ORDER BY created_at, id"
        ))
        .bind(&seen)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Recipe::from).collect())
    }
}

#[async_trait::async_trait]
impl CatalogStore for PgCatalog {
    async fn insert(&self, recipe: Recipe) -> AppResult<Recipe> {
        let tags: Vec<&str> = recipe.tags.iter().map(String::as_str).collect();

        sqlx::query(&format!(
            "INSERT INTO recipes ({RECIPE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(recipe.id)
        .bind(&recipe.title)
        .bind(&recipe.ingredients)
        .bind(&recipe.steps)
        .bind(&recipe.source_url)
        .bind(&recipe.images)
        .bind(recipe.total_time)
        .bind(recipe.servings)
        .bind(&tags)
        .bind(&recipe.hash)
        .bind(recipe.created_at)
        .execute(&self.pool)
        .await?;

        Ok(recipe)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::RecipeNotFound(id));
        }
        Ok(())
    }

    async fn list(&self, skip: usize, limit: usize) -> AppResult<Vec<Recipe>> {
        let rows: Vec<RecipeRow> = sqlx::query_as(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY created_at, id OFFSET $1 LIMIT $2"
        ))
        .bind(to_i64(skip)?)
        .bind(to_i64(limit)?)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Recipe::from).collect())
    }
}

fn to_i64(value: usize) -> AppResult<i64> {
    i64::try_from(value).map_err(|_| AppError::InvalidInput(format!("{} is out of range", value)))
}

/// Saved recipes backed by the `saved_recipes` table
#[derive(Clone)]
pub struct PgSaveStore {
    pool: PgPool,
}

impl PgSaveStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SaveStore for PgSaveStore {
    async fn exists(&self, recipe_id: Uuid) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM saved_recipes WHERE recipe_id = $1)")
                .bind(recipe_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn add(&self, recipe_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO saved_recipes (recipe_id, saved_at) VALUES ($1, $2) \
             ON CONFLICT (recipe_id) DO NOTHING",
        )
        .bind(recipe_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn remove(&self, recipe_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM saved_recipes WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotSaved(recipe_id));
        }
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<SavedRecipe>> {
        let rows: Vec<(Uuid, DateTime<Utc>)> = sqlx::query_as(
            "SELECT recipe_id, saved_at FROM saved_recipes ORDER BY saved_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(recipe_id, saved_at)| SavedRecipe {
                recipe_id,
                saved_at,
            })
            .collect())
    }
}

#[derive(FromRow)]
struct SessionRow {
    id: Uuid,
    tag_weights: Json<HashMap<String, f64>>,
    seen_recipes: Vec<Uuid>,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
}

impl From<SessionRow> for SwipeSession {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            seen_recipes: row.seen_recipes.into_iter().collect(),
            tag_weights: row.tag_weights.0,
            created_at: row.created_at,
            last_updated: row.last_updated,
        }
    }
}

/// Swipe sessions backed by the `swipe_sessions` table
///
/// `apply` takes a row lock (`SELECT ... FOR UPDATE`) for the whole
/// read-modify-write, so concurrent swipes on one session serialize in the
/// database while other sessions are untouched.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
    retry_attempts: u32,
}

impl PgSessionStore {
    pub fn new(pool: PgPool, retry_attempts: u32) -> Self {
        Self {
            pool,
            retry_attempts,
        }
    }

    async fn write(
        tx: &mut Transaction<'_, Postgres>,
        session: &SwipeSession,
    ) -> AppResult<()> {
        let seen: Vec<Uuid> = session.seen_recipes.iter().copied().collect();

        sqlx::query(
            "UPDATE swipe_sessions SET tag_weights = $2, seen_recipes = $3, last_updated = $4 \
             WHERE id = $1",
        )
        .bind(session.id)
        .bind(Json(&session.tag_weights))
        .bind(&seen)
        .bind(session.last_updated)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn lock_row(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> AppResult<SwipeSession> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT id, tag_weights, seen_recipes, created_at, last_updated \
             FROM swipe_sessions WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(SwipeSession::from)
            .ok_or(AppError::SessionNotFound(id))
    }

    async fn apply_once(&self, id: Uuid, mutation: &SessionMutation) -> AppResult<SwipeSession> {
        let mut tx = self.pool.begin().await?;
        let mut session = Self::lock_row(&mut tx, id).await?;

        mutation(&mut session);
        session.touch();

        Self::write(&mut tx, &session).await?;
        tx.commit().await?;

        Ok(session)
    }

    async fn update_once(&self, session: &SwipeSession) -> AppResult<SwipeSession> {
        let mut tx = self.pool.begin().await?;
        Self::lock_row(&mut tx, session.id).await?;

        let mut stored = session.clone();
        stored.touch();

        Self::write(&mut tx, &stored).await?;
        tx.commit().await?;

        Ok(stored)
    }
}

#[async_trait::async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self) -> AppResult<SwipeSession> {
        let session = SwipeSession::new();

        let row = &session;
        with_retry(self.retry_attempts, "create_session", move || async move {
            sqlx::query(
                "INSERT INTO swipe_sessions (id, tag_weights, seen_recipes, created_at, last_updated) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(row.id)
            .bind(Json(&row.tag_weights))
            .bind(Vec::<Uuid>::new())
            .bind(row.created_at)
            .bind(row.last_updated)
            .execute(&self.pool)
            .await?;
            Ok::<(), AppError>(())
        })
        .await?;

        Ok(session)
    }

    async fn get(&self, id: Uuid) -> AppResult<SwipeSession> {
        with_retry(self.retry_attempts, "get_session", move || async move {
            let row: Option<SessionRow> = sqlx::query_as(
                "SELECT id, tag_weights, seen_recipes, created_at, last_updated \
                 FROM swipe_sessions WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            row.map(SwipeSession::from)
                .ok_or(AppError::SessionNotFound(id))
        })
        .await
    }

    async fn update(&self, session: &SwipeSession) -> AppResult<SwipeSession> {
        with_retry(self.retry_attempts, "update_session", move || {
            self.update_once(session)
        })
        .await
    }

    async fn apply(&self, id: Uuid, mutation: SessionMutation) -> AppResult<SwipeSession> {
        let mutation = &mutation;
        with_retry(self.retry_attempts, "apply_session", move || {
            self.apply_once(id, mutation)
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        with_retry(self.retry_attempts, "delete_session", move || async move {
            let result = sqlx::query("DELETE FROM swipe_sessions WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::SessionNotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn purge_inactive(&self, cutoff: DateTime<Utc>) -> AppResult<usize> {
        with_retry(self.retry_attempts, "purge_sessions", move || async move {
            let result = sqlx::query("DELETE FROM swipe_sessions WHERE last_updated < $1")
                .bind(cutoff)
                .execute(&self.pool)
                .await?;

            Ok(result.rows_affected() as usize)
        })
        .await
    }
}
