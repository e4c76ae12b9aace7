/// Reads a value through the Redis cache.
///
/// Evaluates to the cached value when `$key` is present. Otherwise awaits
/// `$load`, queues the result for a background cache write with the given
/// TTL, and evaluates to the loaded value. Errors from either step are
/// propagated with `?`, so the macro must be used inside a function returning
/// `AppResult`.
///
/// # Arguments
/// * `$cache`: a [`Cache`](crate::db::Cache)
/// * `$key`: the [`CacheKey`](crate::db::CacheKey) to read and populate
/// * `$ttl`: time-to-live for a freshly loaded value, in seconds
/// * `$load`: future producing `AppResult<T>` on a miss
///
/// # Example
/// ```rust,ignore
/// let recipes: Vec<Recipe> =
///     read_through!(self.cache, CacheKey::Catalog, self.ttl, self.inner.list_all());
/// ```
#[macro_export]
macro_rules! read_through {
    ($cache:expr, $key:expr, $ttl:expr, $load:expr) => {{
        let key = $key;
        match $cache.get_from_cache(&key).await? {
            Some(hit) => hit,
            None => {
                let value = $load.await?;
                $cache.set_in_background(&key, &value, $ttl);
                value
            }
        }
    }};
}
