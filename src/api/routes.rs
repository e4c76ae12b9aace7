use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Swipe sessions
        .route("/swipe-sessions/start", post(handlers::start_session))
        .route(
            "/swipe-sessions/:session_id",
            axum::routing::delete(handlers::end_session),
        )
        .route("/swipe-sessions/:session_id/next", get(handlers::next_recipe))
        .route("/swipe-sessions/:session_id/stats", get(handlers::session_stats))
        .route(
            "/swipe-sessions/:session_id/swipe/:recipe_id",
            post(handlers::register_swipe),
        )
        // Recipe catalog
        .route(
            "/recipes",
            get(handlers::list_recipes).post(handlers::create_recipe),
        )
        .route(
            "/recipes/:recipe_id",
            get(handlers::get_recipe).delete(handlers::delete_recipe),
        )
        // Saved recipes
        .route("/saved-recipes", get(handlers::list_saved_recipes))
        .route("/saved-recipes/check/:recipe_id", get(handlers::check_saved))
        .route(
            "/saved-recipes/:recipe_id",
            post(handlers::save_recipe).delete(handlers::unsave_recipe),
        )
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
