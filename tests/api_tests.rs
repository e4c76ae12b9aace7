use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use littlechef_api::api::{create_router, AppState, Backends};
use littlechef_api::models::Recipe;
use littlechef_api::services::ReplayPolicy;

fn create_test_server() -> TestServer {
    let state = AppState::new();
    let app = create_router(state);
    TestServer::new(app).unwrap()
}

fn create_seeded_server(recipes: Vec<Recipe>) -> TestServer {
    let backends = Backends::memory(recipes);
    let state = AppState::from_backends(&backends, ReplayPolicy::Accumulate, Some(42));
    TestServer::new(create_router(state)).unwrap()
}

async fn start_session(server: &TestServer) -> String {
    let response = server.post("/swipe-sessions/start").await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    body["session_id"].as_str().unwrap().to_string()
}

async fn swipe(server: &TestServer, session_id: &str, recipe_id: &str, liked: bool) -> Value {
    let response = server
        .post(&format!("/swipe-sessions/{}/swipe/{}", session_id, recipe_id))
        .add_query_param("liked", liked)
        .await;
    response.assert_status_ok();
    response.json()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();
    let id = "6f1c1d5e-1c9a-4c59-9d8e-2b1f1d1c0a11";

    let response = server
        .get("/health")
        .add_header(
            axum::http::HeaderName::from_static("x-request-id"),
            axum::http::HeaderValue::from_static(id),
        )
        .await;

    assert_eq!(response.header("x-request-id"), id);
}

#[tokio::test]
async fn test_create_and_get_recipe() {
    let server = create_test_server();

    let response = server
        .post("/recipes")
        .json(&json!({
            "title": "Weeknight Chili",
            "steps": ["Brown the beef", "Simmer"],
            "tags": ["spicy", "quick"]
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    assert_eq!(created["title"], "Weeknight Chili");
    let id = created["id"].as_str().unwrap();

    let response = server.get(&format!("/recipes/{}", id)).await;
    response.assert_status_ok();
    let fetched: Value = response.json();
    assert_eq!(fetched["tags"], json!(["quick", "spicy"]));

    let response = server.get("/recipes").await;
    response.assert_status_ok();
    let recipes: Vec<Value> = response.json();
    assert_eq!(recipes.len(), 1);
}

#[tokio::test]
async fn test_create_recipe_requires_title() {
    let server = create_test_server();
    let response = server.post("/recipes").json(&json!({ "title": "  " })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_recipes_pagination() {
    let recipes: Vec<Recipe> = (0..5).map(|i| Recipe::new(format!("R{}", i), ["x"])).collect();
    let server = create_seeded_server(recipes.clone());

    let response = server
        .get("/recipes")
        .add_query_param("skip", 3)
        .add_query_param("limit", 10)
        .await;
    let page: Vec<Value> = response.json();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0]["title"], "R3");

    let response = server.get("/recipes").add_query_param("limit", 1000).await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_recipe_is_404() {
    let server = create_test_server();
    let id = uuid::Uuid::new_v4();

    server
        .get(&format!("/recipes/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .delete(&format!("/recipes/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .post(&format!("/saved-recipes/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_swipe_session_walkthrough() {
    let a = Recipe::new("A", ["x"]);
    let b = Recipe::new("B", ["y"]);
    let server = create_seeded_server(vec![a.clone(), b.clone()]);
    let session_id = start_session(&server).await;

    let response = server
        .get(&format!("/swipe-sessions/{}/next", session_id))
        .await;
    response.assert_status_ok();
    let next: Value = response.json();
    assert_eq!(next["has_more_recipes"], true);
    assert_eq!(next["recipe"]["is_saved"], false);

    let swiped = swipe(&server, &session_id, &a.id.to_string(), true).await;
    assert_eq!(swiped["tag_weights"], json!({ "x": 1.0 }));

    let next: Value = server
        .get(&format!("/swipe-sessions/{}/next", session_id))
        .await
        .json();
    assert_eq!(next["recipe"]["id"], json!(b.id));

    let swiped = swipe(&server, &session_id, &b.id.to_string(), false).await;
    assert_eq!(swiped["tag_weights"], json!({ "x": 1.0, "y": -0.5 }));

    let next: Value = server
        .get(&format!("/swipe-sessions/{}/next", session_id))
        .await
        .json();
    assert_eq!(next["has_more_recipes"], false);
    assert_eq!(next["recipe"], Value::Null);

    let stats: Value = server
        .get(&format!("/swipe-sessions/{}/stats", session_id))
        .await
        .json();
    assert_eq!(stats["seen_recipes"], 2);

    server
        .delete(&format!("/swipe-sessions/{}", session_id))
        .await
        .assert_status_ok();
    server
        .get(&format!("/swipe-sessions/{}/next", session_id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_swipe_with_save_marks_recipe_saved() {
    let a = Recipe::new("A", ["x"]);
    let b = Recipe::new("B", ["y"]);
    let server = create_seeded_server(vec![a.clone(), b.clone()]);
    let session_id = start_session(&server).await;

    for _ in 0..2 {
        server
            .post(&format!("/swipe-sessions/{}/swipe/{}", session_id, a.id))
            .add_query_param("liked", true)
            .add_query_param("save", true)
            .await
            .assert_status_ok();
    }

    let saved: Vec<Value> = server.get("/saved-recipes").await.json();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0]["id"], json!(a.id));

    let check: Value = server
        .get(&format!("/saved-recipes/check/{}", a.id))
        .await
        .json();
    assert_eq!(check["is_saved"], true);
}

#[tokio::test]
async fn test_swipe_errors() {
    let a = Recipe::new("A", ["x"]);
    let server = create_seeded_server(vec![a.clone()]);
    let session_id = start_session(&server).await;
    let missing = uuid::Uuid::new_v4();

    let response = server
        .post(&format!("/swipe-sessions/{}/swipe/{}", missing, a.id))
        .add_query_param("liked", true)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().starts_with("Session not found"));

    let response = server
        .post(&format!("/swipe-sessions/{}/swipe/{}", session_id, missing))
        .add_query_param("liked", true)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().starts_with("Recipe not found"));

    // `liked` is required
    server
        .post(&format!("/swipe-sessions/{}/swipe/{}", session_id, a.id))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_saved_recipes_flow() {
    let a = Recipe::new("A", ["x"]);
    let server = create_seeded_server(vec![a.clone()]);
    let path = format!("/saved-recipes/{}", a.id);

    let first: Value = server.post(&path).await.json();
    assert_eq!(first["message"], "Recipe saved successfully");
    let second: Value = server.post(&path).await.json();
    assert_eq!(second["message"], "Recipe already saved");

    server.delete(&path).await.assert_status_ok();
    server.delete(&path).await.assert_status(StatusCode::NOT_FOUND);

    let check: Value = server
        .get(&format!("/saved-recipes/check/{}", a.id))
        .await
        .json();
    assert_eq!(check["is_saved"], false);
}

#[tokio::test]
async fn test_deleting_recipe_drops_its_save() {
    let a = Recipe::new("A", ["x"]);
    let server = create_seeded_server(vec![a.clone()]);

    server
        .post(&format!("/saved-recipes/{}", a.id))
        .await
        .assert_status_ok();
    server
        .delete(&format!("/recipes/{}", a.id))
        .await
        .assert_status_ok();

    let saved: Vec<Value> = server.get("/saved-recipes").await.json();
    assert!(saved.is_empty());
}

#[tokio::test]
async fn test_session_endpoints_reject_unknown_session() {
    let server = create_test_server();
    let missing = uuid::Uuid::new_v4();

    for path in [
        format!("/swipe-sessions/{}/stats", missing),
        format!("/swipe-sessions/{}/next", missing),
    ] {
        let response = server.get(&path).await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().starts_with("Session not found"));
    }

    server
        .delete(&format!("/swipe-sessions/{}", missing))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
