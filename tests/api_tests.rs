mod common;

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use recommendation_service::services::ScorerConfig;

use common::USER_COUNT;

fn create_test_server() -> TestServer {
    TestServer::new(common::router(ScorerConfig::reliable())).unwrap()
}

fn content_ids(body: &Value) -> Vec<i64> {
    body["recommendations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["content_id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["cache"], "ok");
    assert_eq!(body["cache_backend"], "memory");
}

#[tokio::test]
async fn test_request_id_is_generated_and_echoed() {
    let server = create_test_server();

    let response = server.get("/health").await;
    assert!(!response.header("x-request-id").is_empty());

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("abc-123"),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "abc-123");
}

#[tokio::test]
async fn test_recommendations_miss_then_hit() {
    let server = create_test_server();

    let first = server.get("/users/3/recommendations?limit=5").await;
    first.assert_status_ok();
    let first: Value = first.json();
    assert_eq!(first["user_id"], 3);
    assert_eq!(first["metadata"]["cache_hit"], false);
    assert_eq!(first["metadata"]["total_count"], 5);

    let second = server.get("/users/3/recommendations?limit=5").await;
    second.assert_status_ok();
    let second: Value = second.json();
    assert_eq!(second["metadata"]["cache_hit"], true);
    assert_eq!(content_ids(&first), content_ids(&second));
}

#[tokio::test]
async fn test_recommendations_are_ranked_by_score() {
    let server = create_test_server();

    let body: Value = server.get("/users/4/recommendations").await.json();
    let scores: Vec<f64> = body["recommendations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["score"].as_f64().unwrap())
        .collect();

    assert_eq!(scores.len(), 10);
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_recommendations_exclude_watched_content() {
    let server = create_test_server();

    // User 7 is seeded with content 8 in their history
    let body: Value = server.get("/users/7/recommendations?limit=50").await.json();
    assert!(!content_ids(&body).contains(&8));
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let server = create_test_server();

    let response = server.get("/users/999/recommendations").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "user_not_found");
}

#[tokio::test]
async fn test_invalid_parameters_are_rejected() {
    let server = create_test_server();

    for path in [
        "/users/abc/recommendations",
        "/users/0/recommendations",
        "/users/1/recommendations?limit=0",
        "/users/1/recommendations?limit=51",
        "/users/1/recommendations?limit=many",
        "/recommendations/batch?page=0",
        "/recommendations/batch?limit=101",
    ] {
        let response = server.get(path).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "invalid_parameter", "path {}", path);
    }
}

#[tokio::test]
async fn test_watch_event_invalidates_cached_lists() {
    let server = create_test_server();

    server.get("/users/2/recommendations?limit=5").await.assert_status_ok();
    server.get("/users/2/recommendations?limit=10").await.assert_status_ok();

    let response = server
        .post("/users/2/watch-history")
        .json(&json!({ "content_id": 30 }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["status"], "recorded");

    for limit in [5, 10] {
        let body: Value = server
            .get(&format!("/users/2/recommendations?limit={}", limit))
            .await
            .json();
        assert_eq!(body["metadata"]["cache_hit"], false);
        assert!(!content_ids(&body).contains(&30));
    }
}

#[tokio::test]
async fn test_watch_event_for_unknown_content_is_rejected() {
    let server = create_test_server();

    let response = server
        .post("/users/2/watch-history")
        .json(&json!({ "content_id": 9999 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_first_page_in_user_order() {
    let server = create_test_server();

    let response = server.get("/recommendations/batch?page=1&limit=3").await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 3);
    assert_eq!(body["total_users"], USER_COUNT);

    let results = body["results"].as_array().unwrap();
    let ids: Vec<i64> = results
        .iter()
        .map(|r| r["user_id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(results.iter().all(|r| r["status"] == "success"));
    assert_eq!(body["summary"]["success_count"], 3);
    assert_eq!(body["summary"]["failed_count"], 0);
}

#[tokio::test]
async fn test_batch_defaults_and_last_page() {
    let server = create_test_server();

    let body: Value = server.get("/recommendations/batch").await.json();
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 20);
    assert_eq!(body["results"].as_array().unwrap().len(), 20);

    let body: Value = server
        .get("/recommendations/batch?page=2&limit=15")
        .await
        .json();
    let ids: Vec<i64> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["user_id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, (16..=20).collect::<Vec<_>>());

    let body: Value = server.get("/recommendations/batch?page=9").await.json();
    assert!(body["results"].as_array().unwrap().is_empty());
    assert_eq!(body["total_users"], USER_COUNT);
}

#[tokio::test]
async fn test_model_failure_maps_to_service_unavailable() {
    let failing = ScorerConfig {
        min_latency: Duration::ZERO,
        max_latency: Duration::ZERO,
        failure_rate: 1.0,
    };
    let server = TestServer::new(common::router(failing)).unwrap();

    let response = server.get("/users/1/recommendations").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["error"], "model_unavailable");

    // Batches absorb the same failure per user
    let response = server.get("/recommendations/batch?limit=4").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["summary"]["failed_count"], 4);
    assert!(body["results"]
        .as_array()
        .unwrap()
        .iter()
        .all(|r| r["status"] == "failed" && r["error"] == "model_inference_error"));
}
