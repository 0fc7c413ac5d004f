//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tiered_cache::cache::{PolicyKind, TierConfig};
use tiered_cache::{create_router, AppState, TieredCache};
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> Router {
    let cache = TieredCache::builder()
        .tier(TierConfig::new("L1", PolicyKind::Lru, 100, 1 << 20))
        .tier(TierConfig::new("L2", PolicyKind::Lfu, 1000, 1 << 22))
        .default_ttl(Some(Duration::from_secs(300)))
        .build()
        .unwrap();
    create_router(AppState::new(cache))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == SET Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_test_app();

    let response = app
        .oneshot(json_request(
            "PUT",
            "/set",
            r#"{"key":"test_key","value":"test_value"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("test_key"));
    assert_eq!(json["tier"], 0);
}

#[tokio::test]
async fn test_set_endpoint_with_ttl_and_tier() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/set",
            r#"{"key":"ttl_key","value":"ttl_value","ttl":60,"tier":1}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Served from L2, then promoted
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/get/ttl_key"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(empty_request("GET", "/stats")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["tiers"][1]["hits"], 1);
    assert_eq!(json["tiers"][0]["promotions_in"], 1);
}

#[tokio::test]
async fn test_set_endpoint_tier_out_of_range() {
    let app = create_test_app();

    let response = app
        .oneshot(json_request(
            "PUT",
            "/set",
            r#"{"key":"k","value":"v","tier":5}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == GET Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_success() {
    let app = create_test_app();

    app.clone()
        .oneshot(json_request(
            "PUT",
            "/set",
            r#"{"key":"get_key","value":"get_value"}"#,
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(empty_request("GET", "/get/get_key"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "get_key");
    assert_eq!(json["value"], "get_value");
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let app = create_test_app();

    let response = app
        .oneshot(empty_request("GET", "/get/nonexistent_key"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

// == DELETE / EXISTS Endpoint Tests ==

#[tokio::test]
async fn test_delete_endpoint_success() {
    let app = create_test_app();

    app.clone()
        .oneshot(json_request(
            "PUT",
            "/set",
            r#"{"key":"del_key","value":"del_value"}"#,
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/del/del_key"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(empty_request("GET", "/exists/del_key"))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["exists"], false);
}

#[tokio::test]
async fn test_delete_endpoint_not_found() {
    let app = create_test_app();

    let response = app
        .oneshot(empty_request("DELETE", "/del/nonexistent_key"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == Bulk Endpoint Tests ==

#[tokio::test]
async fn test_mset_and_mget_endpoints() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/mset",
            r#"{"entries":{"a":"1","b":"2","":"3"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["stored"], 2);
    assert_eq!(json["failed"].as_array().unwrap().len(), 1);

    let response = app
        .oneshot(json_request("POST", "/mget", r#"{"keys":["a","b","zzz"]}"#))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["values"]["a"], "1");
    assert_eq!(json["values"]["b"], "2");
    assert!(json["values"].get("zzz").is_none());
}

#[tokio::test]
async fn test_export_then_import_into_fresh_server() {
    let source = create_test_app();
    source
        .clone()
        .oneshot(json_request(
            "PUT",
            "/set",
            r#"{"key":"exported","value":"payload","ttl":120}"#,
        ))
        .await
        .unwrap();

    let response = source
        .oneshot(empty_request("GET", "/export"))
        .await
        .unwrap();
    let dump = body_to_json(response.into_body()).await;
    assert_eq!(dump["items"].as_array().unwrap().len(), 1);

    let target = create_test_app();
    let response = target
        .clone()
        .oneshot(json_request("POST", "/import", &dump.to_string()))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["stored"], 1);

    let response = target
        .oneshot(empty_request("GET", "/get/exported"))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["value"], "payload");
}

// == STATS / CLEAR Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let app = create_test_app();

    app.clone()
        .oneshot(json_request("PUT", "/set", r#"{"key":"k","value":"v"}"#))
        .await
        .unwrap();
    for uri in ["/get/k", "/get/k", "/get/k", "/get/missing"] {
        app.clone().oneshot(empty_request("GET", uri)).await.unwrap();
    }

    let response = app.oneshot(empty_request("GET", "/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["total_hits"], 3);
    assert_eq!(json["total_misses"], 1);
    assert_eq!(json["hit_rate"], 0.75);
    assert_eq!(json["tier_count"], 2);
}

#[tokio::test]
async fn test_clear_endpoint_resets_everything() {
    let app = create_test_app();

    app.clone()
        .oneshot(json_request("PUT", "/set", r#"{"key":"k","value":"v"}"#))
        .await
        .unwrap();
    app.clone()
        .oneshot(empty_request("GET", "/get/k"))
        .await
        .unwrap();

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(empty_request("POST", "/clear"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/stats"))
            .await
            .unwrap();
        let json = body_to_json(response.into_body()).await;
        assert_eq!(json["total_items"], 0);
        assert_eq!(json["total_hits"], 0);
        assert_eq!(json["total_misses"], 0);
    }
}

// == HEALTH Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let response = app.oneshot(empty_request("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}

// == Error Response Tests ==

#[tokio::test]
async fn test_invalid_json_request() {
    let app = create_test_app();

    let response = app
        .oneshot(json_request("PUT", "/set", r#"{"invalid json"#))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_empty_key_request() {
    let app = create_test_app();

    let response = app
        .oneshot(json_request("PUT", "/set", r#"{"key":"","value":"test"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == TTL Expiration via API Tests ==

#[tokio::test]
async fn test_ttl_expiration_via_api() {
    let app = create_test_app();

    app.clone()
        .oneshot(json_request(
            "PUT",
            "/set",
            r#"{"key":"expire_key","value":"expire_value","ttl":1}"#,
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/get/expire_key"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let response = app
        .oneshot(empty_request("GET", "/get/expire_key"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
