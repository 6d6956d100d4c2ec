//! Integration tests for brieflow-ai API endpoints

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use brieflow_ai::provider::{ScriptedProvider, ScriptedReply};
use brieflow_ai::AppState;
use brieflow_common::events::EventBus;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

fn create_test_app(providers: Vec<ScriptedProvider>) -> axum::Router {
    let state = AppState::new(helpers::pipeline(providers), EventBus::new(100));
    brieflow_ai::build_router(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_analyze(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_health() -> Request<Body> {
    Request::builder().uri("/health").body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app(vec![ScriptedProvider::new("main")]);

    let response = app.oneshot(get_health()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "brieflow-ai");
    assert_eq!(body["providers"], json!(["main"]));
    assert!(body.get("last_error").is_none());
}

#[tokio::test]
async fn test_health_degraded_without_providers() {
    let app = create_test_app(vec![]);
    let body = body_json(app.oneshot(get_health()).await.unwrap()).await;
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_analyze_returns_document() {
    let reply = helpers::query_reply(
        "video",
        0.8,
        json!({ "constraints": { "duration_seconds": 15, "platforms": ["tiktok"] } }),
    );
    let app = create_test_app(vec![helpers::scripted("main", reply)]);

    let response = app
        .oneshot(post_analyze(json!({
            "request_id": "api-1",
            "query": "a 15s tiktok teaser",
            "assets": []
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    for section in [
        "analysis_metadata",
        "query_summary",
        "assets_analysis",
        "global_understanding",
        "creative_options",
        "pipeline_recommendations",
        "processing_insights",
    ] {
        assert!(body.get(section).is_some(), "missing section {}", section);
    }
    assert_eq!(body["analysis_metadata"]["request_id"], "api-1");
    assert_eq!(body["analysis_metadata"]["completion_status"], "partial");
    assert_eq!(
        body["global_understanding"]["unified_constraints"]["technical"]["aspect_ratio"]["value"],
        "9:16"
    );
}

#[tokio::test]
async fn test_empty_query_is_bad_request() {
    let app = create_test_app(vec![ScriptedProvider::new("main")]);

    let response = app
        .oneshot(post_analyze(json!({ "query": "  " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
    assert_eq!(body["error"]["stage"], "query_analysis");
}

#[tokio::test]
async fn test_provider_outage_is_bad_gateway_and_recorded() {
    let app = create_test_app(vec![
        ScriptedProvider::new("main").with_default(ScriptedReply::fail("upstream down"))
    ]);

    let response = app
        .clone()
        .oneshot(post_analyze(json!({ "query": "a logo for a bakery" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "ALL_PROVIDERS_FAILED");
    assert_eq!(body["error"]["stage"], "query_analysis");

    let health = body_json(app.oneshot(get_health()).await.unwrap()).await;
    let last_error = health["last_error"].as_str().unwrap();
    assert!(last_error.starts_with("query_analysis failed"));
}

#[tokio::test]
async fn test_malformed_asset_rejected() {
    let app = create_test_app(vec![ScriptedProvider::new("main")]);

    let response = app
        .oneshot(post_analyze(json!({
            "query": "a poster",
            "assets": [{ "id": "", "locator": "/a.png", "kind": "image" }]
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["stage"], "asset_analysis");
}

#[tokio::test]
async fn test_malformed_body_gets_structured_error() {
    let app = create_test_app(vec![ScriptedProvider::new("main")]);

    let response = app
        .clone()
        .oneshot(post_analyze(json!({ "assets": [] })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].as_str().unwrap().contains("query"));

    let not_json = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.oneshot(not_json).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
}
