use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::response::IntoResponse;
use axum::Router;
use brandmatch_ai::{AiError, GenerationParams, TextGenerator, UnconfiguredGenerator};
use brandmatch_db::MemoryContentStore;
use brandmatch_recommend::RecommendationClient;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::middleware::AuthState;
use crate::sessions::SessionRegistry;

type Script = dyn Fn(&str) -> Result<String, AiError> + Send + Sync;

struct ScriptedGenerator(Box<Script>);

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate_text(&self, prompt: &str, _: GenerationParams) -> Result<String, AiError> {
        (self.0)(prompt)
    }
}

fn scripted(
    script: impl Fn(&str) -> Result<String, AiError> + Send + Sync + 'static,
) -> Arc<dyn TextGenerator> {
    Arc::new(ScriptedGenerator(Box::new(script)))
}

fn echo() -> Arc<dyn TextGenerator> {
    scripted(|prompt| Ok(prompt.to_string()))
}

/// Strategy prompts get a sectioned answer, insight prompts a labeled one.
fn campaign_writer() -> Arc<dyn TextGenerator> {
    scripted(|prompt| {
        if prompt.contains("Susun strategi kolaborasi") {
            Ok("## Analisis Kecocokan\nAudiens sangat cocok.\n## Strategi Konten\nFokus di Reels."
                .to_string())
        } else {
            Ok("Comment quality: 80%\nTone of voice: santai".to_string())
        }
    })
}

fn test_app(generator: Arc<dyn TextGenerator>, recommender_url: &str) -> Router {
    test_app_with_auth(
        generator,
        recommender_url,
        AuthState::from_keys("", true).expect("auth"),
    )
}

fn test_app_with_auth(
    generator: Arc<dyn TextGenerator>,
    recommender_url: &str,
    auth: AuthState,
) -> Router {
    let state = AppState {
        store: Arc::new(MemoryContentStore::new()),
        recommender: Arc::new(
            RecommendationClient::new(recommender_url, 5).expect("recommendation client"),
        ),
        generator,
        sessions: Arc::new(SessionRegistry::default()),
        task_timeout: Duration::from_secs(5),
    };
    build_app(state, auth, default_rate_limit_state())
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("encode body")))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json parse")
    };
    (status, json)
}

fn complete_influencer() -> Value {
    json!({
        "username": "rara",
        "rank": 1,
        "tier": "Micro",
        "scores": {
            "audience_fit": 0.91,
            "persona_fit": 0.84,
            "performance_pred": 0.77,
            "budget_efficiency": 0.88,
            "final_score": 0.873
        },
        "performance_metrics": {
            "engagement_rate": 0.0456,
            "authenticity_score": 0.93,
            "reach_potential": 0.61,
            "brand_fit": 0.82
        },
        "insights": "Audiens merespons positif: \"bagus banget buat kulit berjerawat\""
    })
}

async fn mount_recommendations(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/recommend-influencers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "brief": { "brief_id": "BRIEF_001", "total_found": 12, "total_requested": 1 },
            "recommendations": [complete_influencer()]
        })))
        .mount(server)
        .await;
}

async fn create_campaign(app: &Router, id: &str) {
    let (status, _) = send(
        app,
        Method::POST,
        "/api/v1/campaigns",
        Some(json!({
            "id": id,
            "data": {
                "brief_id": "BRIEF_001",
                "brand_name": "Avoskin",
                "product_name": "Miraculous Refining Toner",
                "total_influencer": 1
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[test]
fn normalize_limit_applies_defaults_and_bounds() {
    assert_eq!(normalize_limit(None), 50);
    assert_eq!(normalize_limit(Some(0)), 1);
    assert_eq!(normalize_limit(Some(1_000)), 200);
    assert_eq!(normalize_limit(Some(25)), 25);
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("validation_error", StatusCode::BAD_REQUEST),
        ("not_found", StatusCode::NOT_FOUND),
        ("conflict", StatusCode::CONFLICT),
        ("upstream_unavailable", StatusCode::BAD_GATEWAY),
        ("upstream_timeout", StatusCode::GATEWAY_TIMEOUT),
        ("service_unavailable", StatusCode::SERVICE_UNAVAILABLE),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, expected) in cases {
        let response = ApiError::new("req-1", code, "message").into_response();
        assert_eq!(response.status(), expected, "code {code}");
    }
}

#[tokio::test]
async fn health_reports_database_and_generation_state() {
    let app = test_app(
        Arc::new(UnconfiguredGenerator::new("no key")),
        "http://127.0.0.1:1",
    );
    let (status, json) = send(&app, Method::GET, "/api/v1/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["generation"], "not_configured");
    assert_eq!(json["data"]["sessions"], 0);
    assert!(json["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn caller_request_id_is_echoed() {
    let app = test_app(echo(), "http://127.0.0.1:1");
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("x-request-id", "trace-42")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(
        response.headers().get("x-request-id").map(|v| v.as_bytes()),
        Some(b"trace-42".as_slice())
    );
}

#[tokio::test]
async fn score_insights_prompt_carries_percentages() {
    let app = test_app(echo(), "http://127.0.0.1:1");
    let (status, json) = send(
        &app,
        Method::POST,
        "/api/generate-insights",
        Some(json!({
            "type": "score",
            "data": complete_influencer(),
            "campaignBrief": { "brandName": "Avoskin" }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["type"], "score");
    let insights = json["insights"].as_str().expect("insights text");
    assert!(insights.contains("87.3%"), "{insights}");
    assert!(insights.contains("Avoskin"));
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn missing_metrics_is_a_bad_request_without_model_call() {
    let app = test_app(
        scripted(|_| panic!("model must not be called")),
        "http://127.0.0.1:1",
    );
    let (status, json) = send(
        &app,
        Method::POST,
        "/api/generate-insights",
        Some(json!({ "type": "performance", "data": { "username": "rara" } })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("data not available for this analysis type"));
}

#[tokio::test]
async fn unknown_insight_type_is_rejected() {
    let app = test_app(echo(), "http://127.0.0.1:1");
    let (status, json) = send(
        &app,
        Method::POST,
        "/api/generate-insights",
        Some(json!({ "type": "horoscope", "data": complete_influencer() })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("horoscope"));
}

#[tokio::test]
async fn general_insights_pass_the_prompt_through() {
    let app = test_app(echo(), "http://127.0.0.1:1");

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/generate-insights",
        Some(json!({ "type": "general", "prompt": "Ringkas tren skincare 2025." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["insights"], "Ringkas tren skincare 2025.");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/generate-insights",
        Some(json!({ "type": "general" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn model_failure_on_prompt_endpoint_is_server_error() {
    let app = test_app(
        scripted(|_| {
            Err(AiError::Upstream {
                status: 429,
                body: "quota exceeded".to_string(),
            })
        }),
        "http://127.0.0.1:1",
    );
    let (status, json) = send(
        &app,
        Method::POST,
        "/api/generate-strategy",
        Some(json!({ "influencerData": complete_influencer() })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().contains("quota exceeded"));
}

#[tokio::test]
async fn strategy_endpoint_returns_generated_text() {
    let app = test_app(campaign_writer(), "http://127.0.0.1:1");

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/generate-strategy",
        Some(json!({
            "influencerData": complete_influencer(),
            "campaignBrief": { "brandName": "Avoskin", "productName": "Toner" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["strategy"]
        .as_str()
        .unwrap()
        .starts_with("## Analisis Kecocokan"));

    let (status, json) = send(&app, Method::POST, "/api/generate-strategy", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("influencerData"));
}

#[tokio::test]
async fn campaign_lifecycle() {
    let app = test_app(echo(), "http://127.0.0.1:1");
    create_campaign(&app, "launch-01").await;

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/v1/campaigns",
        Some(json!({ "id": "launch-01", "data": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{json}");

    let (status, json) = send(&app, Method::GET, "/api/v1/campaigns/launch-01", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["data"]["brand_name"], "Avoskin");
    assert!(json["data"]["recommendation_data"].is_null());

    let (status, json) = send(&app, Method::GET, "/api/v1/campaigns?limit=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().map(Vec::len), Some(1));

    let (status, _) = send(&app, Method::DELETE, "/api/v1/campaigns/launch-01", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, Method::GET, "/api/v1/campaigns/launch-01", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[tokio::test]
async fn campaign_creation_validates_input() {
    let app = test_app(echo(), "http://127.0.0.1:1");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/campaigns",
        Some(json!({ "id": "bad id!", "data": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/campaigns",
        Some(json!({ "data": "not an object" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/v1/campaigns",
        Some(json!({ "data": { "brand_name": "Wardah" } })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(!json["data"]["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn recommend_generate_and_read_back_content() {
    let server = MockServer::start().await;
    mount_recommendations(&server).await;
    let app = test_app(campaign_writer(), &server.uri());
    create_campaign(&app, "launch-02").await;

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/v1/campaigns/launch-02/recommendations?adaptive_weights=false",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["recommendations"][0]["username"], "rara");

    let (_, json) = send(&app, Method::GET, "/api/v1/campaigns/launch-02", None).await;
    assert_eq!(
        json["data"]["recommendation_data"]["recommendations"][0]["username"],
        "rara"
    );

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/v1/campaigns/launch-02/generations",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["succeeded"], 5);
    assert_eq!(json["data"]["failed"], 0);

    let (status, json) = send(
        &app,
        Method::GET,
        "/api/v1/campaigns/launch-02/generations",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["tasks"]["rara_strategy"]["status"], "succeeded");
    assert_eq!(
        json["data"]["tasks"]["rara_score_insights"]["status"],
        "succeeded"
    );

    let (status, json) = send(
        &app,
        Method::GET,
        "/api/v1/campaigns/launch-02/content",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let items = json["data"].as_array().expect("content items");
    assert_eq!(items.len(), 5);

    let strategy = items
        .iter()
        .find(|item| item["content_type"] == "strategy")
        .expect("strategy item");
    assert_eq!(strategy["parsed"]["kind"], "sections");
    assert_eq!(
        strategy["parsed"]["sections"][0]["title"],
        "Analisis Kecocokan"
    );

    let comment = items
        .iter()
        .find(|item| item["content_type"] == "comment")
        .expect("comment item");
    assert_eq!(comment["parsed"]["kind"], "structured");
    assert_eq!(comment["parsed"]["value"]["comment_quality"], 80.0);
}

#[tokio::test]
async fn single_generation_runs_one_task() {
    let server = MockServer::start().await;
    mount_recommendations(&server).await;
    let app = test_app(campaign_writer(), &server.uri());
    create_campaign(&app, "launch-03").await;
    send(
        &app,
        Method::POST,
        "/api/v1/campaigns/launch-03/recommendations",
        None,
    )
    .await;

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/v1/campaigns/launch-03/generations/rara/score",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["key"], "rara_score_insights");
    assert_eq!(json["data"]["state"]["status"], "succeeded");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/campaigns/launch-03/generations/dita/score",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/campaigns/launch-03/generations/rara/horoscope",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generation_before_recommendations_is_a_conflict() {
    let app = test_app(echo(), "http://127.0.0.1:1");
    create_campaign(&app, "launch-04").await;

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/v1/campaigns/launch-04/generations",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("no recommendations"));
}

#[tokio::test]
async fn generation_without_model_credentials_is_unavailable() {
    let app = test_app(
        Arc::new(UnconfiguredGenerator::new("GEMINI_API_KEY is not set")),
        "http://127.0.0.1:1",
    );
    create_campaign(&app, "launch-05").await;

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/v1/campaigns/launch-05/generations",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"]["code"], "service_unavailable");
}

#[tokio::test]
async fn empty_recommendation_list_is_a_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/recommend-influencers"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "success", "recommendations": [] })),
        )
        .mount(&server)
        .await;
    let app = test_app(echo(), &server.uri());
    create_campaign(&app, "launch-06").await;

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/v1/campaigns/launch-06/recommendations",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"]["code"], "invalid_upstream_response");

    let (_, json) = send(&app, Method::GET, "/api/v1/campaigns/launch-06", None).await;
    assert!(json["data"]["recommendation_data"].is_null());
}

#[tokio::test]
async fn stored_recommendation_data_is_the_received_body() {
    let server = MockServer::start().await;
    let mut influencer = complete_influencer();
    influencer["tier"] = json!("Mid-tier");
    influencer["scores"]["content_fit"] = json!(0.5);
    influencer["performance_metrics"]["avg_likes"] = json!(1200);
    let received = json!({
        "status": "success",
        "request_id": "abc",
        "recommendations": [influencer]
    });
    Mock::given(method("POST"))
        .and(path("/api/recommend-influencers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(received.clone()))
        .mount(&server)
        .await;
    let app = test_app(campaign_writer(), &server.uri());
    create_campaign(&app, "launch-09").await;

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/v1/campaigns/launch-09/recommendations",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");

    let (_, json) = send(&app, Method::GET, "/api/v1/campaigns/launch-09", None).await;
    assert_eq!(json["data"]["recommendation_data"], received);

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/v1/campaigns/launch-09/generations/rara/strategy",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
}

#[tokio::test]
async fn unreachable_recommender_is_reported_as_unavailable() {
    let app = test_app(echo(), "http://127.0.0.1:1");
    create_campaign(&app, "launch-07").await;

    let (status, json) = send(
        &app,
        Method::POST,
        "/api/v1/campaigns/launch-07/recommendations",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"]["code"], "upstream_unavailable");

    let (status, json) = send(&app, Method::GET, "/api/v1/recommender/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["online"], false);
}

#[tokio::test]
async fn protected_routes_require_a_configured_key() {
    let app = test_app_with_auth(
        echo(),
        "http://127.0.0.1:1",
        AuthState::from_keys("secret-key", false).expect("auth"),
    );

    let (status, json) = send(&app, Method::GET, "/api/v1/campaigns", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "unauthorized");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/campaigns")
                .header("authorization", "Bearer secret-key")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = send(&app, Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
}
