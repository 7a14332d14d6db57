/// Endpoint contract tests against the assembled router
/// Runs with the fixed catalog and no external collaborators configured
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use rust_loan_finder_api::api::router;
use rust_loan_finder_api::assistant_client::{AssistantClient, UNCONFIGURED_ANSWER};
use rust_loan_finder_api::catalog::{ProductResolver, UpstreamErrorPolicy};
use rust_loan_finder_api::handlers::AppState;
use rust_loan_finder_api::store::FixedCatalogStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SMART_SALARY_ID: &str = "3f1c9a52-7b8e-4d21-9c34-5a6e7f8b9c01";

fn create_test_app() -> Router {
    let catalog = ProductResolver::new(FixedCatalogStore::builtin().unwrap())
        .with_policy(UpstreamErrorPolicy::UseFallback);

    router(Arc::new(AppState {
        catalog,
        assistant: None,
        uploads: None,
    }))
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = create_test_app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn get(uri: &str) -> (StatusCode, Value) {
    send(Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["service"], json!("rust-loan-finder-api"));
    assert_eq!(body["live_store"], json!(false));
    assert_eq!(body["upstream_error_policy"], json!("fallback"));
    assert_eq!(body["assistant_model"], Value::Null);
}

#[tokio::test]
async fn test_health_reports_policy_and_model() {
    let catalog = ProductResolver::new(FixedCatalogStore::builtin().unwrap())
        .with_policy(UpstreamErrorPolicy::Propagate);
    let assistant = AssistantClient::new(
        "http://127.0.0.1:9".to_string(),
        "test-key".to_string(),
        "gpt-4o-mini".to_string(),
    )
    .unwrap();
    let app = router(Arc::new(AppState {
        catalog,
        assistant: Some(assistant),
        uploads: None,
    }));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["upstream_error_policy"], json!("propagate"));
    assert_eq!(body["assistant_model"], json!("gpt-4o-mini"));
}

#[tokio::test]
async fn test_list_products_returns_decorated_catalog() {
    let (status, body) = get("/products").await;

    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 10);

    let aprs: Vec<f64> = data.iter().map(|p| p["rate_apr"].as_f64().unwrap()).collect();
    assert!(aprs.windows(2).all(|w| w[0] <= w[1]));

    for product in data {
        let badges = product["badges"].as_array().unwrap();
        assert!(!badges.is_empty() && badges.len() <= 5);
        assert!(product["match_score"].as_f64().unwrap() > 0.0);
    }
}

#[tokio::test]
async fn test_apr_floor_above_catalog_is_empty_not_error() {
    let (status, body) = get("/products?minApr=25").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": [] }));
}

#[tokio::test]
async fn test_filters_and_limit() {
    let (status, body) = get("/products?bank=%20hdfc%20&limit=1").await;

    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["bank"], json!("HDFC Bank"));
    assert_eq!(data[0]["rate_apr"], json!(10.5));
}

#[tokio::test]
async fn test_invalid_filters_return_field_errors() {
    let (status, body) = get("/products?limit=100&minApr=abc").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid filters"));
    assert_eq!(
        body["details"]["fieldErrors"]["limit"],
        json!(["Number must be less than or equal to 50"])
    );
    assert_eq!(
        body["details"]["fieldErrors"]["minApr"],
        json!(["Expected number, received nan"])
    );
}

#[tokio::test]
async fn test_min_credit_beyond_i32_matches_everything() {
    let (status, body) = get("/products?minCredit=3000000000").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_top_products_sorted_by_score() {
    let (status, body) = get("/products/top?limit=3").await;

    assert_eq!(status, StatusCode::OK);
    let scores: Vec<f64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["match_score"].as_f64().unwrap())
        .collect();
    assert_eq!(scores.len(), 3);
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_get_product_by_id() {
    let (status, body) = get(&format!("/products/{}", SMART_SALARY_ID)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], json!(SMART_SALARY_ID));
    assert_eq!(body["data"]["product_name"], json!("SmartSalary Personal Loan"));

    let (status, body) = get("/products/00000000-0000-0000-0000-000000000000").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Product not found"));
}

#[tokio::test]
async fn test_ask_without_provider_returns_canned_answer() {
    let (status, body) = post_json(
        "/ai/ask",
        json!({
            "productId": SMART_SALARY_ID,
            "message": "What is the processing fee?",
            "history": [{"role": "user", "content": "Hi"}]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "answer": UNCONFIGURED_ANSWER }));
}

#[tokio::test]
async fn test_ask_accepts_json_without_content_type() {
    let payload = json!({
        "productId": SMART_SALARY_ID,
        "message": "Is there a prepayment penalty?"
    });
    let (status, body) = send(
        Request::builder()
            .method("POST")
            .uri("/ai/ask")
            .body(Body::from(payload.to_string()))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "answer": UNCONFIGURED_ANSWER }));

    let (status, body) = send(
        Request::builder()
            .method("POST")
            .uri("/ai/ask")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from(payload.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], json!(UNCONFIGURED_ANSWER));
}

#[tokio::test]
async fn test_ask_unknown_product_is_not_found() {
    let (status, _) = post_json(
        "/ai/ask",
        json!({
            "productId": "00000000-0000-0000-0000-000000000000",
            "message": "What is the APR?"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ask_schema_violation_is_bad_request() {
    let (status, body) = post_json(
        "/ai/ask",
        json!({ "productId": "nope", "message": "hi" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid request"));
    assert_eq!(body["details"]["fieldErrors"]["productId"], json!(["Invalid uuid"]));
    assert!(body["details"]["fieldErrors"]["message"].is_array());
}

#[tokio::test]
async fn test_ask_malformed_json_is_form_error() {
    let (status, body) = send(
        Request::builder()
            .method("POST")
            .uri("/ai/ask")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid request"));
    assert_eq!(body["details"]["formErrors"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_upload_requires_body_then_configuration() {
    let (status, body) = send(
        Request::builder()
            .method("POST")
            .uri("/uploads")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Select a CSV file first."));

    let (status, _) = send(
        Request::builder()
            .method("POST")
            .uri("/uploads")
            .header("x-file-name", "loans.csv")
            .body(Body::from("bank,name\n"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
