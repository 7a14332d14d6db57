use crate::assistant_client::{grounded_answer, AssistantClient};
use crate::catalog::ProductResolver;
use crate::errors::AppError;
use crate::models::*;
use crate::upload_client::{UploadClient, MISSING_FILE_MESSAGE};
use crate::validation::{parse_product_filters, parse_top_limit, validate_ask_request, FieldErrors};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Header carrying the original file name of an uploaded CSV.
pub const FILE_NAME_HEADER: &str = "x-file-name";

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Product lists and lookups, live store or fixed catalog.
    pub catalog: ProductResolver,
    /// LLM provider client (optional; absent means canned answers).
    pub assistant: Option<AssistantClient>,
    /// Ingestion hand-off client (optional).
    pub uploads: Option<UploadClient>,
}

/// Health check endpoint.
///
/// Reports the configured collaborators: live store presence, upstream
/// error policy and assistant model. Never touches the stores.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-loan-finder-api",
            "version": env!("CARGO_PKG_VERSION"),
            "live_store": state.catalog.has_live_store(),
            "upstream_error_policy": state.catalog.policy().to_string(),
            "assistant_model": state.assistant.as_ref().map(|a| a.model()),
        })),
    )
}

/// GET /products
///
/// Filtered product list, ascending by APR. Query parameters:
/// `bank`, `minApr`, `maxApr`, `minIncome`, `minCredit`, `limit` (max 50).
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ProductListResponse>, AppError> {
    tracing::info!("GET /products - params: {:?}", params);

    let filters = parse_product_filters(&params)?;
    let data = state.catalog.list(&filters).await?;

    tracing::debug!("Returning {} products", data.len());
    Ok(Json(ProductListResponse { data }))
}

/// GET /products/top
///
/// Best `limit` products by match score (default 5).
pub async fn top_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ProductListResponse>, AppError> {
    tracing::info!("GET /products/top - params: {:?}", params);

    let limit = parse_top_limit(&params)?;
    let data = state.catalog.top(limit).await?;

    Ok(Json(ProductListResponse { data }))
}

/// GET /products/:id
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, AppError> {
    tracing::info!("GET /products/{}", id);

    let product = state
        .catalog
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(ProductResponse { data: product }))
}

/// POST /ai/ask
///
/// Answers a question about one product using only that product's data.
/// Provider problems still produce a 200 with a fixed answer; only a
/// malformed body (400) or an unknown product (404) fail. The body is
/// parsed as JSON whatever its `Content-Type`.
pub async fn ask_product(
    State(state): State<Arc<AppState>>,
    raw: Bytes,
) -> Result<Json<AskResponse>, AppError> {
    let body: Value = serde_json::from_slice(&raw).map_err(|e| {
        tracing::debug!("Rejected ask body: {}", e);
        FieldErrors::form_error("Invalid request", format!("Invalid JSON: {}", e))
    })?;

    let request = validate_ask_request(&body)?;
    tracing::info!(
        "POST /ai/ask - product {} ({} prior turns)",
        request.product_id,
        request.history.len()
    );

    let product = state
        .catalog
        .get_by_id(&request.product_id.to_string())
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let answer = grounded_answer(
        state.assistant.as_ref(),
        &product,
        &request.history,
        &request.message,
    )
    .await;

    Ok(Json(AskResponse { answer }))
}

/// POST /uploads
///
/// Raw CSV body, optional `x-file-name` header. Forwards the file to the
/// ingestion service's pre-signed upload target.
pub async fn upload_csv(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, AppError> {
    let file_name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|value| value.to_str().ok());
    tracing::info!(
        "POST /uploads - {} ({} bytes)",
        file_name.unwrap_or("<unnamed>"),
        body.len()
    );

    if body.is_empty() {
        return Err(AppError::BadRequest(MISSING_FILE_MESSAGE.to_string()));
    }

    let uploads = state.uploads.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable("Upload service is not configured".to_string())
    })?;

    let response = uploads.upload_csv(file_name, body.to_vec()).await?;
    Ok(Json(response))
}
