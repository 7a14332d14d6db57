//! HTTP consumer of the catalog API.
//!
//! [`CatalogClient`] wraps the endpoints, [`ChatSession`] keeps a per-product
//! transcript, and [`FilterFeed`] re-fetches the list whenever filters change
//! while only ever publishing the result of the most recent change.

use crate::errors::AppError;
use crate::models::{
    AskResponse, ChatMessage, ProductFilters, ProductListResponse, ProductResponse, RankedProduct,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Prior turns sent with each question.
pub const HISTORY_WINDOW: usize = 10;

const LIST_FAILURE_MESSAGE: &str = "Failed to load products";
const ASK_FAILURE_MESSAGE: &str = "Unable to get a response right now.";

/// Client for the catalog HTTP API.
#[derive(Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(base_url: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create catalog client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `GET /products` with the given filters.
    pub async fn list_products(
        &self,
        filters: &ProductFilters,
    ) -> Result<Vec<RankedProduct>, AppError> {
        let url = format!("{}/products", self.base_url);
        tracing::debug!("Fetching products: {:?}", filters);

        let response = self
            .client
            .get(&url)
            .query(filters)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Catalog request failed: {}", e)))?;

        let body: ProductListResponse = read_json(response, LIST_FAILURE_MESSAGE).await?;
        Ok(body.data)
    }

    /// `GET /products/top`.
    pub async fn top_products(&self, limit: usize) -> Result<Vec<RankedProduct>, AppError> {
        let url = format!("{}/products/top", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Catalog request failed: {}", e)))?;

        let body: ProductListResponse = read_json(response, LIST_FAILURE_MESSAGE).await?;
        Ok(body.data)
    }

    /// `GET /products/:id`, `None` on 404.
    pub async fn get_product(&self, id: &str) -> Result<Option<RankedProduct>, AppError> {
        let url = format!("{}/products/{}", self.base_url, id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Catalog request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: ProductResponse = read_json(response, "Failed to load product").await?;
        Ok(Some(body.data))
    }

    /// `POST /ai/ask`.
    pub async fn ask(
        &self,
        product_id: &str,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<String, AppError> {
        let url = format!("{}/ai/ask", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "productId": product_id,
                "message": message,
                "history": history,
            }))
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Ask request failed: {}", e)))?;

        let body: AskResponse = read_json(response, ASK_FAILURE_MESSAGE).await?;
        Ok(body.answer)
    }
}

/// Decodes a success body, or surfaces the server's `error` text.
async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    fallback: &str,
) -> Result<T, AppError> {
    let status = response.status();
    if !status.is_success() {
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or(fallback)
            .to_string();
        return Err(match status {
            StatusCode::NOT_FOUND => AppError::NotFound(message),
            s if s.is_client_error() => AppError::BadRequest(message),
            _ => AppError::ExternalApiError(message),
        });
    }

    response.json().await.map_err(|e| {
        AppError::ExternalApiError(format!("Failed to parse catalog response: {}", e))
    })
}

/// Append-only conversation about one product.
#[derive(Debug, Clone)]
pub struct ChatSession {
    product_id: String,
    transcript: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            transcript: Vec::new(),
        }
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Sends a question, recording both turns.
    ///
    /// The user turn is appended before the request, so it stays in the
    /// transcript when the request fails. Blank input is ignored.
    pub async fn send(
        &mut self,
        client: &CatalogClient,
        message: &str,
    ) -> Result<Option<String>, AppError> {
        let message = message.trim();
        if message.is_empty() {
            return Ok(None);
        }

        let start = self.transcript.len().saturating_sub(HISTORY_WINDOW);
        let history = self.transcript[start..].to_vec();
        self.transcript.push(ChatMessage::user(message));

        let answer = client.ask(&self.product_id, message, &history).await?;
        self.transcript.push(ChatMessage::assistant(answer.clone()));
        Ok(Some(answer))
    }
}

/// Visible state of a filtered product list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    /// Bumped on every filter change.
    pub generation: u64,
    pub loading: bool,
    pub products: Vec<RankedProduct>,
    pub error: Option<String>,
}

/// Product list that follows the latest filters.
///
/// Each change aborts the previous fetch. A fetch that completes after
/// being superseded never touches the published snapshot.
pub struct FilterFeed {
    client: CatalogClient,
    state: Arc<watch::Sender<FeedSnapshot>>,
    in_flight: Mutex<Option<JoinHandle<()>>>,
}

impl FilterFeed {
    pub fn new(client: CatalogClient, initial: Vec<RankedProduct>) -> Self {
        let (state, _) = watch::channel(FeedSnapshot {
            products: initial,
            ..Default::default()
        });

        Self {
            client,
            state: Arc::new(state),
            in_flight: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.state.borrow().clone()
    }

    /// Starts a fetch for `filters`, superseding any fetch still running.
    ///
    /// Returns the generation assigned to this change.
    pub fn set_filters(&self, filters: ProductFilters) -> u64 {
        let mut in_flight = match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(previous) = in_flight.take() {
            previous.abort();
        }

        let mut generation = 0;
        self.state.send_modify(|snapshot| {
            snapshot.generation += 1;
            snapshot.loading = true;
            snapshot.error = None;
            generation = snapshot.generation;
        });

        let client = self.client.clone();
        let state = Arc::clone(&self.state);

        *in_flight = Some(tokio::spawn(async move {
            let result = client.list_products(&filters).await;

            let published = state.send_if_modified(|snapshot| {
                if snapshot.generation != generation {
                    return false;
                }
                match result {
                    Ok(products) => snapshot.products = products,
                    Err(e) => snapshot.error = Some(e.to_string()),
                }
                snapshot.loading = false;
                true
            });

            if !published {
                tracing::debug!("Dropped superseded product fetch (generation {})", generation);
            }
        }));

        generation
    }
}

impl Drop for FilterFeed {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            if let Some(handle) = in_flight.take() {
                handle.abort();
            }
        }
    }
}
