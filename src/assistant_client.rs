use crate::errors::AppError;
use crate::models::{ChatMessage, RankedProduct};
use serde::{Deserialize, Serialize};

/// Answer used when no provider credentials are configured.
pub const UNCONFIGURED_ANSWER: &str = "I can only answer based on the stored product details. \
For APR, eligibility, fees, and tenure please refer to the card above.";

/// Answer used when the provider call fails.
pub const PROVIDER_FAILURE_ANSWER: &str =
    "I can only answer based on the product details and don't have that info yet.";

/// Answer used when the provider returns no text.
pub const EMPTY_COMPLETION_ANSWER: &str = "I could not generate an answer from the product data.";

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 300;

/// Builds the system instruction that confines the model to one product.
pub fn build_grounding_prompt(product: &RankedProduct) -> Result<String, AppError> {
    let product_data = serde_json::to_string_pretty(product)
        .map_err(|e| AppError::InternalError(format!("Failed to serialize product: {}", e)))?;

    Ok(format!(
        "You are a loan product assistant. Only answer using the PRODUCT_DATA below. \
If the question cannot be answered from the data, say: \"{}\" \
Keep answers short (under 120 words) and cite relevant fields when helpful.\n\n\
PRODUCT_DATA:\n{}",
        PROVIDER_FAILURE_ANSWER, product_data
    ))
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct AssistantClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AssistantClient {
    /// Creates a new `AssistantClient`.
    ///
    /// No request timeout is set; the provider's own limits apply.
    pub fn new(base_url: String, api_key: String, model: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            AppError::ExternalApiError(format!("Failed to create assistant client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Single non-streaming completion: system instruction, prior turns,
    /// then the new user message.
    ///
    /// Returns `Ok(None)` when the provider answers without any text.
    pub async fn complete(
        &self,
        system: &str,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<Option<String>, AppError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(CompletionMessage {
            role: "system",
            content: system,
        });
        messages.extend(history.iter().map(|turn| CompletionMessage {
            role: turn.role.as_str(),
            content: &turn.content,
        }));
        messages.push(CompletionMessage {
            role: "user",
            content: message,
        });

        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Assistant request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Assistant provider returned {}: {}",
                status, error_text
            )));
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse assistant response: {}", e))
        })?;

        tracing::debug!(
            "Assistant completion from {} in {}ms",
            self.model,
            start.elapsed().as_millis()
        );

        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty()))
    }
}

/// Answers a question about one product, never failing.
///
/// Missing credentials, provider errors and empty completions each map to
/// a fixed answer.
pub async fn grounded_answer(
    assistant: Option<&AssistantClient>,
    product: &RankedProduct,
    history: &[ChatMessage],
    message: &str,
) -> String {
    let Some(assistant) = assistant else {
        tracing::debug!("No assistant configured, returning canned answer");
        return UNCONFIGURED_ANSWER.to_string();
    };

    let system = match build_grounding_prompt(product) {
        Ok(system) => system,
        Err(e) => {
            tracing::error!("Failed to build grounding prompt: {}", e);
            return PROVIDER_FAILURE_ANSWER.to_string();
        }
    };

    match assistant.complete(&system, history, message).await {
        Ok(Some(answer)) => answer,
        Ok(None) => {
            tracing::warn!("Assistant returned an empty completion for {}", product.product.id);
            EMPTY_COMPLETION_ANSWER.to_string()
        }
        Err(e) => {
            tracing::error!("Assistant call failed for {}: {}", product.product.id, e);
            PROVIDER_FAILURE_ANSWER.to_string()
        }
    }
}
