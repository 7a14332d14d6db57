//! Request validation with field-level error detail.
//!
//! Failures are reported as `{ "formErrors": [...], "fieldErrors": { field: [...] } }`
//! so clients can attach messages to individual inputs.

use crate::errors::AppError;
use crate::models::{ChatMessage, ChatRole, ProductFilters};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Hard cap on `limit` for list queries.
pub const MAX_LIMIT: usize = 50;
/// Default size of the top-picks list.
pub const DEFAULT_TOP_LIMIT: usize = 5;

pub const MESSAGE_MIN_CHARS: usize = 3;
pub const MESSAGE_MAX_CHARS: usize = 400;
pub const HISTORY_MAX_ITEMS: usize = 10;
pub const HISTORY_CONTENT_MAX_CHARS: usize = 800;

/// Accumulates validation failures.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FieldErrors {
    form_errors: Vec<String>,
    field_errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form(&mut self, message: impl Into<String>) {
        self.form_errors.push(message.into());
    }

    pub fn field(&mut self, field: &str, message: impl Into<String>) {
        self.field_errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.form_errors.is_empty() && self.field_errors.is_empty()
    }

    pub fn to_value(&self) -> Value {
        json!({
            "formErrors": self.form_errors,
            "fieldErrors": self.field_errors,
        })
    }

    /// Single form-level failure, e.g. an unparseable body.
    pub fn form_error(message: &str, form_error: impl Into<String>) -> AppError {
        let mut errors = Self::new();
        errors.form(form_error);
        errors.into_error(message)
    }

    pub fn into_error(self, message: &str) -> AppError {
        AppError::Validation {
            message: message.to_string(),
            details: self.to_value(),
        }
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn finish<T>(self, message: &str, value: T) -> Result<T, AppError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self.into_error(message))
        }
    }
}

fn parse_number(raw: &str) -> Result<f64, String> {
    let trimmed = raw.trim();
    // an empty string coerces to zero
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_nan() => Err("Expected number, received nan".to_string()),
        Ok(value) if value.is_infinite() => Err("Number must be finite".to_string()),
        Ok(value) => Ok(value),
        Err(_) => Err("Expected number, received nan".to_string()),
    }
}

fn parse_positive_number(raw: &str) -> Result<f64, String> {
    let value = parse_number(raw)?;
    if value <= 0.0 {
        return Err("Number must be greater than 0".to_string());
    }
    Ok(value)
}

fn parse_positive_integer(raw: &str, max: Option<i64>) -> Result<i64, String> {
    let value = parse_number(raw)?;
    if value.fract() != 0.0 {
        return Err("Expected integer, received float".to_string());
    }
    if value <= 0.0 {
        return Err("Number must be greater than 0".to_string());
    }
    if let Some(upper) = max {
        if value > upper as f64 {
            return Err(format!("Number must be less than or equal to {}", upper));
        }
    }
    // float-to-int casts saturate
    Ok(value as i64)
}

/// Validates list query parameters. Unknown parameters are ignored.
pub fn parse_product_filters(params: &HashMap<String, String>) -> Result<ProductFilters, AppError> {
    let mut errors = FieldErrors::new();
    let mut filters = ProductFilters {
        bank: params
            .get("bank")
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty()),
        ..Default::default()
    };

    let number = |field: &str, errors: &mut FieldErrors| {
        params
            .get(field)
            .and_then(|raw| match parse_positive_number(raw) {
                Ok(value) => Some(value),
                Err(message) => {
                    errors.field(field, message);
                    None
                }
            })
    };

    filters.min_apr = number("minApr", &mut errors);
    filters.max_apr = number("maxApr", &mut errors);
    filters.min_income = number("minIncome", &mut errors);

    if let Some(raw) = params.get("minCredit") {
        match parse_positive_integer(raw, None) {
            // clamped; every stored threshold fits in i32
            Ok(value) => filters.min_credit = Some(i32::try_from(value).unwrap_or(i32::MAX)),
            Err(message) => errors.field("minCredit", message),
        }
    }
    if let Some(raw) = params.get("limit") {
        match parse_positive_integer(raw, Some(MAX_LIMIT as i64)) {
            Ok(value) => filters.limit = usize::try_from(value).ok(),
            Err(message) => errors.field("limit", message),
        }
    }

    errors.finish("Invalid filters", filters)
}

/// Validates the `limit` of the top-picks query, defaulting to 5.
pub fn parse_top_limit(params: &HashMap<String, String>) -> Result<usize, AppError> {
    let Some(raw) = params.get("limit") else {
        return Ok(DEFAULT_TOP_LIMIT);
    };

    match parse_positive_integer(raw, Some(MAX_LIMIT as i64)) {
        Ok(value) => Ok(usize::try_from(value).unwrap_or(DEFAULT_TOP_LIMIT)),
        Err(message) => {
            let mut errors = FieldErrors::new();
            errors.field("limit", message);
            Err(errors.into_error("Invalid filters"))
        }
    }
}

/// Validated body of `POST /ai/ask`.
#[derive(Debug, Clone, PartialEq)]
pub struct AskRequest {
    pub product_id: Uuid,
    pub message: String,
    pub history: Vec<ChatMessage>,
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn check_length(value: &str, min: usize, max: usize) -> Result<(), String> {
    let chars = value.chars().count();
    if chars < min {
        return Err(format!("String must contain at least {} character(s)", min));
    }
    if chars > max {
        return Err(format!("String must contain at most {} character(s)", max));
    }
    Ok(())
}

fn required_string<'a>(
    body: &'a Map<String, Value>,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<&'a str> {
    match body.get(field) {
        None => {
            errors.field(field, "Required");
            None
        }
        Some(Value::String(s)) => Some(s.as_str()),
        Some(other) => {
            errors.field(field, format!("Expected string, received {}", type_name(other)));
            None
        }
    }
}

fn parse_history_item(item: &Value, errors: &mut FieldErrors) -> Option<ChatMessage> {
    let Value::Object(turn) = item else {
        errors.field(
            "history",
            format!("Expected object, received {}", type_name(item)),
        );
        return None;
    };

    let role = match turn.get("role") {
        Some(Value::String(role)) if role == "user" => Some(ChatRole::User),
        Some(Value::String(role)) if role == "assistant" => Some(ChatRole::Assistant),
        Some(Value::String(role)) => {
            errors.field(
                "history",
                format!(
                    "Invalid enum value. Expected 'user' | 'assistant', received '{}'",
                    role
                ),
            );
            None
        }
        None => {
            errors.field("history", "Required");
            None
        }
        Some(other) => {
            errors.field(
                "history",
                format!("Expected 'user' | 'assistant', received {}", type_name(other)),
            );
            None
        }
    };

    let content = match turn.get("content") {
        Some(Value::String(content)) => match check_length(content, 1, HISTORY_CONTENT_MAX_CHARS) {
            Ok(()) => Some(content.clone()),
            Err(message) => {
                errors.field("history", message);
                None
            }
        },
        None => {
            errors.field("history", "Required");
            None
        }
        Some(other) => {
            errors.field(
                "history",
                format!("Expected string, received {}", type_name(other)),
            );
            None
        }
    };

    Some(ChatMessage {
        role: role?,
        content: content?,
    })
}

/// Validates an ask body.
pub fn validate_ask_request(body: &Value) -> Result<AskRequest, AppError> {
    let Value::Object(body) = body else {
        return Err(FieldErrors::form_error(
            "Invalid request",
            format!("Expected object, received {}", type_name(body)),
        ));
    };

    let mut errors = FieldErrors::new();

    let product_id = required_string(body, "productId", &mut errors).and_then(|raw| {
        match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                errors.field("productId", "Invalid uuid");
                None
            }
        }
    });

    let message = required_string(body, "message", &mut errors).and_then(|raw| {
        match check_length(raw, MESSAGE_MIN_CHARS, MESSAGE_MAX_CHARS) {
            Ok(()) => Some(raw.to_string()),
            Err(message) => {
                errors.field("message", message);
                None
            }
        }
    });

    let history = match body.get("history") {
        None => Vec::new(),
        Some(Value::Array(items)) => {
            if items.len() > HISTORY_MAX_ITEMS {
                errors.field(
                    "history",
                    format!("Array must contain at most {} element(s)", HISTORY_MAX_ITEMS),
                );
            }
            items
                .iter()
                .filter_map(|item| parse_history_item(item, &mut errors))
                .collect()
        }
        Some(other) => {
            errors.field(
                "history",
                format!("Expected array, received {}", type_name(other)),
            );
            Vec::new()
        }
    };

    match (product_id, message) {
        (Some(product_id), Some(message)) if errors.is_empty() => Ok(AskRequest {
            product_id,
            message,
            history,
        }),
        _ => Err(errors.into_error("Invalid request")),
    }
}
