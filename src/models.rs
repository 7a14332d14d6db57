use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============ Product Models ============

/// Loan category a product belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanType {
    Personal,
    Education,
    Vehicle,
    Home,
    CreditLine,
    DebtConsolidation,
}

impl LoanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanType::Personal => "personal",
            LoanType::Education => "education",
            LoanType::Vehicle => "vehicle",
            LoanType::Home => "home",
            LoanType::CreditLine => "credit_line",
            LoanType::DebtConsolidation => "debt_consolidation",
        }
    }
}

impl fmt::Display for LoanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "personal" => Ok(LoanType::Personal),
            "education" => Ok(LoanType::Education),
            "vehicle" => Ok(LoanType::Vehicle),
            "home" => Ok(LoanType::Home),
            "credit_line" => Ok(LoanType::CreditLine),
            "debt_consolidation" => Ok(LoanType::DebtConsolidation),
            other => Err(format!("unknown loan type '{}'", other)),
        }
    }
}

/// How quickly the lender pays out once approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisbursalSpeed {
    Standard,
    Fast,
    Instant,
}

impl FromStr for DisbursalSpeed {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(DisbursalSpeed::Standard),
            "fast" => Ok(DisbursalSpeed::Fast),
            "instant" => Ok(DisbursalSpeed::Instant),
            other => Err(format!("unknown disbursal speed '{}'", other)),
        }
    }
}

/// Paperwork burden for the applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocsLevel {
    Standard,
    Low,
    Minimal,
}

impl FromStr for DocsLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(DocsLevel::Standard),
            "low" => Ok(DocsLevel::Low),
            "minimal" => Ok(DocsLevel::Minimal),
            other => Err(format!("unknown docs level '{}'", other)),
        }
    }
}

/// A single question/answer pair shown on a product card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

/// Free-form lender terms (string, number or boolean values).
pub type Terms = serde_json::Map<String, serde_json::Value>;

/// Canonical loan product as stored by the ingestion pipeline.
///
/// Only canonical fields live here. Badges and match score are derived on
/// every read, see [`RankedProduct`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Opaque identifier (UUID text in practice).
    pub id: String,
    pub product_name: String,
    pub bank: String,
    pub loan_type: LoanType,
    /// Annual percentage rate, in percent.
    pub rate_apr: f64,
    /// Minimum monthly income required.
    pub min_income: f64,
    pub min_credit_score: i32,
    pub tenure_min_months: i32,
    pub tenure_max_months: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_fee_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepayment_allowed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disbursal_speed: Option<DisbursalSpeed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_level: Option<DocsLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faq: Option<Vec<FaqItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<Terms>,
}

impl Product {
    /// Difference between the longest and shortest tenure, in months.
    pub fn tenure_span(&self) -> i32 {
        self.tenure_max_months - self.tenure_min_months
    }
}

/// A product decorated with its derived attributes.
///
/// Serializes flat, so API consumers see one object with `badges` and
/// `match_score` next to the canonical fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedProduct {
    #[serde(flatten)]
    pub product: Product,
    pub badges: Vec<String>,
    pub match_score: f64,
}

// ============ Query Models ============

/// Optional-everything product query.
///
/// `min_income` and `min_credit` are upper bounds on the product's own
/// requirement: a product matches when it asks for at most that much.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_apr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_apr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_income: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_credit: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl ProductFilters {
    /// Filters that only cap the number of results.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Trimmed, lowercased bank needle. `None` when blank.
    pub fn bank_query(&self) -> Option<String> {
        self.bank
            .as_deref()
            .map(normalize_search)
            .filter(|needle| !needle.is_empty())
    }

    /// Evaluates every predicate except `limit` against a product.
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(needle) = self.bank_query() {
            if !normalize_search(&product.bank).contains(&needle) {
                return false;
            }
        }
        if let Some(min_apr) = self.min_apr {
            if product.rate_apr < min_apr {
                return false;
            }
        }
        if let Some(max_apr) = self.max_apr {
            if product.rate_apr > max_apr {
                return false;
            }
        }
        if let Some(income) = self.min_income {
            if product.min_income > income {
                return false;
            }
        }
        if let Some(credit) = self.min_credit {
            if product.min_credit_score > credit {
                return false;
            }
        }
        true
    }
}

/// Lowercases and trims a search string.
pub fn normalize_search(value: &str) -> String {
    value.trim().to_lowercase()
}

// ============ Chat Models ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One turn of a product conversation. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

// ============ API Payloads ============

/// Envelope for list endpoints: `{ "data": [...] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductListResponse {
    pub data: Vec<RankedProduct>,
}

/// Envelope for single product lookups: `{ "data": {...} }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductResponse {
    pub data: RankedProduct,
}

/// Answer returned by the ask endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

/// Result of a CSV hand-off to the ingestion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}
