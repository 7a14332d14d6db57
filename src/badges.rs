//! Rule-based badge classifier.
//!
//! Rules are evaluated in table order and the labels of every firing rule
//! are kept, truncated to [`MAX_BADGES`]. New rules go at the end of
//! [`BADGE_RULES`] so existing output never reorders.

use crate::models::{DisbursalSpeed, DocsLevel, Product};
use serde_json::Value;

/// Upper bound on badges shown per product.
pub const MAX_BADGES: usize = 5;

/// Label used when no rule fires.
pub const DEFAULT_BADGE: &str = "Popular Pick";

/// A labelled predicate over a product.
pub struct BadgeRule {
    pub label: &'static str,
    pub predicate: fn(&Product) -> bool,
}

pub static BADGE_RULES: &[BadgeRule] = &[
    BadgeRule {
        label: "Low APR",
        predicate: |p| p.rate_apr <= 11.0,
    },
    BadgeRule {
        label: "No Prepayment",
        predicate: |p| p.prepayment_allowed == Some(true),
    },
    BadgeRule {
        label: "Fast Disbursal",
        predicate: |p| {
            matches!(
                p.disbursal_speed,
                Some(DisbursalSpeed::Fast) | Some(DisbursalSpeed::Instant)
            )
        },
    },
    BadgeRule {
        label: "Flexible Tenure",
        predicate: |p| p.tenure_span() >= 36,
    },
    BadgeRule {
        label: "Low Docs",
        predicate: |p| matches!(p.docs_level, Some(DocsLevel::Low) | Some(DocsLevel::Minimal)),
    },
    BadgeRule {
        label: "Salary Friendly",
        predicate: |p| p.min_income <= 45_000.0,
    },
    BadgeRule {
        label: "Credit Score Friendly",
        predicate: |p| p.min_credit_score <= 700,
    },
    BadgeRule {
        label: "Limited-Time Offer",
        predicate: has_limited_time_offer,
    },
];

/// Classifies a product into an ordered list of badge labels.
///
/// Always returns between 1 and [`MAX_BADGES`] labels.
pub fn classify(product: &Product) -> Vec<String> {
    let badges: Vec<String> = BADGE_RULES
        .iter()
        .filter(|rule| (rule.predicate)(product))
        .take(MAX_BADGES)
        .map(|rule| rule.label.to_string())
        .collect();

    if badges.is_empty() {
        vec![DEFAULT_BADGE.to_string()]
    } else {
        badges
    }
}

fn has_limited_time_offer(product: &Product) -> bool {
    product
        .terms
        .as_ref()
        .and_then(|terms| terms.get("limited_time_offer"))
        .map(is_truthy)
        .unwrap_or(false)
}

/// Loose truthiness for free-form term values.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number
            .as_f64()
            .map(|n| n != 0.0 && !n.is_nan())
            .unwrap_or(false),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
