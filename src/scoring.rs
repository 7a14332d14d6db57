//! Match score and product decoration.
//!
//! The score is a heuristic desirability signal: lower APR and a lower
//! credit-score requirement raise it, a wider tenure window raises it too.

use crate::badges;
use crate::models::{Product, RankedProduct};
use std::cmp::Ordering;

const APR_WEIGHT: f64 = 0.55;
const CREDIT_WEIGHT: f64 = 0.25;
const TENURE_WEIGHT: f64 = 0.20;

const APR_FLOOR: f64 = 0.1;
const CREDIT_SCORE_FLOOR: f64 = 300.0;
/// Tenure span (months) that maps to a tenure component of 1.0.
const TENURE_NORMALIZER: f64 = 120.0;
/// Tenure component used when the span is zero or negative.
const TENURE_COMPONENT_FLOOR: f64 = 0.1;

/// Computes the match score, rounded to 3 decimal places.
///
/// Depends only on APR, minimum credit score and the tenure window, so the
/// same inputs always produce the same value. Not clamped: very wide tenure
/// windows can push the tenure term past its nominal weight.
pub fn score(product: &Product) -> f64 {
    let apr_component = 1.0 / product.rate_apr.max(APR_FLOOR);
    let credit_component = 1.0 / f64::from(product.min_credit_score).max(CREDIT_SCORE_FLOOR);

    let span = product.tenure_span();
    let tenure_component = if span > 0 {
        f64::from(span) / TENURE_NORMALIZER
    } else {
        TENURE_COMPONENT_FLOOR
    };

    let raw = APR_WEIGHT * apr_component
        + CREDIT_WEIGHT * credit_component
        + TENURE_WEIGHT * tenure_component;

    round_to_thousandths(raw)
}

fn round_to_thousandths(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Decorates a canonical product with freshly derived badges and score.
///
/// Derived fields are recomputed from the canonical fields on every call,
/// so re-decorating a product never compounds them.
pub fn attach_badges_and_score(product: Product) -> RankedProduct {
    let badges = badges::classify(&product);
    let match_score = score(&product);
    RankedProduct {
        product,
        badges,
        match_score,
    }
}

/// Stable sort by descending match score.
pub fn rank_by_score(products: &mut [RankedProduct]) {
    products.sort_by(|a, b| {
        b.match_score
            .partial_cmp(&a.match_score)
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DisbursalSpeed, LoanType};

    fn product(apr: f64, credit: i32, tenure_min: i32, tenure_max: i32) -> Product {
        Product {
            id: format!("p-{}-{}", apr, credit),
            product_name: "Scored Loan".to_string(),
            bank: "Test Bank".to_string(),
            loan_type: LoanType::Personal,
            rate_apr: apr,
            min_income: 40_000.0,
            min_credit_score: credit,
            tenure_min_months: tenure_min,
            tenure_max_months: tenure_max,
            processing_fee_pct: None,
            prepayment_allowed: Some(true),
            disbursal_speed: Some(DisbursalSpeed::Fast),
            docs_level: None,
            summary: None,
            faq: None,
            terms: None,
        }
    }

    #[test]
    fn test_reference_product_score() {
        // 0.55/10.5 + 0.25/680 + 0.2 * 48/120 ~= 0.13275
        assert_eq!(score(&product(10.5, 680, 12, 60)), 0.133);
    }

    #[test]
    fn test_zero_span_uses_tenure_floor() {
        // 0.55/10 + 0.25/700 + 0.2 * 0.1 = 0.075357
        assert_eq!(score(&product(10.0, 700, 24, 24)), 0.075);
    }

    #[test]
    fn test_inverted_span_uses_tenure_floor() {
        assert_eq!(
            score(&product(10.0, 700, 60, 12)),
            score(&product(10.0, 700, 24, 24))
        );
    }

    #[test]
    fn test_apr_and_credit_floors() {
        // apr clamps to 0.1, credit clamps to 300
        let floored = score(&product(0.0, 0, 0, 0));
        let explicit = score(&product(0.1, 300, 0, 0));
        assert_eq!(floored, explicit);
        assert_eq!(floored, 5.521);
    }

    #[test]
    fn test_lower_apr_scores_higher() {
        assert!(score(&product(9.0, 700, 12, 60)) > score(&product(14.0, 700, 12, 60)));
    }

    #[test]
    fn test_wide_tenure_is_not_clamped() {
        // 360-month home loan window: tenure term alone is 0.2 * 3.0
        let wide = score(&product(8.5, 750, 0, 360));
        assert!(wide > 0.6);
    }

    #[test]
    fn test_decoration_is_idempotent() {
        let ranked = attach_badges_and_score(product(10.5, 680, 12, 60));
        let again = attach_badges_and_score(ranked.product.clone());
        assert_eq!(ranked, again);
        assert_eq!(ranked.match_score, 0.133);
    }

    #[test]
    fn test_rank_by_score_is_descending_and_stable() {
        let mut ranked = vec![
            attach_badges_and_score(product(14.0, 700, 12, 60)),
            attach_badges_and_score(product(9.0, 700, 12, 60)),
            attach_badges_and_score(product(14.0, 700, 12, 60)),
        ];
        ranked[2].product.id = "second-tie".to_string();

        rank_by_score(&mut ranked);

        assert_eq!(ranked[0].product.rate_apr, 9.0);
        assert_eq!(ranked[1].product.id, "p-14-700");
        assert_eq!(ranked[2].product.id, "second-tie");
    }
}
