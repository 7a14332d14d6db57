use crate::errors::{AppError, ResultExt};
use crate::models::{FaqItem, Product, ProductFilters, Terms};
use crate::store::ProductStore;
use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

/// Column list for the `products` table.
///
/// Numeric columns are cast so that both `numeric` and floating point
/// schemas decode into the same row shape.
const PRODUCT_COLUMNS: &str = "id::text AS id, \
     name, \
     bank, \
     type::text AS loan_type, \
     rate_apr::numeric AS rate_apr, \
     min_income::numeric AS min_income, \
     min_credit_score::int4 AS min_credit_score, \
     tenure_min_months::int4 AS tenure_min_months, \
     tenure_max_months::int4 AS tenure_max_months, \
     processing_fee_pct::numeric AS processing_fee_pct, \
     prepayment_allowed, \
     disbursal_speed::text AS disbursal_speed, \
     docs_level::text AS docs_level, \
     summary, \
     faq::jsonb AS faq, \
     terms::jsonb AS terms";

/// Raw row as stored by the ingestion pipeline.
#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    name: String,
    bank: String,
    loan_type: String,
    rate_apr: BigDecimal,
    min_income: BigDecimal,
    min_credit_score: i32,
    tenure_min_months: i32,
    tenure_max_months: i32,
    processing_fee_pct: Option<BigDecimal>,
    prepayment_allowed: Option<bool>,
    disbursal_speed: Option<String>,
    docs_level: Option<String>,
    summary: Option<String>,
    faq: Option<Json<Vec<FaqItem>>>,
    terms: Option<Json<Terms>>,
}

impl TryFrom<ProductRow> for Product {
    type Error = AppError;

    /// Normalizes the storage shape (`name`, `type`, nullable optionals)
    /// into the API shape.
    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let loan_type = row.loan_type.parse().map_err(|e| {
            AppError::InternalError(format!("Product {} has {}", row.id, e))
        })?;

        let rate_apr = decimal_to_f64(&row.rate_apr, "rate_apr", &row.id)?;
        let min_income = decimal_to_f64(&row.min_income, "min_income", &row.id)?;
        let processing_fee_pct = row.processing_fee_pct.as_ref().and_then(|d| d.to_f64());

        Ok(Product {
            id: row.id,
            product_name: row.name,
            bank: row.bank,
            loan_type,
            rate_apr,
            min_income,
            min_credit_score: row.min_credit_score,
            tenure_min_months: row.tenure_min_months,
            tenure_max_months: row.tenure_max_months,
            processing_fee_pct,
            prepayment_allowed: row.prepayment_allowed,
            disbursal_speed: row.disbursal_speed.and_then(|s| s.parse().ok()),
            docs_level: row.docs_level.and_then(|s| s.parse().ok()),
            summary: row.summary,
            faq: row.faq.map(|Json(faq)| faq),
            terms: row.terms.map(|Json(terms)| terms),
        })
    }
}

fn decimal_to_f64(value: &BigDecimal, column: &str, id: &str) -> Result<f64, AppError> {
    value.to_f64().ok_or_else(|| {
        AppError::InternalError(format!("Product {} has out-of-range {}", id, column))
    })
}

/// Escapes `%`, `_` and `\` so user input matches literally inside `ILIKE`.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Appends filter predicates, APR ordering and the optional limit.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &ProductFilters) {
    builder.push(" WHERE TRUE");

    if let Some(needle) = filters.bank_query() {
        builder
            .push(" AND bank ILIKE ")
            .push_bind(format!("%{}%", escape_like(&needle)));
    }
    if let Some(min_apr) = filters.min_apr {
        builder.push(" AND rate_apr >= ").push_bind(min_apr);
    }
    if let Some(max_apr) = filters.max_apr {
        builder.push(" AND rate_apr <= ").push_bind(max_apr);
    }
    if let Some(income) = filters.min_income {
        builder.push(" AND min_income <= ").push_bind(income);
    }
    if let Some(credit) = filters.min_credit {
        builder.push(" AND min_credit_score <= ").push_bind(credit);
    }

    builder.push(" ORDER BY rate_apr ASC");

    if let Some(limit) = filters.limit {
        builder
            .push(" LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }
}

/// Converts rows, skipping any the API cannot represent.
fn rows_into_products(rows: Vec<ProductRow>) -> Vec<Product> {
    rows.into_iter()
        .filter_map(|row| match Product::try_from(row) {
            Ok(product) => Some(product),
            Err(e) => {
                tracing::warn!("Skipping product row: {}", e);
                None
            }
        })
        .collect()
}

/// Live product store backed by the PostgreSQL `products` table.
#[derive(Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn query(&self, filters: &ProductFilters) -> Result<Vec<Product>, AppError> {
        let mut builder = QueryBuilder::new(format!("SELECT {} FROM products", PRODUCT_COLUMNS));
        push_filters(&mut builder, filters);

        tracing::debug!("Querying products: {}", builder.sql());

        let rows: Vec<ProductRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .context("Failed to query products")?;

        Ok(rows_into_products(rows))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Product>, AppError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id::text = $1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to load product {}", id))?;

        row.map(Product::try_from).transpose()
    }
}
