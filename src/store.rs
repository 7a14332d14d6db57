//! Product storage capability and the built-in fallback catalog.

use crate::errors::AppError;
use crate::models::{Product, ProductFilters};
use async_trait::async_trait;
use std::cmp::Ordering;

/// Embedded fixed catalog served when no live store is configured or reachable.
const FALLBACK_CATALOG_JSON: &str = include_str!("../data/fallback_products.json");

/// A queryable collection of canonical products.
///
/// Implementations return undecorated products; badges and match score are
/// attached by the resolver on the way out.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Products matching `filters`, sorted by ascending APR and capped at
    /// `filters.limit` when set.
    async fn query(&self, filters: &ProductFilters) -> Result<Vec<Product>, AppError>;

    /// Single product by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<Product>, AppError>;
}

/// In-memory product catalog.
#[derive(Debug, Clone)]
pub struct FixedCatalogStore {
    products: Vec<Product>,
}

impl FixedCatalogStore {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Loads the catalog bundled with the binary.
    pub fn builtin() -> Result<Self, AppError> {
        let products: Vec<Product> = serde_json::from_str(FALLBACK_CATALOG_JSON).map_err(|e| {
            AppError::InternalError(format!("Failed to parse fallback catalog: {}", e))
        })?;
        tracing::debug!("Loaded fallback catalog with {} products", products.len());
        Ok(Self::new(products))
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Same predicate and ordering semantics as the live store, evaluated in memory.
    pub fn filter(&self, filters: &ProductFilters) -> Vec<Product> {
        let mut matched: Vec<Product> = self
            .products
            .iter()
            .filter(|product| filters.matches(product))
            .cloned()
            .collect();

        matched.sort_by(|a, b| {
            a.rate_apr
                .partial_cmp(&b.rate_apr)
                .unwrap_or(Ordering::Equal)
        });

        if let Some(limit) = filters.limit {
            matched.truncate(limit);
        }

        matched
    }

    pub fn get(&self, id: &str) -> Option<Product> {
        self.products.iter().find(|p| p.id == id).cloned()
    }
}

#[async_trait]
impl ProductStore for FixedCatalogStore {
    fn name(&self) -> &'static str {
        "fixed-catalog"
    }

    async fn query(&self, filters: &ProductFilters) -> Result<Vec<Product>, AppError> {
        Ok(self.filter(filters))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Product>, AppError> {
        Ok(self.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use uuid::Uuid;

    #[test]
    fn test_builtin_catalog_loads() {
        let store = FixedCatalogStore::builtin().expect("catalog parses");
        assert_eq!(store.products().len(), 10);
    }

    #[test]
    fn test_builtin_ids_are_unique_uuids() {
        let store = FixedCatalogStore::builtin().unwrap();
        let mut seen = HashSet::new();
        for product in store.products() {
            assert!(Uuid::parse_str(&product.id).is_ok(), "bad id {}", product.id);
            assert!(seen.insert(product.id.clone()), "duplicate id {}", product.id);
            assert!(product.tenure_min_months <= product.tenure_max_months);
        }
    }

    #[test]
    fn test_filter_sorts_by_ascending_apr() {
        let store = FixedCatalogStore::builtin().unwrap();
        let all = store.filter(&ProductFilters::default());

        assert_eq!(all.len(), store.products().len());
        assert!(all.windows(2).all(|w| w[0].rate_apr <= w[1].rate_apr));
    }

    #[test]
    fn test_filter_applies_limit_after_sorting() {
        let store = FixedCatalogStore::builtin().unwrap();
        let two = store.filter(&ProductFilters::with_limit(2));

        assert_eq!(two.len(), 2);
        assert_eq!(two[0].rate_apr, 8.4);
        assert_eq!(two[1].rate_apr, 8.65);
    }

    #[test]
    fn test_filter_by_bank() {
        let store = FixedCatalogStore::builtin().unwrap();
        let hdfc = store.filter(&ProductFilters {
            bank: Some("hdfc".to_string()),
            ..Default::default()
        });

        assert_eq!(hdfc.len(), 2);
        assert!(hdfc.iter().all(|p| p.bank == "HDFC Bank"));
    }

    #[test]
    fn test_apr_floor_above_catalog_returns_empty() {
        let store = FixedCatalogStore::builtin().unwrap();
        let none = store.filter(&ProductFilters {
            min_apr: Some(25.0),
            ..Default::default()
        });
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let store = FixedCatalogStore::builtin().unwrap();
        let found = store
            .find_by_id("3f1c9a52-7b8e-4d21-9c34-5a6e7f8b9c01")
            .await
            .unwrap();
        assert_eq!(found.map(|p| p.product_name), Some("SmartSalary Personal Loan".to_string()));

        let missing = store.find_by_id("does-not-exist").await.unwrap();
        assert!(missing.is_none());
    }
}
