//! Data resolver: answers product queries from the live store when one is
//! configured, and from the fixed catalog otherwise.

use crate::errors::AppError;
use crate::models::{ProductFilters, RankedProduct};
use crate::scoring::{attach_badges_and_score, rank_by_score};
use crate::store::{FixedCatalogStore, ProductStore};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// What to do when the live store fails a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpstreamErrorPolicy {
    /// Log the failure and serve from the fixed catalog.
    #[default]
    UseFallback,
    /// Surface the failure to the caller.
    Propagate,
}

impl UpstreamErrorPolicy {
    /// Applies the policy to a live-store failure.
    ///
    /// `Ok(())` means the caller should continue with the fallback catalog.
    pub fn on_error(self, store: &str, operation: &str, err: AppError) -> Result<(), AppError> {
        match self {
            UpstreamErrorPolicy::UseFallback => {
                tracing::warn!(
                    "Live store '{}' failed during {}, falling back to fixed catalog: {}",
                    store,
                    operation,
                    err
                );
                Ok(())
            }
            UpstreamErrorPolicy::Propagate => Err(err),
        }
    }
}

impl FromStr for UpstreamErrorPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fallback" | "use_fallback" => Ok(UpstreamErrorPolicy::UseFallback),
            "propagate" => Ok(UpstreamErrorPolicy::Propagate),
            other => Err(format!(
                "unknown upstream error policy '{}' (expected 'fallback' or 'propagate')",
                other
            )),
        }
    }
}

impl fmt::Display for UpstreamErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamErrorPolicy::UseFallback => f.write_str("fallback"),
            UpstreamErrorPolicy::Propagate => f.write_str("propagate"),
        }
    }
}

/// Resolves product lists and lookups, decorating every result.
///
/// Stores are chosen once at startup and injected; nothing here inspects
/// configuration. Every returned product carries freshly computed badges
/// and match score regardless of which store served it.
#[derive(Clone)]
pub struct ProductResolver {
    live: Option<Arc<dyn ProductStore>>,
    privileged: Option<Arc<dyn ProductStore>>,
    fallback: Arc<FixedCatalogStore>,
    policy: UpstreamErrorPolicy,
}

impl ProductResolver {
    /// Resolver that only serves the fixed catalog.
    pub fn new(fallback: FixedCatalogStore) -> Self {
        Self {
            live: None,
            privileged: None,
            fallback: Arc::new(fallback),
            policy: UpstreamErrorPolicy::default(),
        }
    }

    /// Store used for list queries (and lookups, unless a privileged store is set).
    pub fn with_live_store(mut self, store: Arc<dyn ProductStore>) -> Self {
        self.live = Some(store);
        self
    }

    /// Elevated-privilege store preferred for single-product lookups.
    pub fn with_privileged_store(mut self, store: Arc<dyn ProductStore>) -> Self {
        self.privileged = Some(store);
        self
    }

    pub fn with_policy(mut self, policy: UpstreamErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> UpstreamErrorPolicy {
        self.policy
    }

    /// Whether a live store is configured.
    pub fn has_live_store(&self) -> bool {
        self.live.is_some()
    }

    fn lookup_store(&self) -> Option<&Arc<dyn ProductStore>> {
        self.privileged.as_ref().or(self.live.as_ref())
    }

    /// Lists products matching `filters`, ascending by APR.
    pub async fn list(&self, filters: &ProductFilters) -> Result<Vec<RankedProduct>, AppError> {
        if let Some(store) = &self.live {
            match store.query(filters).await {
                Ok(products) => {
                    tracing::debug!("Live store '{}' returned {} products", store.name(), products.len());
                    return Ok(products.into_iter().map(attach_badges_and_score).collect());
                }
                Err(e) => self.policy.on_error(store.name(), "list", e)?,
            }
        }

        Ok(self
            .fallback
            .filter(filters)
            .into_iter()
            .map(attach_badges_and_score)
            .collect())
    }

    /// Looks a product up by id, falling back to the fixed catalog on a
    /// live-store miss or failure.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<RankedProduct>, AppError> {
        if let Some(store) = self.lookup_store() {
            match store.find_by_id(id).await {
                Ok(Some(product)) => return Ok(Some(attach_badges_and_score(product))),
                Ok(None) => {
                    tracing::debug!("Product {} not in live store '{}'", id, store.name());
                }
                Err(e) => self.policy.on_error(store.name(), "lookup", e)?,
            }
        }

        Ok(self.fallback.get(id).map(attach_badges_and_score))
    }

    /// Best `n` products by match score.
    ///
    /// The store-level cap is applied before the score re-sort, and the
    /// store orders by APR, so this is the best `n` among the `n` cheapest
    /// products rather than a global top-n by score.
    pub async fn top(&self, n: usize) -> Result<Vec<RankedProduct>, AppError> {
        let mut products = self.list(&ProductFilters::with_limit(n)).await?;
        rank_by_score(&mut products);
        products.truncate(n);
        Ok(products)
    }
}
