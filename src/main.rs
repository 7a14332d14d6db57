use rust_loan_finder_api::{
    api,
    assistant_client::AssistantClient,
    catalog::ProductResolver,
    config::{redact_url, Config},
    db::Database,
    db_storage::PgProductStore,
    handlers::AppState,
    store::{FixedCatalogStore, ProductStore},
    upload_client::UploadClient,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Connects a lazy pool and reports (without failing) whether it answers.
async fn connect_store(label: &str, url: &str) -> anyhow::Result<Arc<dyn ProductStore>> {
    let db = Database::connect_lazy(url)?;
    match db.ping().await {
        Ok(()) => tracing::info!("{} database reachable", label),
        Err(e) => tracing::warn!(
            "{} database not reachable yet, requests will fall back as configured: {}",
            label,
            e
        ),
    }
    Ok(Arc::new(PgProductStore::new(db.pool)))
}

/// Main entry point for the application.
///
/// Loads configuration, selects product stores by configuration presence,
/// builds the optional provider and upload clients, then serves HTTP.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_loan_finder_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let fallback = FixedCatalogStore::builtin()?;
    tracing::info!("Fixed catalog loaded ({} products)", fallback.products().len());

    let mut catalog =
        ProductResolver::new(fallback).with_policy(config.upstream_error_policy);

    if let Some(url) = config.database_url.as_deref() {
        catalog = catalog.with_live_store(connect_store("Live", url).await?);
    }
    if let Some(url) = config.database_service_url.as_deref() {
        catalog = catalog.with_privileged_store(connect_store("Service", url).await?);
    }

    let assistant = match config.openai_api_key.clone() {
        Some(api_key) => match AssistantClient::new(
            config.openai_base_url.clone(),
            api_key,
            config.openai_model.clone(),
        ) {
            Ok(client) => {
                tracing::info!("✓ Assistant client initialized: {}", config.openai_model);
                Some(client)
            }
            Err(e) => {
                tracing::error!("Failed to initialize assistant client: {}", e);
                None
            }
        },
        None => None,
    };

    let uploads = match config.upload_service_url.clone() {
        Some(url) => match UploadClient::new(url.clone()) {
            Ok(client) => {
                tracing::info!("✓ Upload client initialized: {}", redact_url(&url));
                Some(client)
            }
            Err(e) => {
                tracing::error!("Failed to initialize upload client: {}", e);
                None
            }
        },
        None => None,
    };

    // Build application state
    let app_state = Arc::new(AppState {
        catalog,
        assistant,
        uploads,
    });

    let app = api::router(app_state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
