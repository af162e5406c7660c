pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

// Export the error taxonomy
pub use error::CatalogError;

// Export logic types
pub use logic::{Action, AuthorizationGate, Catalog, Resolver, Role, SchemaModeController};

// Export all model types
pub use model::*;

// Export store types
pub use store::{GraphStore, MemoryStore, StoreOp};

// Function for integration testing
pub async fn run_server() -> anyhow::Result<()> {
    use std::sync::Arc;
    use tokio::net::TcpListener;

    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with INFO level only (suppress DEBUG logs)
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    // Load configuration
    let config = crate::config::AppConfig::load()?;

    let catalog = Arc::new(Catalog::new(Arc::new(MemoryStore::new())));
    if config.store.init_on_start && !catalog.is_initialized().await? {
        catalog.initialize(false).await?;
    }

    // Create router with state
    let app = crate::api::routes::create_router().with_state(catalog);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
