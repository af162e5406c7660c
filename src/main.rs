use quad_db_rust::api::routes::create_router;
use quad_db_rust::config::AppConfig;
use quad_db_rust::logic::Catalog;
use quad_db_rust::store::MemoryStore;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new().filter_level(LevelFilter::Info).init();

    println!("QuadDB: Branch-Versioned Graph Store");

    // Load configuration
    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{}",
        config.server.host, config.server.port
    );

    let catalog = Arc::new(Catalog::new(Arc::new(MemoryStore::new())));
    if config.store.init_on_start && !catalog.is_initialized().await? {
        catalog.initialize(false).await?;
        println!("Successfully initialised database");
    }

    run_server(create_router().with_state(catalog), &config).await?;

    Ok(())
}

async fn run_server(app: axum::Router, config: &AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    println!("QuadDB server running on http://{}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
