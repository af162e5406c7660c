use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::api::handlers::{self, AppState};
use crate::store::GraphStore;

pub fn create_router<S: GraphStore + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Store bootstrap
        .route("/init", post(handlers::init_store::<S>))
        // Organizations
        .route("/organizations", post(handlers::create_organization::<S>))
        .route(
            "/organizations/:name",
            delete(handlers::delete_organization::<S>),
        )
        // Databases
        .route(
            "/databases",
            post(handlers::create_database::<S>).get(handlers::list_databases::<S>),
        )
        .route(
            "/databases/:org/:name",
            axum::routing::patch(handlers::update_database::<S>)
                .delete(handlers::delete_database::<S>),
        )
        // Branches
        .route(
            "/databases/:org/:name/branches",
            post(handlers::create_branch::<S>),
        )
        .route(
            "/databases/:org/:name/branches/:branch",
            delete(handlers::delete_branch::<S>),
        )
        // Graph access
        .route("/query", post(handlers::query::<S>))
        .route("/quads", post(handlers::update_quads::<S>))
}
