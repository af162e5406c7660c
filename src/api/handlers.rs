use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::CatalogError;
use crate::logic::Catalog;
use crate::model::{
    Binding, DatabaseListing, DatabaseOptions, DatabaseUpdate, Quad, QuadPattern, Subject,
};
use crate::store::GraphStore;

pub type AppState<S> = Arc<Catalog<S>>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

type HandlerResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Map the error taxonomy onto HTTP statuses. The error text is the kind's
/// rendering; clients can match on status plus text.
fn error_reply(error: CatalogError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &error {
        CatalogError::BadDescriptorPath(_) | CatalogError::SchemaViolation(_) => {
            StatusCode::BAD_REQUEST
        }
        CatalogError::InvalidDatabaseName(_)
        | CatalogError::InvalidBranchName(_)
        | CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::AlreadyExists(_)
        | CatalogError::OrganizationNotEmpty(_)
        | CatalogError::DefaultBranchProtected(_) => StatusCode::CONFLICT,
        CatalogError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        CatalogError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::new(&error.to_string())))
}

#[derive(Debug, Deserialize)]
pub struct InitRequest {
    #[serde(default)]
    pub force: bool,
}

pub async fn init_store<S: GraphStore>(
    State(catalog): State<AppState<S>>,
    RequestJson(request): RequestJson<InitRequest>,
) -> HandlerResult<MessageResponse> {
    catalog
        .initialize(request.force)
        .await
        .map_err(error_reply)?;
    Ok(Json(MessageResponse {
        message: "Successfully initialised database".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
}

pub async fn create_organization<S: GraphStore>(
    State(catalog): State<AppState<S>>,
    subject: Subject,
    RequestJson(request): RequestJson<CreateOrganizationRequest>,
) -> HandlerResult<MessageResponse> {
    catalog
        .create_organization(&subject, &request.name)
        .await
        .map_err(error_reply)?;
    Ok(Json(MessageResponse {
        message: format!("Organization created: {}", request.name),
    }))
}

pub async fn delete_organization<S: GraphStore>(
    State(catalog): State<AppState<S>>,
    subject: Subject,
    Path(name): Path<String>,
) -> HandlerResult<MessageResponse> {
    catalog
        .delete_organization(&subject, &name)
        .await
        .map_err(error_reply)?;
    Ok(Json(MessageResponse {
        message: format!("Organization deleted: {}", name),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateDatabaseRequest {
    pub organization: String,
    pub name: String,
    #[serde(flatten)]
    pub options: DatabaseOptions,
}

pub async fn create_database<S: GraphStore>(
    State(catalog): State<AppState<S>>,
    subject: Subject,
    RequestJson(request): RequestJson<CreateDatabaseRequest>,
) -> HandlerResult<MessageResponse> {
    let CreateDatabaseRequest {
        organization,
        name,
        options,
    } = request;
    catalog
        .create_database(&subject, &organization, &name, options)
        .await
        .map_err(error_reply)?;
    Ok(Json(MessageResponse {
        message: format!("Database created: {}/{}", organization, name),
    }))
}

pub async fn delete_database<S: GraphStore>(
    State(catalog): State<AppState<S>>,
    subject: Subject,
    Path((organization, name)): Path<(String, String)>,
) -> HandlerResult<MessageResponse> {
    catalog
        .delete_database(&subject, &organization, &name)
        .await
        .map_err(error_reply)?;
    Ok(Json(MessageResponse {
        message: format!("Database deleted: {}/{}", organization, name),
    }))
}

pub async fn update_database<S: GraphStore>(
    State(catalog): State<AppState<S>>,
    subject: Subject,
    Path((organization, name)): Path<(String, String)>,
    RequestJson(update): RequestJson<DatabaseUpdate>,
) -> HandlerResult<MessageResponse> {
    let path = format!("{}/{}", organization, name);
    catalog
        .update_database(&subject, &path, update)
        .await
        .map_err(error_reply)?;
    Ok(Json(MessageResponse {
        message: format!("Database updated: {}", path),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Comma-separated descriptor paths. Empty means every visible database.
    pub filter: Option<String>,
    /// Include branch names in each record.
    pub branches: Option<bool>,
}

pub async fn list_databases<S: GraphStore>(
    State(catalog): State<AppState<S>>,
    subject: Subject,
    Query(query): Query<ListQuery>,
) -> HandlerResult<ListResponse<DatabaseListing>> {
    let filters: Vec<String> = query
        .filter
        .as_deref()
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let items = catalog
        .list_databases(&subject, &filters, query.branches.unwrap_or(false))
        .await
        .map_err(error_reply)?;
    let total = items.len();
    Ok(Json(ListResponse { items, total }))
}

#[derive(Debug, Deserialize)]
pub struct CreateBranchRequest {
    pub name: String,
}

pub async fn create_branch<S: GraphStore>(
    State(catalog): State<AppState<S>>,
    subject: Subject,
    Path((organization, database)): Path<(String, String)>,
    RequestJson(request): RequestJson<CreateBranchRequest>,
) -> HandlerResult<MessageResponse> {
    catalog
        .create_branch(&subject, &organization, &database, &request.name)
        .await
        .map_err(error_reply)?;
    Ok(Json(MessageResponse {
        message: format!(
            "Branch created: {}/{}/local/branch/{}",
            organization, database, request.name
        ),
    }))
}

pub async fn delete_branch<S: GraphStore>(
    State(catalog): State<AppState<S>>,
    subject: Subject,
    Path((organization, database, branch)): Path<(String, String, String)>,
) -> HandlerResult<MessageResponse> {
    catalog
        .delete_branch(&subject, &organization, &database, &branch)
        .await
        .map_err(error_reply)?;
    Ok(Json(MessageResponse {
        message: format!(
            "Branch deleted: {}/{}/local/branch/{}",
            organization, database, branch
        ),
    }))
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub path: String,
    pub patterns: Vec<QuadPattern>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub bindings: Vec<Binding>,
    pub total: usize,
}

pub async fn query<S: GraphStore>(
    State(catalog): State<AppState<S>>,
    subject: Subject,
    RequestJson(request): RequestJson<QueryRequest>,
) -> HandlerResult<QueryResponse> {
    let bindings: Vec<Binding> = catalog
        .query(&subject, &request.path, &request.patterns)
        .await
        .map_err(error_reply)?
        .collect();
    let total = bindings.len();
    Ok(Json(QueryResponse { bindings, total }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuadAction {
    Insert,
    Remove,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuadsRequest {
    pub path: String,
    pub action: QuadAction,
    pub quads: Vec<Quad>,
}

pub async fn update_quads<S: GraphStore>(
    State(catalog): State<AppState<S>>,
    subject: Subject,
    RequestJson(request): RequestJson<UpdateQuadsRequest>,
) -> HandlerResult<MessageResponse> {
    let UpdateQuadsRequest { path, action, quads } = request;
    let count = quads.len();
    match action {
        QuadAction::Insert => catalog
            .insert_quads(&subject, &path, quads)
            .await
            .map_err(error_reply)?,
        QuadAction::Remove => catalog
            .remove_quads(&subject, &path, quads)
            .await
            .map_err(error_reply)?,
    }
    Ok(Json(MessageResponse {
        message: format!("Applied {} quad(s) to {}", count, path),
    }))
}
