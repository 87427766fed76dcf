//! JSON API server.
//!
//! Exposes workspace CRUD and the three AI features over a CORS-permissive
//! JSON API for the web client.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/workspaces` | List workspace names |
//! | `POST` | `/workspaces` | Ensure-or-create a workspace |
//! | `GET`  | `/workspaces/{ws}/documents` | Document picker listing |
//! | `GET`  | `/workspaces/{ws}/pages` | Page listing with tags |
//! | `POST` | `/pages` | Add a page (embeds synchronously) |
//! | `PUT`  | `/pages/{id}` | Update a page (re-embeds on content change) |
//! | `DELETE` | `/pages/{id}?workspace=…` | Delete a page |
//! | `POST` | `/ask` | Answer a question against a workspace |
//! | `POST` | `/extract_links` | Suggest related pages for a draft text |
//! | `POST` | `/generate_tags` | Generate tags for a workspace or text |
//! | `GET`  | `/knowledge_graph/{ws}` | Derive the workspace graph |
//! | `POST` | `/upload_file/{ws}` | Ingest a `.txt`/`.md` file as a page |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Invalid workspace name" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `model_unavailable` (503), `internal` (500). Per-unit failures inside a
//! batch (one chunk failing to score) never fail the request.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use lorebook_core::adapter::ModelAdapter;
use lorebook_core::aggregate::{answer_question, generate_tags, suggest_links};
use lorebook_core::graph::build_graph;
use lorebook_core::store::{sanitize_workspace_name, WorkspaceStore};
use lorebook_core::Error;

use crate::config::Config;
use crate::service;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn WorkspaceStore>,
    pub adapter: Arc<dyn ModelAdapter>,
}

/// Starts the JSON API server.
///
/// Binds to the address configured in `[server].bind` and serves until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = service::build_store(config)?;
    let adapter: Arc<dyn ModelAdapter> =
        Arc::from(crate::adapter_http::create_adapter(&config.adapter)?);

    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        adapter,
    };

    let bind_addr = state.config.server.bind.clone();
    let app = build_router(state);

    println!("Lorebook API listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Assemble the router. Split from [`run_server`] so tests can drive the
/// handlers without binding a socket.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/workspaces", get(handle_list_workspaces))
        .route("/workspaces", post(handle_create_workspace))
        .route("/workspaces/{ws}/documents", get(handle_list_documents))
        .route("/workspaces/{ws}/pages", get(handle_list_pages))
        .route("/pages", post(handle_add_page))
        .route("/pages/{id}", put(handle_update_page))
        .route("/pages/{id}", delete(handle_delete_page))
        .route("/ask", post(handle_ask))
        .route("/extract_links", post(handle_extract_links))
        .route("/generate_tags", post(handle_generate_tags))
        .route("/knowledge_graph/{ws}", get(handle_knowledge_graph))
        .route("/upload_file/{ws}", post(handle_upload_file))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// Map a core error onto the failure taxonomy: validation → 400,
/// capability → 503, missing → 404, everything else → opaque 500.
impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidInput(msg) => bad_request(msg),
            Error::ModelUnavailable(what) => AppError {
                status: StatusCode::SERVICE_UNAVAILABLE,
                code: "model_unavailable".to_string(),
                message: format!("{} model not available", what),
            },
            Error::NotFound(what) => not_found(format!("{} not found", what)),
            Error::Internal(e) => {
                error!(error = %e, "unexpected failure");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal".to_string(),
                    message: "An unexpected error occurred".to_string(),
                }
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::from(Error::Internal(err))
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Workspaces ============

async fn handle_list_workspaces(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.store.list_workspaces().await?))
}

#[derive(Deserialize)]
struct CreateWorkspaceRequest {
    workspace: String,
}

async fn handle_create_workspace(
    State(state): State<AppState>,
    Json(req): Json<CreateWorkspaceRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let safe = sanitize_workspace_name(&req.workspace)?;
    state.store.ensure_workspace(&safe).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": format!("Workspace '{}' created successfully", safe)
        })),
    ))
}

#[derive(Serialize)]
struct DocumentEntry {
    id: String,
    name: String,
    title: String,
}

async fn handle_list_documents(
    State(state): State<AppState>,
    Path(ws): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = sanitize_workspace_name(&ws)?;
    let docs = state.store.list_documents(&ws).await?;
    let documents: Vec<DocumentEntry> = docs
        .into_iter()
        .map(|d| DocumentEntry {
            id: d.id,
            name: d.title.clone(),
            title: d.title,
        })
        .collect();
    Ok(Json(serde_json::json!({ "documents": documents })))
}

#[derive(Serialize)]
struct PageEntry {
    page_id: String,
    title: String,
    tags: Vec<String>,
}

async fn handle_list_pages(
    State(state): State<AppState>,
    Path(ws): Path<String>,
) -> Result<Json<Vec<PageEntry>>, AppError> {
    let ws = sanitize_workspace_name(&ws)?;
    let docs = state.store.list_documents(&ws).await?;
    Ok(Json(
        docs.into_iter()
            .map(|d| PageEntry {
                page_id: d.id,
                title: d.title,
                tags: d.tags,
            })
            .collect(),
    ))
}

// ============ Pages ============

#[derive(Deserialize)]
struct AddPageRequest {
    title: String,
    content: String,
    workspace: String,
    #[serde(default)]
    tags: Vec<String>,
}

async fn handle_add_page(
    State(state): State<AppState>,
    Json(req): Json<AddPageRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = sanitize_workspace_name(&req.workspace)?;
    let page_id = service::add_page(
        state.store.as_ref(),
        state.adapter.as_ref(),
        &ws,
        &req.title,
        &req.content,
        req.tags,
    )
    .await?;
    Ok(Json(
        serde_json::json!({ "status": "success", "page_id": page_id }),
    ))
}

#[derive(Deserialize)]
struct UpdatePageRequest {
    workspace: String,
    title: Option<String>,
    content: Option<String>,
    tags: Option<Vec<String>>,
}

async fn handle_update_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePageRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = sanitize_workspace_name(&req.workspace)?;
    service::update_page(
        state.store.as_ref(),
        state.adapter.as_ref(),
        &ws,
        &id,
        req.title.as_deref(),
        req.content.as_deref(),
        req.tags,
    )
    .await?;
    Ok(Json(serde_json::json!({ "status": "updated" })))
}

#[derive(Deserialize)]
struct DeletePageParams {
    workspace: String,
}

async fn handle_delete_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DeletePageParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = sanitize_workspace_name(&params.workspace)?;
    let existed = state.store.delete_document(&ws, &id).await?;
    if !existed {
        return Err(not_found(format!("Page {} not found", id)));
    }
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}

// ============ AI features ============

#[derive(Deserialize)]
struct AskRequest {
    workspace: String,
    question: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = sanitize_workspace_name(&req.workspace)?;
    let answer = answer_question(
        state.store.as_ref(),
        state.adapter.as_ref(),
        &ws,
        &req.question,
        state.config.chunk_params(),
    )
    .await?;
    Ok(Json(serde_json::json!({ "answer": answer.message() })))
}

#[derive(Deserialize)]
struct ExtractLinksRequest {
    workspace: String,
    #[serde(default)]
    text: String,
    /// Source page id to exclude from its own suggestions.
    #[serde(default)]
    exclude_id: Option<String>,
}

async fn handle_extract_links(
    State(state): State<AppState>,
    Json(req): Json<ExtractLinksRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = sanitize_workspace_name(&req.workspace)?;
    let suggestions = suggest_links(
        state.store.as_ref(),
        state.adapter.as_ref(),
        &ws,
        &req.text,
        req.exclude_id.as_deref(),
    )
    .await?;
    Ok(Json(serde_json::json!({ "suggestions": suggestions })))
}

#[derive(Deserialize)]
struct GenerateTagsRequest {
    workspace: String,
    #[serde(default)]
    content: Option<String>,
}

async fn handle_generate_tags(
    State(state): State<AppState>,
    Json(req): Json<GenerateTagsRequest>,
) -> Result<Json<lorebook_core::models::TagResult>, AppError> {
    let ws = sanitize_workspace_name(&req.workspace)?;
    let result = generate_tags(
        state.store.as_ref(),
        state.adapter.as_ref(),
        &ws,
        req.content.as_deref(),
        state.config.chunk_params(),
    )
    .await?;
    Ok(Json(result))
}

async fn handle_knowledge_graph(
    State(state): State<AppState>,
    Path(ws): Path<String>,
) -> Result<Json<lorebook_core::models::KnowledgeGraph>, AppError> {
    let ws = sanitize_workspace_name(&ws)?;
    let docs = state.store.list_documents(&ws).await?;
    Ok(Json(build_graph(&docs)))
}

// ============ Upload ============

#[derive(Deserialize)]
struct UploadFileRequest {
    filename: String,
    content: String,
}

async fn handle_upload_file(
    State(state): State<AppState>,
    Path(ws): Path<String>,
    Json(req): Json<UploadFileRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let ws = sanitize_workspace_name(&ws)?;
    let page_id = service::upload_file(
        state.store.as_ref(),
        state.adapter.as_ref(),
        &ws,
        &req.filename,
        &req.content,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": format!("File '{}' uploaded successfully", req.filename),
            "page_id": page_id
        })),
    ))
}
