//! HTTP control plane: the thin layer over the workflow registry and
//! the transformation service.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bridge_core::{Id, TransformationService};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::adapters::AdapterRegistry;
use crate::registry::WorkflowRegistry;
use crate::workflow::{new_migration_workflow, MigrationWorkflow};

/// Shared state for HTTP handlers.
pub struct AppState {
    pub registry: Arc<WorkflowRegistry>,
    pub service: Arc<TransformationService>,
    pub adapters: Arc<AdapterRegistry>,
    /// Caps concurrently executing workflows; submissions past the cap
    /// queue on the semaphore.
    pub executors: Arc<Semaphore>,
}

impl AppState {
    pub fn new(max_workflows: usize) -> Self {
        Self {
            registry: Arc::new(WorkflowRegistry::new()),
            service: Arc::new(TransformationService::with_builtin_mappers()),
            adapters: Arc::new(AdapterRegistry::with_memory_defaults()),
            executors: Arc::new(Semaphore::new(max_workflows)),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("adapters", &self.adapters)
            .finish_non_exhaustive()
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/workflows/migration",
            post(create_migration_workflow),
        )
        .route("/api/workflows", get(list_workflows))
        .route("/api/workflows/{id}", get(get_workflow))
        .route("/api/workflows/{id}/start", post(start_workflow))
        .route("/api/workflows/{id}/cancel", post(cancel_workflow))
        .route(
            "/api/workflows/{id}/steps/{order}/retry",
            post(retry_workflow_step),
        )
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server, bound to localhost only.
pub async fn start_server(state: Arc<AppState>, port: u16) -> crate::AppResult<()> {
    let router = create_router(state);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("HTTP server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

// --- Request/Response types ---

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn not_found(id: &str) -> HandlerError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("workflow not found: {id}"),
        }),
    )
}

/// Payload for POST /api/workflows/migration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMigrationRequest {
    #[serde(default)]
    pub source_system: Option<String>,
    #[serde(default)]
    pub target_system: Option<String>,
    #[serde(default)]
    pub project_key: Option<String>,
    #[serde(default)]
    pub options: Option<Value>,
}

impl CreateMigrationRequest {
    /// The workflow input document. Validation happens in step 1, not
    /// here, so submissions with missing fields still produce an
    /// inspectable failed workflow.
    fn into_input(self) -> Value {
        let mut object = serde_json::Map::new();
        if let Some(source) = self.source_system {
            object.insert("sourceSystem".to_string(), json!(source));
        }
        if let Some(target) = self.target_system {
            object.insert("targetSystem".to_string(), json!(target));
        }
        if let Some(project) = self.project_key {
            object.insert("projectKey".to_string(), json!(project));
        }
        if let Some(options) = self.options {
            object.insert("options".to_string(), options);
        }
        Value::Object(object)
    }
}

// --- Handlers ---

/// GET /health
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// POST /api/workflows/migration - create a workflow and start it in the
/// background. Returns the status object immediately.
async fn create_migration_workflow(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateMigrationRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = Id::new().to_string();
    let workflow = new_migration_workflow(&id, request.into_input());
    let handle = state.registry.insert(workflow).await;
    info!(workflow_id = %id, "created migration workflow");

    spawn_executor(&state, &id);

    Ok((StatusCode::CREATED, Json(handle.snapshot().await)))
}

/// POST /api/workflows/{id}/start - run a created workflow, or resume a
/// failed one under resume semantics.
async fn start_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let handle = state.registry.get(&id).await.ok_or_else(|| not_found(&id))?;
    spawn_executor(&state, &id);
    Ok(Json(handle.snapshot().await))
}

/// GET /api/workflows - list workflows.
async fn list_workflows(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.registry.list().await)
}

/// GET /api/workflows/{id} - workflow status object.
async fn get_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let handle = state.registry.get(&id).await.ok_or_else(|| {
        warn!(workflow_id = %id, "workflow not found");
        not_found(&id)
    })?;
    Ok(Json(handle.snapshot().await))
}

/// POST /api/workflows/{id}/cancel - request cancellation at the next
/// step boundary.
async fn cancel_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    if state.registry.cancel(&id).await {
        info!(workflow_id = %id, "cancellation requested");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(&id))
    }
}

/// POST /api/workflows/{id}/steps/{order}/retry - reset one step to
/// PENDING so a subsequent start reruns it.
async fn retry_workflow_step(
    State(state): State<Arc<AppState>>,
    Path((id, order)): Path<(String, u32)>,
) -> Result<impl IntoResponse, HandlerError> {
    let handle = state.registry.get(&id).await.ok_or_else(|| not_found(&id))?;
    let mut workflow = handle.workflow.write().await;
    workflow.retry_step(order).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;
    info!(workflow_id = %id, order, "step reset for retry");
    Ok(StatusCode::NO_CONTENT)
}

/// Run a workflow on a background task, bounded by the executor
/// semaphore.
fn spawn_executor(state: &Arc<AppState>, id: &str) {
    let state = Arc::clone(state);
    let id = id.to_string();
    tokio::spawn(async move {
        let _permit = match Arc::clone(&state.executors).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };
        let Some(handle) = state.registry.get(&id).await else {
            return;
        };
        let mut engine = MigrationWorkflow::new(
            handle,
            Arc::clone(&state.service),
            Arc::clone(&state.adapters),
        );
        if let Err(e) = engine.start().await {
            error!(workflow_id = %id, error = %e, "workflow executor error");
        }
    });
}
