use crate::config::ServerConfig;
use crate::data::{DomainSnapshot, GenerateRequest, GenerationSummary, Timetable, TimetableId};
use crate::edit::SlotEdit;
use crate::error::{EditError, GenerateError, StoreError};
use crate::grid::Grid;
use crate::store::Store;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use log::{info, warn};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handlers wait on this lock asynchronously; only generation takes it from a blocking thread.
pub type SharedStore = Arc<Mutex<Store>>;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

fn status_of(err: &StoreError) -> StatusCode {
    match err {
        StoreError::TimetableNotFound(_)
        | StoreError::Generate(GenerateError::ClassNotFound(_)) => StatusCode::NOT_FOUND,
        StoreError::Edit(EditError::TeacherBusy | EditError::TeacherBusyNextSlot) => {
            StatusCode::CONFLICT
        }
        StoreError::Edit(_) => StatusCode::BAD_REQUEST,
        StoreError::Io(_) | StoreError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: StoreError) -> (StatusCode, String) {
    let status = status_of(&err);
    warn!("Request rejected with {status}: {err}");
    (status, err.to_string())
}

async fn replace_domain_handler(
    State(store): State<SharedStore>,
    Json(domain): Json<DomainSnapshot>,
) -> ApiResult<Value> {
    info!(
        "Replacing domain: {} classes, {} divisions, {} subjects",
        domain.classes.len(),
        domain.divisions.len(),
        domain.subjects.len()
    );
    store.lock().await.replace_domain(domain);
    Ok(Json(json!({ "replaced": true })))
}

async fn generate_handler(
    State(store): State<SharedStore>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<GenerationSummary> {
    let summary = tokio::task::spawn_blocking(move || {
        let mut store = store.blocking_lock();
        store.generate(&request).map_err(reject)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;
    Ok(Json(summary))
}

async fn list_handler(State(store): State<SharedStore>) -> ApiResult<Vec<Timetable>> {
    Ok(Json(store.lock().await.timetables()))
}

async fn grid_handler(
    State(store): State<SharedStore>,
    Path(id): Path<TimetableId>,
) -> ApiResult<Grid> {
    store.lock().await.grid(id).map(Json).map_err(reject)
}

async fn edit_slot_handler(
    State(store): State<SharedStore>,
    Path(id): Path<TimetableId>,
    Json(edit): Json<SlotEdit>,
) -> ApiResult<Value> {
    store.lock().await.edit_slot(id, &edit).map_err(reject)?;
    Ok(Json(json!({ "saved": true })))
}

async fn publish_handler(
    State(store): State<SharedStore>,
    Path(id): Path<TimetableId>,
) -> ApiResult<Value> {
    store.lock().await.publish(id).map_err(reject)?;
    Ok(Json(json!({ "published": true })))
}

async fn delete_handler(
    State(store): State<SharedStore>,
    Path(id): Path<TimetableId>,
) -> ApiResult<Value> {
    store.lock().await.delete(id).map_err(reject)?;
    Ok(Json(json!({ "deleted": true })))
}

pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/v1/domain", put(replace_domain_handler))
        .route("/v1/timetables", get(list_handler))
        .route("/v1/timetables/generate", post(generate_handler))
        .route("/v1/timetables/:id", delete(delete_handler))
        .route("/v1/timetables/:id/grid", get(grid_handler))
        .route("/v1/timetables/:id/edit-slot", post(edit_slot_handler))
        .route("/v1/timetables/:id/publish", post(publish_handler))
        .with_state(store)
}

pub async fn run_server(config: ServerConfig, store: Store) -> std::io::Result<()> {
    let app = router(Arc::new(Mutex::new(store)));
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Server running at http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}
