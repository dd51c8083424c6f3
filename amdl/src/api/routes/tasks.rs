//! Task submission, inspection, control and live progress.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{delete, get, post},
};
use futures::stream::{self, Stream, StreamExt};
use manifest::QualityTier;
use tracing::{debug, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{CreateTasksRequest, CreateTasksResponse, DeletedResponse, StatusResponse};
use crate::api::server::AppState;
use crate::error::Error;
use crate::pipeline::{Job, JobOptions, TaskRegistry};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_tasks).get(list_tasks))
        .route("/completed", delete(clear_completed))
        .route("/{id}", get(get_task).delete(delete_task))
        .route("/{id}/cancel", post(cancel_task))
        .route("/{id}/retry", post(retry_task))
        .route("/{id}/stream", get(stream_task))
}

fn task_not_found(id: &str) -> ApiError {
    ApiError::not_found(format!("task '{id}' not found"))
}

/// Map registry errors, naming the running-job conflict plainly.
fn control_error(id: &str, err: Error) -> ApiError {
    match err {
        Error::NotFound { .. } => task_not_found(id),
        Error::InvalidStateTransition { .. } => ApiError::conflict("task is running"),
        other => other.into(),
    }
}

/// `POST /tasks`: one job per target URL.
async fn create_tasks(
    State(state): State<AppState>,
    payload: Result<Json<CreateTasksRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateTasksResponse>)> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let targets = request.targets();
    if targets.is_empty() {
        return Err(ApiError::bad_request("urls required"));
    }

    let quality = match request.quality.as_deref().map(str::trim) {
        None | Some("") => QualityTier::default(),
        Some(q) => q
            .parse::<QualityTier>()
            .map_err(|_| ApiError::bad_request("quality must be one of: alac|aac|atmos"))?,
    };
    let max_retries = request.effective_max_retries(state.default_max_retries);

    let mut task_ids = Vec::with_capacity(targets.len());
    for url in targets {
        let options = JobOptions::new(url, quality)
            .with_tracks(request.tracks.clone())
            .with_song_only(request.song_only)
            .with_max_retries(max_retries);
        match state.registry.create(options) {
            Ok(id) => task_ids.push(id),
            Err(Error::QueueFull) if !task_ids.is_empty() => {
                warn!(
                    accepted = task_ids.len(),
                    "Task queue filled up, remaining URLs were rejected"
                );
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let count = task_ids.len();
    Ok((
        StatusCode::CREATED,
        Json(CreateTasksResponse { task_ids, count }),
    ))
}

async fn list_tasks(State(state): State<AppState>) -> Json<Vec<Job>> {
    Json(state.registry.list())
}

async fn clear_completed(State(state): State<AppState>) -> Json<DeletedResponse> {
    Json(DeletedResponse {
        deleted: state.registry.clear_completed(),
    })
}

async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Job>> {
    state
        .registry
        .get(&id)
        .map(Json)
        .ok_or_else(|| task_not_found(&id))
}

async fn delete_task(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state
        .registry
        .delete(&id)
        .map_err(|e| control_error(&id, e))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn cancel_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    state
        .registry
        .cancel(&id)
        .map_err(|e| control_error(&id, e))?;
    Ok((
        StatusCode::ACCEPTED,
        Json(StatusResponse::new("cancel requested")),
    ))
}

async fn retry_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    state
        .registry
        .retry(&id)
        .map_err(|e| control_error(&id, e))?;
    Ok((StatusCode::ACCEPTED, Json(StatusResponse::new("requeued"))))
}

/// `GET /tasks/{id}/stream`: a snapshot per tick until the job finishes.
async fn stream_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if state.registry.get(&id).is_none() {
        return Err(task_not_found(&id));
    }
    debug!(job_id = %id, "Progress stream opened");
    let events = job_events(state.registry.clone(), id, state.stream_interval)
        .take_until(state.shutdown.clone().cancelled_owned());
    Ok(Sse::new(events.map(Ok)).keep_alive(KeepAlive::default()))
}

fn end_event(body: serde_json::Value) -> Event {
    Event::default().event("end").data(body.to_string())
}

fn snapshot_event(job: &Job) -> Event {
    match serde_json::to_string(job) {
        Ok(json) => Event::default().data(json),
        Err(e) => {
            warn!(job_id = %job.id, error = %e, "Failed to serialize job snapshot");
            Event::default().data("{}")
        }
    }
}

/// Snapshots of one job, ending with an `end` event once it is terminal or gone.
/// The route bounds it with the server's shutdown token.
fn job_events(
    registry: Arc<TaskRegistry>,
    id: String,
    interval: Duration,
) -> impl Stream<Item = Event> {
    struct Cursor {
        registry: Arc<TaskRegistry>,
        id: String,
        first: bool,
    }

    let cursor = Cursor {
        registry,
        id,
        first: true,
    };

    stream::unfold(Some(cursor), move |cursor| async move {
        let mut cursor = cursor?;
        if !cursor.first {
            tokio::time::sleep(interval).await;
        }
        cursor.first = false;

        // The registry hands out a copy; serialization happens outside its lock.
        let Some(job) = cursor.registry.get(&cursor.id) else {
            let end = end_event(serde_json::json!({ "error": "not found" }));
            return Some((vec![end], None));
        };

        let mut events = vec![snapshot_event(&job)];
        if job.status.is_terminal() {
            events.push(end_event(
                serde_json::json!({ "status": job.status.as_str() }),
            ));
            return Some((events, None));
        }
        Some((events, Some(cursor)))
    })
    .flat_map(stream::iter)
}
