// src/server/routes.rs

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::broadcast::StreamEvent;
use crate::exec::CommandSpec;
use crate::registry::{RunId, RunSnapshot, RunSummary};

use super::AppState;
use super::error::ApiError;
use super::scripts::{InstallRequest, UpdateRequest};

pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// An empty body means "all defaults".
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("invalid body: {e}")))
}

fn parse_run_id(raw: &str) -> Result<RunId, ApiError> {
    raw.parse().map_err(ApiError::bad_request)
}

fn start(state: &AppState, spec: CommandSpec) -> Result<Json<Value>, ApiError> {
    let id = state.registry.create_run(spec)?;
    Ok(Json(json!({ "success": true, "processId": id })))
}

pub async fn start_install(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let req: InstallRequest = parse_body(&body)?;
    info!(?req, "install requested");
    let spec = state.scripts.install(&req);
    start(&state, spec)
}

pub async fn start_update(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let req: UpdateRequest = parse_body(&body)?;
    info!(?req, "update requested");
    let spec = state.scripts.update(&req);
    start(&state, spec)
}

pub async fn list_runs(State(state): State<AppState>) -> Json<Vec<RunSummary>> {
    Json(state.registry.list_runs())
}

pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RunSnapshot>, ApiError> {
    let id = parse_run_id(&id)?;
    Ok(Json(state.registry.get_run(&id)?))
}

pub async fn cancel_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_run_id(&id)?;
    state.registry.cancel_run(&id)?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub cursor: Option<u64>,
}

fn to_sse(event: StreamEvent) -> Result<Event, Infallible> {
    let event = match serde_json::to_string(&event) {
        Ok(data) => Event::default().data(data),
        // Serialising these plain types cannot fail; keep the stream alive anyway.
        Err(err) => Event::default().comment(format!("unserialisable event: {err}")),
    };
    Ok(event)
}

/// Attach-to-stream: replay from `cursor`, then live events, closed after
/// the `exit` event.
pub async fn stream_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<StreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let id = parse_run_id(&id)?;
    let subscription = state.broadcaster.attach(&id, query.cursor)?;
    debug!(run_id = %id, cursor = ?query.cursor, "stream attached");

    let stream = subscription.into_stream().map(to_sse);
    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    ))
}
