//! HTTP request handlers: JSON-RPC, REST-style paths, health and API docs.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::Value;
use tracing::error;
use utoipa::OpenApi;

use slashproc_core::api::{Method, Params, Reply, dispatch, route_path};

use crate::openapi::ApiDoc;
use crate::rpc;
use crate::state::{AppState, SharedRegistry};

// ============================================================
// Health
// ============================================================

#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service is healthy", body = String)
    )
)]
pub(crate) async fn handle_health() -> &'static str {
    "ok"
}

// ============================================================
// JSON-RPC
// ============================================================

#[utoipa::path(
    post,
    path = "/",
    request_body(content = rpc::RpcCall, description = "JSON-RPC 2.0 call, or an array of calls"),
    responses(
        (status = 200, description = "JSON-RPC response (lookup failures are results carrying err/msg)", body = rpc::RpcResponse)
    )
)]
pub(crate) async fn handle_rpc(
    State(registry): AppState,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    tokio::task::spawn_blocking(move || rpc::handle_body(&registry, &body))
        .await
        .map(Json)
        .map_err(|e| {
            error!(error = %e, "rpc task failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

// ============================================================
// REST-style paths
// ============================================================

#[utoipa::path(
    get,
    path = "/slashproc",
    responses(
        (status = 200, description = "Registered sources", body = Reply)
    )
)]
pub(crate) async fn handle_sources(State(registry): AppState) -> Result<Json<Reply>, StatusCode> {
    run(registry, Method::GetSources, Params::default()).await
}

#[utoipa::path(
    get,
    path = "/slashproc/{path}",
    params(
        ("path" = String, Path, description = "`<source>[/groups|/vars][/<selector>...]`, e.g. `uptime/total` or `cpuinfo/vars/all`")
    ),
    responses(
        (status = 200, description = "found/notfound lookup result, or err/msg", body = Reply)
    )
)]
pub(crate) async fn handle_path(
    State(registry): AppState,
    Path(path): Path<String>,
) -> Result<Json<Reply>, StatusCode> {
    let (method, params) = route_path(&path);
    run(registry, method, params).await
}

/// Source reads block, so dispatch runs on the blocking pool.
async fn run(
    registry: SharedRegistry,
    method: Method,
    params: Params,
) -> Result<Json<Reply>, StatusCode> {
    tokio::task::spawn_blocking(move || dispatch(&registry, method, &params))
        .await
        .map(Json)
        .map_err(|e| {
            error!(%method, error = %e, "dispatch task failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

// ============================================================
// API docs
// ============================================================

pub(crate) async fn handle_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
