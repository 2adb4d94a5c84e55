//! HTTP endpoints exposing the chat service.

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{future::Future, net::SocketAddr, sync::Arc};
use tracing::{info, warn};

use crate::error::ChatError;
use crate::service::ChatService;

#[derive(Clone)]
struct HttpState {
    service: ChatService,
}

/// Response body for the `/healthz` endpoint.
#[derive(Serialize, Deserialize)]
struct Health {
    /// Always "ok" when the server is running.
    status: String,
}

/// Service information served at the root path.
#[derive(Serialize, Deserialize)]
struct ServerInfo {
    /// Human-readable service name.
    name: String,
    /// Software identifier.
    software: String,
    /// Semantic version string such as "0.1.0".
    version: String,
}

/// Request body for `POST /messages`. Missing fields read as empty strings
/// and fail validation rather than erroring at the decode boundary.
#[derive(Deserialize)]
struct PostBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    text: String,
}

/// Start an HTTP server exposing the chat endpoints.
pub async fn serve_http(
    addr: SocketAddr,
    service: ChatService,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let state = Arc::new(HttpState { service });
    let app = Router::new()
        .route("/", get(server_info))
        .route("/healthz", get(healthz))
        .route("/messages", get(list_messages).post(post_message))
        .route("/users", get(list_users))
        .with_state(state);
    info!(%addr, "http server listening");
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Health check endpoint.
async fn healthz() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}

/// Basic service information document.
async fn server_info() -> impl IntoResponse {
    (
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(ServerInfo {
            name: "egchat".into(),
            software: "egchat".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }),
    )
}

/// Full message log, sorted ascending by timestamp.
async fn list_messages(State(state): State<Arc<HttpState>>) -> Response {
    match state.service.list_messages() {
        Ok(msgs) => Json(msgs).into_response(),
        Err(err) => error_response(err),
    }
}

/// Distinct display names seen so far.
async fn list_users(State(state): State<Arc<HttpState>>) -> Response {
    match state.service.list_users() {
        Ok(users) => Json(users).into_response(),
        Err(err) => error_response(err),
    }
}

/// Accept a post and return the canonical stored record.
async fn post_message(
    State(state): State<Arc<HttpState>>,
    Json(body): Json<PostBody>,
) -> Response {
    match state.service.append_message(&body.name, &body.text) {
        Ok(msg) => Json(json!({ "ok": true, "msg": msg })).into_response(),
        Err(err) => error_response(err),
    }
}

/// Map a service failure to `{error}` with the matching status code.
fn error_response(err: ChatError) -> Response {
    let status = match err {
        ChatError::Validation => StatusCode::BAD_REQUEST,
        ChatError::Persistence(_) | ChatError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(%status, error = %err, "request failed");
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
