//! REST API server for the orderbook agent
//!
//! Lets a hosting conversational runtime open sessions, send commands and
//! read back the session's display cache.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::dispatcher::Dispatcher;
use crate::error::AgentError;
use crate::models::Command;
use crate::session::{InMemorySessionStore, SessionStore};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CommandRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct VisibilityRequest {
    /// Absent means flip the current value.
    #[serde(default)]
    pub visible: Option<bool>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn error_response(e: AgentError) -> ApiResult {
    let status = match e {
        AgentError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiResponse::error(e.to_string())))
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub dispatcher: Arc<Dispatcher>,
    pub sessions: Arc<dyn SessionStore>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Session Endpoints
/// =============================

async fn create_session(State(state): State<ApiState>) -> ApiResult {
    match state.sessions.create().await {
        Ok(handle) => {
            let ctx = handle.lock().await;
            info!(session_id = %ctx.session_id, "Session started");
            (
                StatusCode::CREATED,
                Json(ApiResponse::success(serde_json::json!({
                    "session_id": ctx.session_id,
                    "started_at": ctx.started_at.to_rfc3339(),
                }))),
            )
        }
        Err(e) => error_response(e),
    }
}

async fn end_session(State(state): State<ApiState>, Path(session_id): Path<String>) -> ApiResult {
    match state.sessions.end(&session_id).await {
        Ok(()) => {
            info!(session_id = %session_id, "Session ended");
            (
                StatusCode::OK,
                Json(ApiResponse::success(serde_json::json!({ "session_id": session_id }))),
            )
        }
        Err(e) => error_response(e),
    }
}

/// =============================
/// Command Endpoint
/// =============================

async fn run_command(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
    Json(req): Json<CommandRequest>,
) -> ApiResult {
    let handle = match state.sessions.get(&session_id).await {
        Ok(handle) => handle,
        Err(e) => return error_response(e),
    };

    // Holding the session lock for the whole dispatch keeps each session
    // turn-based; other sessions proceed independently.
    let mut ctx = handle.lock().await;
    let command = Command::new(req.text, session_id);
    let envelope = state.dispatcher.dispatch(&mut ctx, &command).await;

    (StatusCode::OK, Json(ApiResponse::success(envelope)))
}

/// =============================
/// Display Endpoints
/// =============================

async fn get_display(State(state): State<ApiState>, Path(session_id): Path<String>) -> ApiResult {
    match state.sessions.get(&session_id).await {
        Ok(handle) => {
            let ctx = handle.lock().await;
            (StatusCode::OK, Json(ApiResponse::success(ctx.display.render())))
        }
        Err(e) => error_response(e),
    }
}

async fn set_visibility(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
    Json(req): Json<VisibilityRequest>,
) -> ApiResult {
    let handle = match state.sessions.get(&session_id).await {
        Ok(handle) => handle,
        Err(e) => return error_response(e),
    };

    let mut ctx = handle.lock().await;
    match req.visible {
        Some(visible) => ctx.display.set_encryption_visible(visible),
        None => {
            ctx.display.toggle_visibility();
        }
    }
    info!(
        session_id = %session_id,
        encryption_visible = ctx.display.encryption_visible(),
        "Visibility changed"
    );

    (StatusCode::OK, Json(ApiResponse::success(ctx.display.render())))
}

/// =============================
/// Router
/// =============================

pub fn create_router(dispatcher: Arc<Dispatcher>, sessions: Arc<dyn SessionStore>) -> Router {
    let state = ApiState {
        dispatcher,
        sessions,
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", axum::routing::delete(end_session))
        .route("/api/sessions/:id/commands", post(run_command))
        .route("/api/sessions/:id/display", get(get_display))
        .route("/api/sessions/:id/visibility", post(set_visibility))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    dispatcher: Arc<Dispatcher>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(dispatcher, Arc::new(InMemorySessionStore::new()));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
