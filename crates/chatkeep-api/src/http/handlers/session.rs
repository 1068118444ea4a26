//! Session endpoints: sidebar listing, new chat, switching.

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use chatkeep_core::chat::session::SessionContext;
use chatkeep_types::chat::{Message, SessionId, SessionSummary};

use crate::http::error::AppError;
use crate::http::extractors::client::ClientSession;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// Sidebar payload.
#[derive(Debug, Serialize)]
pub struct SessionList {
    /// The client's active session.
    pub active: SessionId,
    /// Stored and in-memory sessions, newest first.
    pub sessions: Vec<SessionSummary>,
}

/// The active session and its displayed turns.
#[derive(Debug, Serialize)]
pub struct CurrentSession {
    pub session_id: SessionId,
    pub label: String,
    /// Collection the session writes to, once one is assigned.
    pub collection: Option<String>,
    pub turns: Vec<Message>,
}

impl CurrentSession {
    fn from_context(ctx: &SessionContext) -> Self {
        Self {
            session_id: ctx.session_id().clone(),
            label: ctx.session_id().label(),
            collection: ctx.current_collection().map(|c| c.as_str().to_string()),
            turns: ctx.conversation().turns().to_vec(),
        }
    }
}

/// GET /api/v1/sessions - Sidebar listing for the calling client.
pub async fn list_sessions(
    State(state): State<AppState>,
    client: ClientSession,
) -> Result<Json<ApiResponse<SessionList>>, AppError> {
    let timer = RequestTimer::start();
    let ctx = client.context.lock().await;

    let sessions = state.chat_service.list_sessions(&ctx).await?;

    Ok(Json(timer.finish(SessionList {
        active: ctx.session_id().clone(),
        sessions,
    })))
}

/// POST /api/v1/sessions - Start a new chat in a fresh collection.
pub async fn new_session(
    State(state): State<AppState>,
    client: ClientSession,
) -> Result<Json<ApiResponse<CurrentSession>>, AppError> {
    let timer = RequestTimer::start();
    let mut ctx = client.context.lock().await;

    state.chat_service.new_chat(&mut ctx).await?;
    tracing::debug!(client_id = %client.client_id, session_id = %ctx.session_id(), "Client started a new chat");

    Ok(Json(timer.finish(CurrentSession::from_context(&ctx))))
}

/// GET /api/v1/sessions/current - The active session with its turns.
pub async fn current_session(client: ClientSession) -> Json<ApiResponse<CurrentSession>> {
    let timer = RequestTimer::start();
    let ctx = client.context.lock().await;
    Json(timer.finish(CurrentSession::from_context(&ctx)))
}

/// POST /api/v1/sessions/{id}/activate - Switch to a session and restore it.
pub async fn activate_session(
    State(state): State<AppState>,
    client: ClientSession,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<CurrentSession>>, AppError> {
    let timer = RequestTimer::start();

    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(AppError::Validation("Session id must not be empty".to_string()));
    }

    let mut ctx = client.context.lock().await;
    state
        .chat_service
        .switch_session(&mut ctx, SessionId::new(session_id))
        .await?;

    Ok(Json(timer.finish(CurrentSession::from_context(&ctx))))
}
