//! Chat endpoint.
//!
//! POST /api/v1/chat
//!
//! Sends one prompt in the client's active session and returns the complete
//! reply. Store failures that did not stop the exchange come back as
//! `warnings`; a model failure is an error response and leaves no
//! assistant turn behind.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use chatkeep_types::chat::SessionId;
use chatkeep_types::llm::Usage;

use crate::http::error::AppError;
use crate::http::extractors::client::ClientSession;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// Request body for the chat endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Reply payload.
#[derive(Debug, Serialize)]
pub struct ChatReplyBody {
    pub session_id: SessionId,
    pub reply: String,
    pub usage: Usage,
    pub warnings: Vec<String>,
}

/// POST /api/v1/chat - Send a prompt and wait for the reply.
pub async fn send_message(
    State(state): State<AppState>,
    client: ClientSession,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatReplyBody>>, AppError> {
    let timer = RequestTimer::start();
    let mut ctx = client.context.lock().await;

    let reply = state.chat_service.send(&mut ctx, &body.message).await?;

    tracing::debug!(
        request_id = %timer.request_id(),
        session_id = %reply.session_id,
        warnings = reply.warnings.len(),
        "Chat reply sent"
    );

    Ok(Json(timer.finish(ChatReplyBody {
        session_id: reply.session_id,
        reply: reply.reply,
        usage: reply.usage,
        warnings: reply.warnings,
    })))
}
