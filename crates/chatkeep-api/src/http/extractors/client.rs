//! Client identification extractor.
//!
//! The browser page generates a client id once, keeps it in `localStorage`
//! and sends it on every API call in the `X-Client-Id` header. The id selects
//! the session context, which stands in for per-tab UI session state.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::http::error::AppError;
use crate::clients::SharedContext;
use crate::state::AppState;

/// Header carrying the client id.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

const MAX_CLIENT_ID_LEN: usize = 128;

/// The calling client and its session context.
pub struct ClientSession {
    pub client_id: String,
    pub context: SharedContext,
}

impl FromRequestParts<AppState> for ClientSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let client_id = extract_client_id(parts)?;
        let context = state.context_for(&client_id).await;
        Ok(ClientSession { client_id, context })
    }
}

fn extract_client_id(parts: &Parts) -> Result<String, AppError> {
    let value = parts.headers.get(CLIENT_ID_HEADER).ok_or_else(|| {
        AppError::Validation("Missing client id. Provide it via the 'X-Client-Id' header.".to_string())
    })?;

    let id = value
        .to_str()
        .map_err(|_| AppError::Validation("Invalid X-Client-Id header encoding".to_string()))?
        .trim();

    if id.is_empty() || id.len() > MAX_CLIENT_ID_LEN {
        return Err(AppError::Validation(format!(
            "X-Client-Id must be 1 to {MAX_CLIENT_ID_LEN} characters"
        )));
    }

    Ok(id.to_string())
}
