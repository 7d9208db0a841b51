use axum::Json;
use axum::extract::State;
use tracing::{error, info};

use crate::error::ApiError;
use crate::models::{DEFAULT_PAGE_SIZE, PublicMessage, PublicMessageList};
use crate::state::AppState;

// GET /api/public/messages, no auth, newest 50 without metadata
pub async fn public_messages(
    State(state): State<AppState>,
) -> Result<Json<PublicMessageList>, ApiError> {
    let page = state
        .store
        .recent(DEFAULT_PAGE_SIZE, None)
        .await
        .map_err(|e| {
            error!(action = "list_public_messages", error = %e, "store_error");
            ApiError::from(e)
        })?;

    let messages: Vec<PublicMessage> = page.messages.into_iter().map(Into::into).collect();
    info!(count = messages.len(), "public_messages_retrieved");

    Ok(Json(PublicMessageList { messages }))
}
