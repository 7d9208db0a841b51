use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::AuthenticatedAgent;
use crate::error::ApiError;
use crate::metrics::MESSAGES_CREATED;
use crate::models::{ListParams, Message, MessageCreate, MessageList};
use crate::state::AppState;
use crate::store::StoreError;

// Store failures are logged here with the action, the caller only sees the code
fn store_failure(action: &'static str) -> impl Fn(StoreError) -> ApiError {
    move |e| {
        if !matches!(e, StoreError::InvalidCursor) {
            error!(action, error = %e, "store_error");
        }
        ApiError::from(e)
    }
}

// POST /api/v1/messages
pub async fn create_message(
    State(state): State<AppState>,
    Extension(agent): Extension<AuthenticatedAgent>,
    payload: Result<Json<MessageCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    let input = payload.validate()?;

    info!(agent_name = %input.agent_name, user = %agent.fingerprint(), "creating_message");

    let message = Message {
        message_id: Uuid::new_v4().to_string(),
        agent_name: input.agent_name,
        message_text: input.message_text,
        timestamp: Utc::now(),
        metadata: input.metadata,
    };
    state
        .store
        .put(message.clone())
        .await
        .map_err(store_failure("create_message"))?;

    MESSAGES_CREATED.inc();
    info!(
        message_id = %message.message_id,
        agent_name = %message.agent_name,
        timestamp = %message.timestamp.to_rfc3339(),
        "message_created"
    );
    Ok((StatusCode::CREATED, Json(message)))
}

// GET /api/v1/messages?limit=&start_key=
pub async fn list_messages(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<MessageList>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    let limit = params.page_size()?;

    info!(limit, has_start_key = params.start_key().is_some(), "listing_messages");

    let page = state
        .store
        .recent(limit, params.start_key())
        .await
        .map_err(store_failure("list_messages"))?;

    info!(
        count = page.messages.len(),
        has_next_page = page.next_key.is_some(),
        "messages_retrieved"
    );
    Ok(Json(MessageList {
        messages: page.messages,
        next_key: page.next_key,
    }))
}

// GET /api/v1/messages/{id}
pub async fn get_message(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    let found = state
        .store
        .get(&message_id)
        .await
        .map_err(store_failure("get_message"))?;

    match found {
        Some(message) => Ok(Json(message)),
        None => {
            info!(message_id = %message_id, "message_not_found");
            Err(ApiError::NotFound(message_id))
        }
    }
}
