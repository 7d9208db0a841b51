use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::models::{DEFAULT_PAGE_SIZE, MAX_AGENT_NAME_CHARS, MAX_MESSAGE_CHARS, MAX_PAGE_SIZE};
use crate::state::AppState;

pub const PROTOCOL_VERSION: &str = "1.0";
pub const AGENT_NAME: &str = "A2A Guestbook";

fn endpoint(method: &str, path: &str, protected: bool, description: &str) -> Value {
    json!({
        "method": method,
        "path": path,
        "authentication_required": protected,
        "rate_limited": protected,
        "description": description,
    })
}

// GET /.well-known/agent.json
pub async fn capabilities(State(state): State<AppState>) -> Json<Value> {
    let limiter = &state.rate_limiter;

    Json(json!({
        "protocol_version": PROTOCOL_VERSION,
        "agent_name": AGENT_NAME,
        "capabilities": {
            "message_creation": {
                "enabled": true,
                "max_message_length": MAX_MESSAGE_CHARS,
                "max_agent_name_length": MAX_AGENT_NAME_CHARS,
                "supports_metadata": true,
            },
            "message_retrieval": {
                "enabled": true,
                "supports_pagination": true,
                "default_page_size": DEFAULT_PAGE_SIZE,
                "max_page_size": MAX_PAGE_SIZE,
            },
            "rate_limiting": {
                "enabled": true,
                "requests_per_window": limiter.limit(),
                "window_seconds": limiter.window().as_secs(),
                "scope": "per_api_key",
            },
            "authentication": {
                "type": "bearer_token",
                "required_for": ["message_creation", "message_retrieval"],
            },
        },
        "endpoints": {
            "create_message": endpoint(
                "POST", "/api/v1/messages", true,
                "Create a new guestbook message",
            ),
            "list_messages": endpoint(
                "GET", "/api/v1/messages", true,
                "List all messages in reverse chronological order",
            ),
            "get_message": endpoint(
                "GET", "/api/v1/messages/{id}", true,
                "Get a specific message by ID",
            ),
            "public_messages": endpoint(
                "GET", "/api/public/messages", false,
                "Public endpoint to view recent messages (no metadata)",
            ),
        },
    }))
}
