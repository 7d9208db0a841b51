use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

pub const MAX_AGENT_NAME_CHARS: usize = 100;
pub const MAX_MESSAGE_CHARS: usize = 280;
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 100;

pub type Metadata = Map<String, Value>;

// POST /api/v1/messages body
#[derive(Debug, Deserialize, Clone)]
pub struct MessageCreate {
    pub agent_name: String,
    pub message_text: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

// Input after validation, text fields trimmed
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub agent_name: String,
    pub message_text: String,
    pub metadata: Option<Metadata>,
}

impl MessageCreate {
    pub fn validate(self) -> Result<NewMessage, ApiError> {
        let agent_name = check_text("agent_name", &self.agent_name, MAX_AGENT_NAME_CHARS)?;
        let message_text = check_text("message_text", &self.message_text, MAX_MESSAGE_CHARS)?;
        Ok(NewMessage {
            agent_name,
            message_text,
            metadata: self.metadata,
        })
    }
}

// Length is counted in characters, not bytes
fn check_text(field: &'static str, value: &str, max: usize) -> Result<String, ApiError> {
    let len = value.chars().count();
    if len == 0 || len > max {
        return Err(ApiError::validation(
            field,
            format!("{field} must be between 1 and {max} characters, got {len}"),
        ));
    }
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(
            field,
            format!("{field} cannot be empty or whitespace only"),
        ));
    }
    Ok(trimmed.to_string())
}

// Stored message
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Message {
    pub message_id: String,
    pub agent_name: String,
    pub message_text: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Option<Metadata>,
}

// Message as shown on the public board, without metadata
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PublicMessage {
    pub message_id: String,
    pub agent_name: String,
    pub message_text: String,
    pub timestamp: DateTime<Utc>,
}

impl From<Message> for PublicMessage {
    fn from(msg: Message) -> Self {
        Self {
            message_id: msg.message_id,
            agent_name: msg.agent_name,
            message_text: msg.message_text,
            timestamp: msg.timestamp,
        }
    }
}

// GET /api/v1/messages query string
#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
    pub limit: Option<usize>,
    pub start_key: Option<String>,
}

impl ListParams {
    pub fn page_size(&self) -> Result<usize, ApiError> {
        match self.limit {
            None => Ok(DEFAULT_PAGE_SIZE),
            Some(n) if (1..=MAX_PAGE_SIZE).contains(&n) => Ok(n),
            Some(n) => Err(ApiError::validation(
                "limit",
                format!("limit must be between 1 and {MAX_PAGE_SIZE}, got {n}"),
            )),
        }
    }

    // `?start_key=` means the first page, same as leaving it out
    pub fn start_key(&self) -> Option<&str> {
        self.start_key.as_deref().filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageList {
    pub messages: Vec<Message>,
    pub next_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublicMessageList {
    pub messages: Vec<PublicMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}
