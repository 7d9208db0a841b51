//! Message persistence.
//!
//! [`MessageStore`] is the seam to whatever key-value table backs the
//! guestbook. Records are keyed by id, with a secondary index on
//! `(timestamp, id)` read newest first.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

use crate::models::Message;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid continuation token")]
    InvalidCursor,
    #[error("message {0} already exists")]
    Duplicate(String),
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// One page of the chronological index.
#[derive(Debug, Clone)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    /// Present only when more records follow this page.
    pub next_key: Option<String>,
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn put(&self, message: Message) -> Result<(), StoreError>;

    async fn get(&self, message_id: &str) -> Result<Option<Message>, StoreError>;

    /// Newest first, resuming after `start_key` when given.
    async fn recent(
        &self,
        limit: usize,
        start_key: Option<&str>,
    ) -> Result<MessagePage, StoreError>;
}

// Index position, also the payload of a continuation token
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
struct Cursor {
    ts: DateTime<Utc>,
    id: String,
}

impl Cursor {
    fn of(message: &Message) -> Self {
        Self {
            ts: message.timestamp,
            id: message.message_id.clone(),
        }
    }

    fn encode(&self) -> Result<String, StoreError> {
        let json = serde_json::to_vec(self).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    fn decode(token: &str) -> Result<Self, StoreError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| StoreError::InvalidCursor)?;
        serde_json::from_slice(&bytes).map_err(|_| StoreError::InvalidCursor)
    }
}

#[derive(Default)]
struct Tables {
    by_id: HashMap<String, Message>,
    by_time: BTreeSet<Cursor>,
}

/// Process-local table. Contents live as long as the process.
#[derive(Default)]
pub struct InMemoryMessageStore {
    tables: RwLock<Tables>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn put(&self, message: Message) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.by_id.contains_key(&message.message_id) {
            return Err(StoreError::Duplicate(message.message_id));
        }
        tables.by_time.insert(Cursor::of(&message));
        tables.by_id.insert(message.message_id.clone(), message);
        Ok(())
    }

    async fn get(&self, message_id: &str) -> Result<Option<Message>, StoreError> {
        Ok(self.tables.read().await.by_id.get(message_id).cloned())
    }

    async fn recent(
        &self,
        limit: usize,
        start_key: Option<&str>,
    ) -> Result<MessagePage, StoreError> {
        let after = start_key.map(Cursor::decode).transpose()?;
        let tables = self.tables.read().await;

        let mut positions: Box<dyn Iterator<Item = &Cursor> + '_> = match &after {
            Some(cursor) => Box::new(tables.by_time.range(..cursor).rev()),
            None => Box::new(tables.by_time.iter().rev()),
        };

        let mut messages = Vec::with_capacity(limit);
        for position in positions.by_ref().take(limit) {
            match tables.by_id.get(&position.id) {
                Some(message) => messages.push(message.clone()),
                None => {
                    return Err(StoreError::Backend(format!(
                        "index entry {} has no record",
                        position.id
                    )));
                }
            }
        }

        let next_key = match (positions.next(), messages.last()) {
            (Some(_), Some(last)) => Some(Cursor::of(last).encode()?),
            _ => None,
        };

        Ok(MessagePage { messages, next_key })
    }
}
