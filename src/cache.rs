//! In-memory credential cache.
//!
//! The active credential set is an immutable snapshot behind an `Arc`.
//! A load builds a complete new set and swaps the pointer, so readers see
//! either the previous snapshot or the new one, never a mix.

use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::config::CredentialSourceConfig;
use crate::metrics::{CREDENTIAL_REFRESH, CREDENTIALS_LOADED};
use crate::worker::BackgroundTask;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("credential fetch failed: {0}")]
    Fetch(String),
    #[error("malformed credential payload: {0}")]
    Malformed(String),
    #[error("credential payload contains no usable keys")]
    Empty,
}

/// Somewhere the set of valid credentials can be fetched from.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<String>, CredentialError>;
}

/// Accepts `["k1", "k2"]` or `{"api_keys": ["k1", "k2"]}`.
pub fn parse_credentials(payload: &[u8]) -> Result<Vec<String>, CredentialError> {
    let value: Value =
        serde_json::from_slice(payload).map_err(|e| CredentialError::Malformed(e.to_string()))?;

    let list = match value {
        Value::Array(items) => items,
        Value::Object(mut fields) => match fields.remove("api_keys") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(CredentialError::Malformed(
                    "expected an \"api_keys\" array".to_string(),
                ));
            }
        },
        _ => {
            return Err(CredentialError::Malformed(
                "expected a JSON array or object".to_string(),
            ));
        }
    };

    let mut keys = Vec::with_capacity(list.len());
    for item in list {
        match item {
            Value::String(key) if key.is_empty() => {}
            Value::String(key) => keys.push(key),
            other => {
                return Err(CredentialError::Malformed(format!(
                    "non-string credential entry: {other}"
                )));
            }
        }
    }

    if keys.is_empty() {
        return Err(CredentialError::Empty);
    }
    Ok(keys)
}

/// Payload given directly in configuration.
pub struct InlineCredentials {
    payload: String,
}

impl InlineCredentials {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

#[async_trait]
impl CredentialSource for InlineCredentials {
    async fn fetch(&self) -> Result<Vec<String>, CredentialError> {
        parse_credentials(self.payload.as_bytes())
    }
}

/// Payload read from a file on every fetch (e.g. a mounted secret).
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialSource for FileCredentials {
    async fn fetch(&self) -> Result<Vec<String>, CredentialError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| CredentialError::Fetch(format!("{}: {e}", self.path.display())))?;
        parse_credentials(&bytes)
    }
}

/// Payload served by a secret endpoint over HTTP.
pub struct HttpCredentials {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpCredentials {
    pub fn new(client: reqwest::Client, url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            url: url.into(),
            token,
        }
    }
}

#[async_trait]
impl CredentialSource for HttpCredentials {
    async fn fetch(&self) -> Result<Vec<String>, CredentialError> {
        let mut request = self.client.get(&self.url).timeout(FETCH_TIMEOUT);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let res = request
            .send()
            .await
            .map_err(|e| CredentialError::Fetch(e.to_string()))?;
        if !res.status().is_success() {
            return Err(CredentialError::Fetch(format!(
                "secret endpoint returned {}",
                res.status()
            )));
        }
        let body = res
            .bytes()
            .await
            .map_err(|e| CredentialError::Fetch(e.to_string()))?;
        parse_credentials(&body)
    }
}

pub fn build_source(config: &CredentialSourceConfig) -> Arc<dyn CredentialSource> {
    match config {
        CredentialSourceConfig::Url { url, token } => Arc::new(HttpCredentials::new(
            reqwest::Client::new(),
            url.clone(),
            token.clone(),
        )),
        CredentialSourceConfig::File(path) => Arc::new(FileCredentials::new(path.clone())),
        CredentialSourceConfig::Inline(payload) => Arc::new(InlineCredentials::new(payload.clone())),
    }
}

pub struct CredentialCache {
    source: Arc<dyn CredentialSource>,
    // Published by `load`, read lock-free by every request
    snapshot: ArcSwap<HashSet<String>>,
}

impl CredentialCache {
    /// Empty cache; nothing is admitted until the first successful `load`.
    pub fn new(source: Arc<dyn CredentialSource>) -> Self {
        Self {
            source,
            snapshot: ArcSwap::from_pointee(HashSet::new()),
        }
    }

    /// Builds the cache and performs the first load. Startup must not
    /// continue without a snapshot, so a failure here is returned as is.
    pub async fn bootstrap(
        source: Arc<dyn CredentialSource>,
    ) -> Result<Arc<Self>, CredentialError> {
        let cache = Arc::new(Self::new(source));
        cache.load().await?;
        Ok(cache)
    }

    /// Fetches and swaps in a new snapshot. On failure the current snapshot
    /// stays active.
    pub async fn load(&self) -> Result<usize, CredentialError> {
        let keys = match self.source.fetch().await {
            Ok(keys) => keys,
            Err(e) => {
                CREDENTIAL_REFRESH.with_label_values(&["failure"]).inc();
                return Err(e);
            }
        };

        let fresh: HashSet<String> = keys.into_iter().collect();
        let count = fresh.len();
        self.snapshot.store(Arc::new(fresh));

        CREDENTIAL_REFRESH.with_label_values(&["success"]).inc();
        CREDENTIALS_LOADED.set(count as i64);
        info!(count, "api_keys_loaded");
        Ok(count)
    }

    pub fn contains(&self, credential: &str) -> bool {
        self.snapshot.load().contains(credential)
    }

    pub fn snapshot(&self) -> Arc<HashSet<String>> {
        self.snapshot.load_full()
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }

    /// Reloads every `every` until the returned task is shut down.
    /// Failed loads are logged and the schedule carries on.
    pub fn start_periodic_refresh(self: &Arc<Self>, every: Duration) -> BackgroundTask {
        let cache = Arc::clone(self);
        BackgroundTask::spawn("credential-refresh", every, move || {
            let cache = Arc::clone(&cache);
            async move {
                if let Err(e) = cache.load().await {
                    warn!(error = %e, "api_keys_refresh_failed, keeping previous snapshot");
                }
            }
        })
    }
}
