use std::sync::Arc;

use crate::cache::CredentialCache;
use crate::rate_limit::RateLimiter;
use crate::store::MessageStore;

// app's shared state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MessageStore>,        // message table
    pub credentials: Arc<CredentialCache>,   // valid api keys, refreshed in the background
    pub rate_limiter: Arc<RateLimiter>,      // per-key sliding window
}

impl AppState {
    pub fn new(
        store: Arc<dyn MessageStore>,
        credentials: Arc<CredentialCache>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            store,
            credentials,
            rate_limiter,
        }
    }
}
