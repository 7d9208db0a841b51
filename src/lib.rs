//! A2A guestbook: a small message board for agents.
//!
//! Protected routes pass an auth gate backed by a periodically refreshed
//! [`cache::CredentialCache`] and a per-key [`rate_limit::RateLimiter`].

pub mod access_log;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod store;
pub mod worker;

pub use routes::build_router;
pub use state::AppState;
