//! Auth gate for the protected API.
//!
//! Each request walks `header -> credential -> rate limit` and is either
//! admitted with an [`AuthenticatedAgent`] in its extensions or rejected
//! with the first failing step's reason. Handlers never re-validate.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::access_log::client_ip;
use crate::cache::CredentialCache;
use crate::error::ApiError;
use crate::metrics::{AUTH_FAILURES, RATE_LIMITED};
use crate::rate_limit::RateLimiter;
use crate::state::AppState;

/// Credential that passed the gate, available to handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedAgent {
    pub api_key: String,
}

impl AuthenticatedAgent {
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.api_key)
    }
}

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingAuthorization,
    InvalidAuthorizationFormat,
    InvalidCredential,
    RateLimitExceeded { retry_after_secs: u64 },
}

impl Rejection {
    pub fn reason(self) -> &'static str {
        match self {
            Self::MissingAuthorization => "missing_authorization_header",
            Self::InvalidAuthorizationFormat => "invalid_authorization_format",
            Self::InvalidCredential => "invalid_api_key",
            Self::RateLimitExceeded { .. } => "rate_limit_exceeded",
        }
    }
}

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::MissingAuthorization => ApiError::MissingAuthorization,
            Rejection::InvalidAuthorizationFormat => ApiError::InvalidAuthorizationFormat,
            Rejection::InvalidCredential => ApiError::InvalidCredential,
            Rejection::RateLimitExceeded { retry_after_secs } => {
                ApiError::RateLimitExceeded { retry_after_secs }
            }
        }
    }
}

/// Short, non-reversible identifier for logs: `api-key-hash:1a2b3c4d`.
pub fn fingerprint(api_key: &str) -> String {
    let digest = Sha256::digest(api_key.as_bytes());
    format!("api-key-hash:{:x}", digest)[..21].to_string()
}

/// Extracts the token from `Bearer <token>`. The scheme is matched
/// case-insensitively; anything other than exactly two parts is rejected.
pub fn parse_bearer(value: &str) -> Option<&str> {
    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Some(token),
        _ => None,
    }
}

/// Runs the gate against a raw `Authorization` value.
pub fn authorize(
    header: Option<&str>,
    credentials: &CredentialCache,
    limiter: &RateLimiter,
) -> Result<AuthenticatedAgent, Rejection> {
    let raw = header.ok_or(Rejection::MissingAuthorization)?;
    let token = parse_bearer(raw).ok_or(Rejection::InvalidAuthorizationFormat)?;

    if !credentials.contains(token) {
        return Err(Rejection::InvalidCredential);
    }

    let decision = limiter.check(token);
    if !decision.allowed {
        return Err(Rejection::RateLimitExceeded {
            retry_after_secs: decision.retry_after_secs,
        });
    }

    Ok(AuthenticatedAgent {
        api_key: token.to_string(),
    })
}

fn authorization_header(headers: &HeaderMap) -> Result<Option<&str>, Rejection> {
    match headers.get(header::AUTHORIZATION) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(Some)
            .map_err(|_| Rejection::InvalidAuthorizationFormat),
    }
}

/// Axum middleware guarding `/api/v1/*`.
pub async fn require_api_key(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let verdict = authorization_header(request.headers()).and_then(|raw| {
        authorize(raw, &state.credentials, &state.rate_limiter)
    });

    match verdict {
        Ok(agent) => {
            request.extensions_mut().insert(agent);
            Ok(next.run(request).await)
        }
        Err(rejection) => {
            let user = authorization_header(request.headers())
                .ok()
                .flatten()
                .and_then(parse_bearer)
                .map(fingerprint)
                .unwrap_or_else(|| "anonymous".to_string());
            warn!(
                user = %user,
                reason = rejection.reason(),
                client_ip = %client_ip(&request),
                path = %request.uri().path(),
                "auth_failed"
            );
            AUTH_FAILURES.with_label_values(&[rejection.reason()]).inc();
            if matches!(rejection, Rejection::RateLimitExceeded { .. }) {
                RATE_LIMITED.inc();
            }
            Err(rejection.into())
        }
    }
}
