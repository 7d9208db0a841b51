use axum::extract::{ConnectInfo, Request};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::info;

use crate::auth::{fingerprint, parse_bearer};
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};

// Health checks and scrapes are too frequent to be worth a log line
const QUIET_PATHS: [&str; 2] = ["/health", "/metrics"];

// Metric label values stay bounded; anything else counts as "other"
const KNOWN_ACTIONS: [&str; 7] = [
    "create_message",
    "list_messages",
    "get_message",
    "list_public_messages",
    "health_check",
    "metrics",
    "get_capabilities",
];

// Business action name for a request
pub fn action_name(method: &Method, path: &str) -> String {
    let action = match (method, path) {
        (&Method::POST, "/api/v1/messages") => "create_message",
        (&Method::GET, "/api/v1/messages") => "list_messages",
        (&Method::GET, p) if p.starts_with("/api/v1/messages/") => "get_message",
        (_, "/api/public/messages") => "list_public_messages",
        (_, "/health") => "health_check",
        (_, "/metrics") => "metrics",
        (_, "/.well-known/agent.json") => "get_capabilities",
        _ => {
            let path = path.replace('/', "_");
            return format!(
                "{}_{}",
                method.as_str().to_lowercase(),
                path.trim_matches('_')
            );
        }
    };
    action.to_string()
}

// First X-Forwarded-For hop, then the peer address
pub fn client_ip(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn log_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let user = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_bearer)
        .map(fingerprint)
        .unwrap_or_else(|| "anonymous".to_string());
    let ip = client_ip(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let action = action_name(&method, &path);

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status();
    let label = if KNOWN_ACTIONS.contains(&action.as_str()) {
        action.as_str()
    } else {
        "other"
    };
    REQUEST_TOTAL
        .with_label_values(&[label, status.as_str()])
        .inc();
    REQUEST_LATENCY.observe(elapsed.as_secs_f64());

    if !QUIET_PATHS.contains(&path.as_str()) {
        info!(
            user = %user,
            action = %action,
            path = %path,
            method = %method,
            status_code = status.as_u16(),
            duration_ms = (elapsed.as_secs_f64() * 1000.0 * 100.0).round() / 100.0,
            client_ip = %ip,
            "api_request"
        );
    }

    response
}
