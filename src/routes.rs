use axum::{
    Router, middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::access_log::log_requests;
use crate::auth::require_api_key;
use crate::error::ApiError;
use crate::handlers::{
    capabilities, create_message, get_message, health_handler, list_messages, metrics_handler,
    public_messages,
};
use crate::state::AppState;

// Builds the full router. Only /api/v1 goes through the auth gate.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/v1/messages", get(list_messages).post(create_message))
        .route("/api/v1/messages/{id}", get(get_message))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let public = Router::new()
        .route("/.well-known/agent.json", get(capabilities))
        .route("/api/public/messages", get(public_messages))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler));

    with_service_layers(Router::new().merge(protected).merge(public)).with_state(state)
}

// Outermost first: CORS, access log, panic guard
fn with_service_layers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(log_requests))
        .layer(CorsLayer::permissive())
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = %detail, "handler_panicked");
    ApiError::Internal.into_response()
}
