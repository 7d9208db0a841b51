use lazy_static::lazy_static;
use prometheus::{
    Histogram, IntCounter, IntCounterVec, IntGauge, register_histogram, register_int_counter,
    register_int_counter_vec, register_int_gauge,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: IntCounterVec = register_int_counter_vec!(
        "guestbook_requests_total",
        "Total number of requests",
        &["action", "status"]
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "guestbook_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
    pub static ref AUTH_FAILURES: IntCounterVec = register_int_counter_vec!(
        "guestbook_auth_failures_total",
        "Rejected requests by reason",
        &["reason"]
    )
    .unwrap();
    pub static ref RATE_LIMITED: IntCounter = register_int_counter!(
        "guestbook_rate_limited_total",
        "Requests denied by the rate limiter"
    )
    .unwrap();
    pub static ref CREDENTIAL_REFRESH: IntCounterVec = register_int_counter_vec!(
        "guestbook_credential_refresh_total",
        "Credential loads by outcome",
        &["outcome"]
    )
    .unwrap();
    pub static ref CREDENTIALS_LOADED: IntGauge = register_int_gauge!(
        "guestbook_credentials_loaded",
        "Number of credentials in the active snapshot"
    )
    .unwrap();
    pub static ref MESSAGES_CREATED: IntCounter = register_int_counter!(
        "guestbook_messages_created_total",
        "Messages written to the store"
    )
    .unwrap();
}
