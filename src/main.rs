use clap::Parser; // for cli
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use a2a_guestbook::cache::{CredentialCache, build_source};
use a2a_guestbook::config::Args;
use a2a_guestbook::logging::init_logging;
use a2a_guestbook::rate_limit::RateLimiter;
use a2a_guestbook::store::InMemoryMessageStore;
use a2a_guestbook::{AppState, build_router};

// Idle rate limit entries are swept this often
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

// this is main async function with tokio
#[tokio::main]
async fn main() -> ExitCode {
    // parse cli arguments
    let args = Args::parse();
    init_logging(&args);

    info!(
        port = args.port,
        rate_limit = args.rate_limit,
        rate_window_secs = args.rate_window,
        credential_refresh_secs = args.credential_refresh,
        "application_starting"
    );

    let source_config = match args.credential_source() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "initialization_failed");
            return ExitCode::FAILURE;
        }
    };

    // no snapshot, no service
    let credentials = match CredentialCache::bootstrap(build_source(&source_config)).await {
        Ok(cache) => cache,
        Err(e) => {
            error!(error = %e, "initialization_failed");
            return ExitCode::FAILURE;
        }
    };

    let rate_limiter = Arc::new(RateLimiter::new(args.rate_limit, args.rate_window()));
    let state = AppState::new(
        Arc::new(InMemoryMessageStore::new()),
        Arc::clone(&credentials),
        Arc::clone(&rate_limiter),
    );

    // background jobs, independent of any request
    let refresher = credentials.start_periodic_refresh(args.credential_refresh());
    let sweeper = rate_limiter.start_sweeper(SWEEP_INTERVAL);

    let app = build_router(state);
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %addr, error = %e, "bind_failed");
            return ExitCode::FAILURE;
        }
    };

    info!(addr = %addr, "application_startup_complete");

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    info!("application_shutting_down");
    refresher.shutdown().await;
    sweeper.shutdown().await;

    match served {
        Ok(()) => {
            info!("application_shutdown_complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "server_error");
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
