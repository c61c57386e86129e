//! Gateway server setup
//!
//! Routes, state construction and the serve loop with graceful shutdown.

mod handler;
mod state;

pub use handler::{join_room_handler, parse_room_id, room_summary_handler, RoomSummary};
pub use state::GatewayState;

use std::future::Future;
use std::sync::Arc;

use axum::{routing::get, Router};
use relay_common::{AppError, JwtService, RelayConfig};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::admission::JwtAdmissionGate;
use crate::liveness::LivenessProbe;
use crate::room::RoomRegistry;

/// Lifetime used when the relay itself issues tokens (tooling and tests)
const ISSUED_TOKEN_EXPIRY_SECS: i64 = 900;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/ws/:room_id", get(join_room_handler))
        .route("/rooms/:room_id", get(room_summary_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create `GatewayState` from configuration
pub fn create_gateway_state(config: RelayConfig) -> GatewayState {
    let registry = RoomRegistry::new_shared(config.rooms.clone());
    let jwt = JwtService::new(&config.jwt.secret, ISSUED_TOKEN_EXPIRY_SECS);
    let admission = Arc::new(JwtAdmissionGate::new(jwt));

    GatewayState::new(registry, admission, config)
}

/// Serve on an already-bound listener until `shutdown` resolves
///
/// Starts the liveness probe, and on shutdown cancels every session before
/// waiting for the probe to stop.
pub async fn serve<F>(listener: TcpListener, state: GatewayState, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let registry = state.registry().clone();
    let probe = LivenessProbe::new(registry.clone(), state.config().liveness.interval()).spawn();

    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Relay listening on ws://{}/ws/{{room_id}}", addr);
    }

    let app = create_app(state);
    let shutdown_registry = registry.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            shutdown_registry.shutdown();
        })
        .await;

    // Also reached when serve fails before shutdown was requested
    registry.shutdown();
    if let Err(e) = probe.await {
        tracing::warn!(error = %e, "Liveness probe task failed");
    }

    result.map_err(|e| AppError::internal(anyhow::Error::new(e).context("Server error")))
}

/// Run the complete relay with configuration
pub async fn run(config: RelayConfig) -> Result<(), AppError> {
    let addr = config.server.address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(anyhow::Error::new(e).context(format!("Failed to bind to {addr}"))))?;

    let state = create_gateway_state(config);
    serve(listener, state, shutdown_signal()).await?;

    tracing::info!("Relay stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, initiating graceful shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
