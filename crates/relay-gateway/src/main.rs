//! Relay server entry point
//!
//! Run with:
//! ```bash
//! PORT=8080 JWT_SECRET=... cargo run -p relay-gateway
//! ```
//!
//! Configuration is loaded from environment variables.

use relay_common::{try_init_tracing_with_config, RelayConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        app = %config.app.name,
        env = ?config.app.env,
        address = %config.server.address(),
        outbound_capacity = config.rooms.outbound_capacity,
        liveness_interval_secs = config.liveness.interval_secs,
        "Configuration loaded"
    );

    if let Err(e) = relay_gateway::run(config).await {
        error!(error = ?e, "Relay failed");
        std::process::exit(1);
    }
}
