//! Gateway state
//!
//! Application state shared by every request handler.

use std::sync::Arc;

use relay_common::RelayConfig;

use crate::admission::AdmissionGate;
use crate::room::RoomRegistry;

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    /// Every room known to this process
    registry: Arc<RoomRegistry>,
    /// Credential check run before upgrade
    admission: Arc<dyn AdmissionGate>,
    /// Application configuration
    config: Arc<RelayConfig>,
}

impl GatewayState {
    pub fn new(
        registry: Arc<RoomRegistry>,
        admission: Arc<dyn AdmissionGate>,
        config: RelayConfig,
    ) -> Self {
        Self {
            registry,
            admission,
            config: Arc::new(config),
        }
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    pub fn admission(&self) -> &dyn AdmissionGate {
        self.admission.as_ref()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("registry", &self.registry)
            .field("config", &"RelayConfig")
            .finish()
    }
}
