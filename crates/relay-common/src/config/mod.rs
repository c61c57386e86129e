//! Configuration structs

mod app_config;

pub use app_config::{
    AppSettings, ConfigError, Environment, JwtConfig, LivenessConfig, RelayConfig, RoomConfig,
    ServerConfig,
};
