//! Orchestration server: config, telemetry, local backend wiring, and the
//! transport-agnostic call surface (`api`). The binary (`orchestratord`)
//! is a thin CLI shell around this library; anything that ends up fronting
//! it (HTTP, WebSocket, MCP) is built against `api::Orchestrator` directly.

pub mod api;
pub mod backends;
pub mod config;
pub mod telemetry;

pub use api::Orchestrator;
pub use backends::Backends;
pub use config::Config;
