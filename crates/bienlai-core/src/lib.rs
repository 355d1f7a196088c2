//! Core types shared across the bienlai workspace: domain models, the
//! unified error type and environment-driven configuration.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

pub use config::GatewayConfig;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
