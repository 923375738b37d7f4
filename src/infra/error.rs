//! Failures while bringing the process up: config, logging, database and disk.

use thiserror::Error;

use crate::config::LoadError;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("configuration error: {0}")]
    Configuration(#[from] LoadError),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("database unavailable: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl InfraError {
    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
