//! Error types shared by the engine, the storage collaborators and the
//! HTTP layer.

use axum::http::StatusCode;
use thiserror::Error;

pub type CommissionResult<T> = Result<T, CommissionError>;
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by an [`AgentDirectory`](crate::store::AgentDirectory)
/// or [`CommissionLedger`](crate::store::CommissionLedger).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("commission already recorded for {key} (id {existing_id})")]
    Duplicate { key: String, existing_id: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid rules: {0}")]
    InvalidRules(String),
    #[error("invalid value for {key}: {value}")]
    InvalidVar { key: String, value: String },
}

#[derive(Debug, Error)]
pub enum CommissionError {
    #[error("invalid order: {0}")]
    InvalidOrder(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CommissionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidOrder(_) | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidOrder(_) => "invalid_order",
            Self::InvalidInput(_) => "invalid_input",
            Self::Store(_) => "store_error",
        }
    }
}
