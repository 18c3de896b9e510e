pub mod config;
pub mod job;
pub mod objective;
pub mod protocol;
pub mod schema;

use thiserror::Error;

/// Problems in the problem definition itself. These are fatal for a run.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid objective '{entry}': {reason}")]
    Objective { entry: String, reason: String },

    #[error("Invalid schema: {0}")]
    Schema(String),
}
