//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;
use warden_rbac::PolicyError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to write config file at {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config file already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid policy configuration: {0}")]
    PolicyError(#[from] PolicyError),
}
